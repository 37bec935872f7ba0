//! Integration tests for collecting time-series results from disk.

mod common;

use std::fs;
use std::path::PathBuf;

use tcv::backend::{Port, Topology};
use tcv::calc::PhaseFactor;
use tcv::context::RunContext;
use tcv::error::CollectionError;
use tcv::extract::ExtractionConvention;
use tcv::io::{GridMesh, MeshAxis, export_grid_per_tap, export_records_csv};
use tcv::result::GridResult;
use tcv::timeseries::{LOAD_TABLE, TapRun, TimeSeriesTables, collect, collect_runs};

use common::ToyNetwork;

const LOADS_MW: [f64; 4] = [0.315, -0.315, 0.0, 0.63];
const THREE_WINDING_LOADS_MW: [(f64, f64); 3] = [(50.0, -20.0), (-100.0, 40.0), (0.0, 0.0)];

fn three_phase() -> ExtractionConvention {
    ExtractionConvention {
        phase_factor: PhaseFactor::ThreePhase,
        ..ExtractionConvention::time_series()
    }
}

fn runs(taps: &[i32]) -> Vec<TapRun> {
    taps.iter()
        .map(|&tap_pos| TapRun {
            tap_pos,
            directory: PathBuf::from(format!("tap_{tap_pos}")),
        })
        .collect()
}

fn write_runs(root: &std::path::Path, taps: &[i32]) {
    for &tap in taps {
        common::write_two_winding_run(&root.join(format!("tap_{tap}")), tap, &LOADS_MW);
    }
}

#[test]
fn single_run_reproduces_the_network_state() {
    let dir = tempfile::tempdir().expect("temp dir");
    common::write_two_winding_run(dir.path(), 4, &LOADS_MW);

    let tables = TimeSeriesTables::from_directory(dir.path()).expect("readable tables");
    let points = collect(&tables, &common::two_winding_collection(), &three_phase())
        .expect("consistent tables");
    assert_eq!(points.len(), LOADS_MW.len());

    let network = ToyNetwork::two_winding();
    for point in &points {
        assert_eq!(point.tap_pos, 4);
        let state = network.solve(4, 0.0, point.p_lv).expect("converges");
        let Some(GridResult::TwoPort(result)) = point.result else {
            panic!("expected a two-port result");
        };
        assert!((result.v_lv.v_mag_pu() - state.voltages[2].0).abs() < 1e-12);
        // three-phase phasor power recovers the flows in kW
        assert!((result.lv.p_kw() - state.p[2] * 1000.0).abs() < 1e-6);
        assert!((result.hv.p_kw() - state.p[0] * 1000.0).abs() < 1e-6);
        assert!((result.hv.q_kvar() - state.q[0] * 1000.0).abs() < 1e-6);
    }
}

#[test]
fn runs_are_tagged_and_ordered() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_runs(dir.path(), &[-1, 0, 1]);
    let ctx = RunContext::new("collect", dir.path(), dir.path().join("out"));

    let points = collect_runs(
        &ctx,
        &runs(&[1, -1, 0]),
        &common::two_winding_collection(),
        &three_phase(),
    )
    .expect("consistent runs");

    assert_eq!(points.len(), 12);
    let taps: Vec<i32> = points.iter().map(|p| p.tap_pos).collect();
    assert_eq!(taps, [-1, -1, -1, -1, 0, 0, 0, 0, 1, 1, 1, 1]);
    let loads: Vec<f64> = points[..4].iter().map(|p| p.p_lv).collect();
    assert_eq!(loads, [-0.315, 0.0, 0.315, 0.63]);
    assert!(points.iter().all(|p| p.p_mv.is_none() && p.is_converged()));
}

#[test]
fn run_directory_tap_overrides_file_tap() {
    let dir = tempfile::tempdir().expect("temp dir");
    common::write_two_winding_run(&dir.path().join("tap_7"), 0, &LOADS_MW);
    let ctx = RunContext::new("collect", dir.path(), dir.path());

    let points = collect_runs(
        &ctx,
        &runs(&[7]),
        &common::two_winding_collection(),
        &three_phase(),
    )
    .expect("consistent run");
    assert!(points.iter().all(|p| p.tap_pos == 7));
}

#[test]
fn missing_run_directory_is_an_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let ctx = RunContext::new("collect", dir.path(), dir.path());
    let err = collect_runs(
        &ctx,
        &runs(&[2]),
        &common::two_winding_collection(),
        &three_phase(),
    )
    .expect_err("nothing written");
    assert!(matches!(err, CollectionError::Io { .. }));
}

#[test]
fn zero_offset_finds_no_power_flow_result() {
    let dir = tempfile::tempdir().expect("temp dir");
    common::write_two_winding_run(dir.path(), 0, &LOADS_MW);
    let tables = TimeSeriesTables::from_directory(dir.path()).expect("readable tables");
    let spec = tcv::timeseries::CollectionSpec {
        offset_seconds: 0,
        ..common::two_winding_collection()
    };
    let err = collect(&tables, &spec, &three_phase()).expect_err("loads and results are apart");
    assert!(matches!(err, CollectionError::MissingPowerFlowResult { .. }));
}

#[test]
fn collected_runs_export_to_records_and_grids() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_runs(dir.path(), &[-1, 0, 1]);
    let ctx = RunContext::new("export", dir.path(), dir.path().join("out"));
    let points = collect_runs(
        &ctx,
        &runs(&[-1, 0, 1]),
        &common::two_winding_collection(),
        &three_phase(),
    )
    .expect("consistent runs");

    let records = export_records_csv(&ctx, "records.csv", &points, Topology::TwoWinding)
        .expect("export records");
    let text = fs::read_to_string(&records).expect("records written");
    assert_eq!(text.lines().count(), 13);
    assert!(text.starts_with("tap_pos,p_lv_mw,v_mag_lv_pu"));

    let mesh = GridMesh::two_winding(
        MeshAxis {
            ticks: 21,
            rated_mw: 0.63,
        },
        0.001,
    );
    let files = export_grid_per_tap(&ctx, "results", &points, &mesh, &[-1, 0, 1], ',')
        .expect("export grids");
    assert_eq!(files.len(), 3);
    assert!(files[0].ends_with("results_pgfplots_tap_-1.csv"));

    for file in &files {
        let grid = fs::read_to_string(file).expect("grid written");
        let rows: Vec<&str> = grid.lines().skip(1).collect();
        assert_eq!(rows.len(), 21);
        let filled = rows.iter().filter(|row| !row.ends_with("nan")).count();
        assert_eq!(filled, LOADS_MW.len());
    }
}

#[test]
fn three_winding_run_maps_ports_and_setpoints() {
    let dir = tempfile::tempdir().expect("temp dir");
    common::write_three_winding_run(dir.path(), -3, &THREE_WINDING_LOADS_MW, true);

    let tables = TimeSeriesTables::from_directory(dir.path()).expect("readable tables");
    let points = collect(&tables, &common::three_winding_collection(), &three_phase())
        .expect("consistent tables");
    assert_eq!(points.len(), THREE_WINDING_LOADS_MW.len());

    let network = ToyNetwork::three_winding();
    for (point, &(p_mv, p_lv)) in points.iter().zip(&THREE_WINDING_LOADS_MW) {
        assert_eq!(point.tap_pos, -3);
        assert_eq!(point.p_mv, Some(p_mv));
        assert_eq!(point.p_lv, p_lv);

        let state = network.solve(-3, p_mv, p_lv).expect("converges");
        let result = point.result.expect("converged");
        assert_eq!(result.kind(), "three_port");

        let expected = [Port::High, Port::Medium, Port::Low];
        let voltages = result.voltages();
        let ports = result.ports();
        for (k, port) in expected.into_iter().enumerate() {
            let (v_port, voltage) = voltages[k];
            assert_eq!(v_port, port);
            assert!((voltage.v_mag_pu() - state.voltages[k].0).abs() < 1e-12, "{port:?} V");

            let (p_port, power) = ports[k];
            assert_eq!(p_port, port);
            assert!((power.p_kw() - state.p[k] * 1000.0).abs() < 1e-6, "{port:?} P");
            assert!((power.q_kvar() - state.q[k] * 1000.0).abs() < 1e-6, "{port:?} Q");
            assert!((power.i_mag_a() - state.i_ka[k] * 1000.0).abs() < 1e-9, "{port:?} I");
        }
    }
}

#[test]
fn three_winding_instant_with_one_load_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    common::write_three_winding_run(dir.path(), 0, &THREE_WINDING_LOADS_MW, true);

    // drop the medium voltage load of the first instant
    let path = dir.path().join(LOAD_TABLE);
    let text = fs::read_to_string(&path).expect("load table written");
    let medium = common::id(common::LOAD_MV).to_string();
    let mut dropped = false;
    let kept: Vec<&str> = text
        .lines()
        .filter(|line| {
            let skip = !dropped && line.contains(&medium);
            dropped |= skip;
            !skip
        })
        .collect();
    fs::write(&path, kept.join("\n") + "\n").expect("rewrite load table");

    let tables = TimeSeriesTables::from_directory(dir.path()).expect("readable tables");
    let err = collect(&tables, &common::three_winding_collection(), &three_phase())
        .expect_err("medium voltage load is missing");
    assert!(matches!(
        err,
        CollectionError::LoadMultiplicity {
            expected: 2,
            found: 1,
            ..
        }
    ));
}

#[test]
fn three_winding_run_without_port_c_current_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    common::write_three_winding_run(dir.path(), 0, &THREE_WINDING_LOADS_MW, false);

    let tables = TimeSeriesTables::from_directory(dir.path()).expect("readable tables");
    let err = collect(&tables, &common::three_winding_collection(), &three_phase())
        .expect_err("port c current is missing");
    assert!(matches!(err, CollectionError::MissingPortCurrent { .. }));
}
