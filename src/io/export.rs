//! CSV export of sweep results.
//!
//! Three layouts are written: the full record table, a flat listing of the
//! nodal voltages normalized for plotting, and a dense grid per tap position
//! for surface and line plots. Absent or failed points are written as `nan`.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use tracing::info;

use crate::backend::{Port, Topology};
use crate::calc::{per_unit_ticks, tick_range};
use crate::compare::PairedPoint;
use crate::config::BenchConfig;
use crate::context::RunContext;
use crate::error::{ExportError, SweepError};
use crate::result::{GridResult, SweepPoint};

const NAN: &str = "nan";

/// One power axis of a plot mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshAxis {
    pub ticks: usize,
    pub rated_mw: f64,
}

/// Fixed mesh of power setpoints a dense grid is written over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMesh {
    /// Medium voltage axis, three-winding only.
    pub p_mv: Option<MeshAxis>,
    pub p_lv: MeshAxis,
    /// Setpoint resolution used by the sweep (MW).
    pub resolution_mw: f64,
}

impl GridMesh {
    pub fn two_winding(p_lv: MeshAxis, resolution_mw: f64) -> Self {
        Self {
            p_mv: None,
            p_lv,
            resolution_mw,
        }
    }

    pub fn three_winding(p_mv: MeshAxis, p_lv: MeshAxis, resolution_mw: f64) -> Self {
        Self {
            p_mv: Some(p_mv),
            p_lv,
            resolution_mw,
        }
    }

    /// The mesh matching the sweep of a bench configuration.
    pub fn from_config(config: &BenchConfig) -> Self {
        let transformer = &config.transformer;
        let ticks = config.sweep.ticks;
        let p_lv = MeshAxis {
            ticks,
            rated_mw: transformer.s_nom_lv_mva,
        };
        match transformer.topology {
            Topology::TwoWinding => Self::two_winding(p_lv, config.sweep.resolution_mw),
            Topology::ThreeWinding => Self::three_winding(
                MeshAxis {
                    ticks,
                    rated_mw: transformer.s_nom_mv_mva,
                },
                p_lv,
                config.sweep.resolution_mw,
            ),
        }
    }

    pub fn topology(&self) -> Topology {
        match self.p_mv {
            None => Topology::TwoWinding,
            Some(_) => Topology::ThreeWinding,
        }
    }

    /// Number of data rows of one grid file.
    pub fn rows(&self) -> usize {
        self.p_mv.map_or(1, |axis| axis.ticks) * self.p_lv.ticks
    }

    fn key(&self, p_mw: f64) -> i64 {
        (p_mw / self.resolution_mw).round() as i64
    }

    fn axis_values(&self, axis: MeshAxis) -> Result<Vec<(f64, f64)>, SweepError> {
        let per_unit = per_unit_ticks(axis.ticks)?;
        let mw = tick_range(axis.rated_mw, axis.ticks, self.resolution_mw)?;
        Ok(per_unit.into_iter().zip(mw).collect())
    }
}

fn record_header(topology: Topology, setpoint_unit: &str) -> Vec<String> {
    let mut header = vec!["tap_pos".to_string()];
    if topology == Topology::ThreeWinding {
        header.push(format!("p_mv_{setpoint_unit}"));
    }
    header.push(format!("p_lv_{setpoint_unit}"));

    let voltage_ports: &[Port] = match topology {
        Topology::TwoWinding => &[Port::Low],
        Topology::ThreeWinding => &[Port::High, Port::Medium, Port::Low],
    };
    for port in voltage_ports {
        let s = port.suffix();
        header.push(format!("v_mag_{s}_pu"));
        header.push(format!("v_ang_{s}_degree"));
    }
    for port in topology.ports() {
        let s = port.suffix();
        header.extend([
            format!("p_{s}_kw"),
            format!("q_{s}_kvar"),
            format!("s_{s}_kva"),
            format!("i_mag_{s}_a"),
            format!("i_ang_{s}_degree"),
        ]);
    }
    header
}

fn check_shape(result: &GridResult, topology: Topology) -> Result<(), ExportError> {
    let expected = match topology {
        Topology::TwoWinding => "two_port",
        Topology::ThreeWinding => "three_port",
    };
    if result.kind() == expected {
        Ok(())
    } else {
        Err(ExportError::ShapeMismatch {
            lhs: expected,
            rhs: result.kind(),
        })
    }
}

fn setpoint_fields(point: &SweepPoint, topology: Topology) -> Vec<String> {
    let mut fields = vec![point.tap_pos.to_string()];
    if topology == Topology::ThreeWinding {
        fields.push(point.p_mv.map_or_else(|| NAN.to_string(), |p| format!("{p:.6}")));
    }
    fields.push(format!("{:.6}", point.p_lv));
    fields
}

fn record_fields(
    result: Option<&GridResult>,
    topology: Topology,
) -> Result<Vec<String>, ExportError> {
    let width = record_header(topology, "mw").len() - setpoint_fields_len(topology);
    let Some(result) = result else {
        return Ok(vec![NAN.to_string(); width]);
    };
    check_shape(result, topology)?;

    let mut fields = Vec::with_capacity(width);
    for (_, v) in result.voltages() {
        fields.push(format!("{:.12}", v.v_mag_pu()));
        fields.push(format!("{:.12}", v.v_ang_degree()));
    }
    for (_, port) in result.ports() {
        fields.push(format!("{:.9}", port.p_kw()));
        fields.push(format!("{:.9}", port.q_kvar()));
        fields.push(format!("{:.9}", port.s_kva()));
        fields.push(format!("{:.12}", port.i_mag_a()));
        fields.push(format!("{:.12}", port.i_ang_degree()));
    }
    Ok(fields)
}

fn setpoint_fields_len(topology: Topology) -> usize {
    match topology {
        Topology::TwoWinding => 2,
        Topology::ThreeWinding => 3,
    }
}

/// Writes the full record table, one row per sweep point.
///
/// Columns are the tap position, the setpoints (MW), the node voltages and
/// per port P, Q, S, current magnitude and angle. Voltages and currents carry
/// 12 decimals, powers 9.
///
/// # Errors
///
/// * [`ExportError::ShapeMismatch`] if a result does not match `topology`
/// * [`ExportError::Csv`] if writing fails
pub fn write_records_csv(
    points: &[SweepPoint],
    topology: Topology,
    writer: impl Write,
) -> Result<(), ExportError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(record_header(topology, "mw"))?;

    for point in points {
        let mut row = setpoint_fields(point, topology);
        row.extend(record_fields(point.result.as_ref(), topology)?);
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes field-wise deviations `lhs - rhs` of paired points.
///
/// Pairs without a comparable result on both sides are written as `nan`.
///
/// # Errors
///
/// See [`write_records_csv`].
pub fn write_deviation_csv(
    pairs: &[PairedPoint],
    topology: Topology,
    writer: impl Write,
) -> Result<(), ExportError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(record_header(topology, "mw"))?;

    for pair in pairs {
        let point = SweepPoint::failed(pair.point);
        let deviation = pair.deviation();
        let mut row = setpoint_fields(&point, topology);
        row.extend(record_fields(deviation.as_ref(), topology)?);
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

fn plot_voltage_ports(topology: Topology) -> &'static [Port] {
    match topology {
        Topology::TwoWinding => &[Port::Low],
        Topology::ThreeWinding => &[Port::Medium, Port::Low],
    }
}

fn plot_header(topology: Topology) -> Vec<String> {
    let mut header = vec!["tap_pos".to_string()];
    if topology == Topology::ThreeWinding {
        header.push("p_mv_pu".to_string());
    }
    header.push("p_lv_pu".to_string());
    for port in plot_voltage_ports(topology) {
        let s = port.suffix();
        header.push(format!("v_mag_{s}_pu"));
        header.push(format!("v_ang_{s}_degree"));
    }
    header
}

fn plot_voltage_fields(
    result: Option<&GridResult>,
    topology: Topology,
) -> Result<Vec<String>, ExportError> {
    let ports = plot_voltage_ports(topology);
    let Some(result) = result else {
        return Ok(vec![NAN.to_string(); 2 * ports.len()]);
    };
    check_shape(result, topology)?;

    let voltages = result.voltages();
    let mut fields = Vec::with_capacity(2 * ports.len());
    for port in ports {
        match voltages.iter().find(|(p, _)| p == port) {
            Some((_, v)) => {
                fields.push(format!("{:.12}", v.v_mag_pu()));
                fields.push(format!("{:.12}", v.v_ang_degree()));
            }
            None => fields.extend([NAN.to_string(), NAN.to_string()]),
        }
    }
    Ok(fields)
}

/// Writes a flat listing of the plotted voltages of every point, with the
/// setpoints normalized by the rated powers of `mesh`.
///
/// # Errors
///
/// See [`write_records_csv`].
pub fn write_plot_csv(
    points: &[SweepPoint],
    mesh: &GridMesh,
    writer: impl Write,
) -> Result<(), ExportError> {
    let topology = mesh.topology();
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(plot_header(topology))?;

    for point in points {
        let mut row = vec![point.tap_pos.to_string()];
        if let Some(axis) = mesh.p_mv {
            row.push(point.p_mv.map_or_else(
                || NAN.to_string(),
                |p| format!("{:.6}", p / axis.rated_mw),
            ));
        }
        row.push(format!("{:.6}", point.p_lv / mesh.p_lv.rated_mw));
        row.extend(plot_voltage_fields(point.result.as_ref(), topology)?);
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes the dense grid of one tap position.
///
/// Every mesh point gets a row, `nan` if `points` holds no result for it.
/// Three-winding grids are written in blocks of constant low voltage
/// setpoint, varying the medium voltage setpoint, separated by blank lines.
///
/// # Errors
///
/// * [`ExportError::Io`] if writing fails
/// * [`ExportError::Mesh`] if an axis has fewer than two ticks
/// * [`ExportError::ShapeMismatch`] if a result does not match the mesh
/// * [`ExportError::DuplicateMeshPoint`] if two points of the tap position
///   fall on the same mesh point
pub fn write_grid_csv(
    points: &[SweepPoint],
    mesh: &GridMesh,
    tap_pos: i32,
    col_sep: char,
    mut writer: impl Write,
) -> Result<(), ExportError> {
    let topology = mesh.topology();
    let mut lookup: HashMap<(Option<i64>, i64), &SweepPoint> = HashMap::new();
    for point in points.iter().filter(|p| p.tap_pos == tap_pos) {
        let key = (point.p_mv.map(|v| mesh.key(v)), mesh.key(point.p_lv));
        if lookup.insert(key, point).is_some() {
            return Err(ExportError::DuplicateMeshPoint {
                point: point.operating_point(),
            });
        }
    }

    let sep = col_sep.to_string();
    writeln!(writer, "{}", plot_header(topology).join(&sep))?;

    let lv_axis = mesh.axis_values(mesh.p_lv)?;
    let mv_axis = match mesh.p_mv {
        Some(axis) => mesh
            .axis_values(axis)?
            .into_iter()
            .map(Some)
            .collect(),
        None => vec![None],
    };

    for &(p_lv_pu, p_lv_mw) in &lv_axis {
        for &mv in &mv_axis {
            let mut row = vec![tap_pos.to_string()];
            if let Some((p_mv_pu, _)) = mv {
                row.push(format!("{p_mv_pu:.3}"));
            }
            row.push(format!("{p_lv_pu:.3}"));

            let key = (mv.map(|(_, p_mv_mw)| mesh.key(p_mv_mw)), mesh.key(p_lv_mw));
            let result = lookup.get(&key).and_then(|p| p.result.as_ref());
            row.extend(plot_voltage_fields(result, topology)?);
            writeln!(writer, "{}", row.join(&sep))?;
        }
        if mesh.p_mv.is_some() {
            writeln!(writer)?;
        }
    }
    Ok(())
}

/// File name of the grid of `tap_pos` for the output stem `stem`.
pub fn grid_file_name(stem: &str, tap_pos: i32) -> String {
    format!("{stem}_pgfplots_tap_{tap_pos}.csv")
}

/// Writes one dense grid file per tap position into the run's output
/// directory.
///
/// # Errors
///
/// Returns the first [`ExportError`]; files written before it are kept.
pub fn export_grid_per_tap(
    ctx: &RunContext,
    stem: &str,
    points: &[SweepPoint],
    mesh: &GridMesh,
    taps: &[i32],
    col_sep: char,
) -> Result<Vec<PathBuf>, ExportError> {
    let mut written = Vec::with_capacity(taps.len());
    for &tap_pos in taps {
        let name = grid_file_name(stem, tap_pos);
        ctx.write_file(&name, |w| write_grid_csv(points, mesh, tap_pos, col_sep, w))?;
        written.push(ctx.output_path(&name));
    }
    info!(run = ctx.label(), files = written.len(), "exported dense grids");
    Ok(written)
}

/// Writes the full record table to `name` in the run's output directory.
///
/// # Errors
///
/// See [`write_records_csv`].
pub fn export_records_csv(
    ctx: &RunContext,
    name: &str,
    points: &[SweepPoint],
    topology: Topology,
) -> Result<PathBuf, ExportError> {
    ctx.write_file(name, |w| write_records_csv(points, topology, w))?;
    info!(run = ctx.label(), name, points = points.len(), "exported record table");
    Ok(ctx.output_path(name))
}
