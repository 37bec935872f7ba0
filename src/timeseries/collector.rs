//! Pairing of load inputs with the power flow results they caused.

use std::path::PathBuf;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::Topology;
use crate::context::RunContext;
use crate::error::CollectionError;
use crate::extract::ExtractionConvention;
use crate::result::{GridResult, OperatingPoint, SweepPoint};

use super::convert::{RatedVoltages, to_three_port, to_two_port};
use super::tables::{LoadRecord, NodeRecord, TimeSeriesTables, TransformerRecord};

/// The simulation reports the power flow caused by a load change one tick later.
pub const DEFAULT_OFFSET_SECONDS: u32 = 1;

/// Entities and ratings needed to collect the results of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionSpec {
    pub topology: Topology,
    pub node_hv: Uuid,
    #[serde(default)]
    pub node_mv: Option<Uuid>,
    pub node_lv: Uuid,
    #[serde(default)]
    pub load_mv: Option<Uuid>,
    pub load_lv: Uuid,
    /// Transformer entity; the only transformer record per instant if unset.
    #[serde(default)]
    pub transformer: Option<Uuid>,
    pub rated: RatedVoltages,
    /// Lag between a load record and its power flow result.
    #[serde(default = "default_offset_seconds")]
    pub offset_seconds: u32,
}

fn default_offset_seconds() -> u32 {
    DEFAULT_OFFSET_SECONDS
}

impl CollectionSpec {
    pub fn offset(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.offset_seconds))
    }
}

/// Result directory of one tap position.
#[derive(Debug, Clone, PartialEq)]
pub struct TapRun {
    pub tap_pos: i32,
    /// Directory holding the tables, relative to the context's input directory.
    pub directory: PathBuf,
}

/// Turns the tables of one run into sweep points, one per load timestamp.
///
/// Every load timestamp `t` must carry exactly one record per load of the
/// topology. It is paired with the node and transformer records at
/// `t + offset`. The tap position is taken from the transformer record.
///
/// # Errors
///
/// * [`CollectionError::LoadMultiplicity`] for a wrong number of load records
/// * [`CollectionError::MissingPowerFlowResult`] if no result exists at `t + offset`
/// * [`CollectionError::TransformerMultiplicity`] if no transformer entity is
///   configured and an instant holds several transformer records
/// * [`CollectionError::MissingEntity`] if a configured entity has no record
/// * [`CollectionError::MissingTransformerTable`] if the run lacks the
///   transformer table of the topology
/// * [`CollectionError::MissingPortCurrent`] if a three-winding record lacks
///   the port c current
/// * [`CollectionError::IncompleteSpec`] if three-winding entities are unset
pub fn collect(
    tables: &TimeSeriesTables,
    spec: &CollectionSpec,
    convention: &ExtractionConvention,
) -> Result<Vec<SweepPoint>, CollectionError> {
    let three_winding = match spec.topology {
        Topology::TwoWinding => None,
        Topology::ThreeWinding => Some(ThreeWindingIds::from_spec(spec)?),
    };
    let transformers = match spec.topology {
        Topology::TwoWinding => &tables.transformers_2w,
        Topology::ThreeWinding => &tables.transformers_3w,
    };
    if transformers.is_empty() {
        return Err(CollectionError::MissingTransformerTable(match spec.topology {
            Topology::TwoWinding => "two-winding",
            Topology::ThreeWinding => "three-winding",
        }));
    }

    let expected = spec.topology.load_count();
    let offset = spec.offset();
    let mut points = Vec::with_capacity(tables.loads.len());

    for (&load_time, loads) in &tables.loads {
        if loads.len() != expected {
            return Err(CollectionError::LoadMultiplicity {
                time: load_time,
                expected,
                found: loads.len(),
            });
        }
        let p_lv = find_load(loads, spec.load_lv, load_time)?.p_mw;

        let time = load_time + offset;
        let missing = || CollectionError::MissingPowerFlowResult { load_time, time };
        let nodes = tables.nodes.get(&time).ok_or_else(missing)?;
        let transformer_records = transformers.get(&time).ok_or_else(missing)?;
        let transformer = match spec.transformer {
            Some(id) => transformer_records
                .iter()
                .find(|r| r.input_model == id)
                .ok_or(CollectionError::MissingEntity { id, time })?,
            None => match transformer_records.as_slice() {
                [only] => only,
                [] => return Err(missing()),
                records => {
                    return Err(CollectionError::TransformerMultiplicity {
                        time,
                        found: records.len(),
                    });
                }
            },
        };

        let node_hv = find_node(nodes, spec.node_hv, time)?;
        let node_lv = find_node(nodes, spec.node_lv, time)?;
        let (point, result) = match &three_winding {
            None => (
                OperatingPoint::two_winding(transformer.tap_pos, p_lv),
                GridResult::from(to_two_port(
                    node_hv,
                    node_lv,
                    transformer,
                    spec.rated,
                    convention.phase_factor,
                )),
            ),
            Some(ids) => {
                let p_mv = find_load(loads, ids.load_mv, load_time)?.p_mw;
                let node_mv = find_node(nodes, ids.node_mv, time)?;
                let result = three_port(
                    [node_hv, node_mv, node_lv],
                    transformer,
                    spec.rated,
                    convention,
                )?;
                (
                    OperatingPoint::three_winding(transformer.tap_pos, p_mv, p_lv),
                    result,
                )
            }
        };
        points.push(SweepPoint::converged(point, result));
    }

    debug!(points = points.len(), "collected time-series results");
    Ok(points)
}

/// Collects the runs of several tap positions into one sequence.
///
/// Every point is tagged with the tap position of its run. The sequence is
/// ordered by tap position, then medium and low voltage setpoint.
///
/// # Errors
///
/// Returns the first [`CollectionError`] of any run.
pub fn collect_runs(
    ctx: &RunContext,
    runs: &[TapRun],
    spec: &CollectionSpec,
    convention: &ExtractionConvention,
) -> Result<Vec<SweepPoint>, CollectionError> {
    let mut points = Vec::new();
    for run in runs {
        let dir = ctx.input_path(&run.directory);
        let tables = TimeSeriesTables::from_directory(&dir)?;
        let collected = collect(&tables, spec, convention)?;
        info!(
            tap_pos = run.tap_pos,
            dir = %dir.display(),
            points = collected.len(),
            "collected tap position"
        );
        points.extend(collected.into_iter().map(|mut point| {
            point.tap_pos = run.tap_pos;
            point
        }));
    }

    points.sort_by(|a, b| {
        a.tap_pos
            .cmp(&b.tap_pos)
            .then(a.p_mv.unwrap_or(0.0).total_cmp(&b.p_mv.unwrap_or(0.0)))
            .then(a.p_lv.total_cmp(&b.p_lv))
    });
    Ok(points)
}

struct ThreeWindingIds {
    node_mv: Uuid,
    load_mv: Uuid,
}

impl ThreeWindingIds {
    fn from_spec(spec: &CollectionSpec) -> Result<Self, CollectionError> {
        if spec.rated.mv_kv.is_none() {
            return Err(CollectionError::IncompleteSpec("a medium voltage rating"));
        }
        Ok(Self {
            node_mv: spec
                .node_mv
                .ok_or(CollectionError::IncompleteSpec("a medium voltage node"))?,
            load_mv: spec
                .load_mv
                .ok_or(CollectionError::IncompleteSpec("a medium voltage load"))?,
        })
    }
}

fn three_port(
    nodes: [&NodeRecord; 3],
    transformer: &TransformerRecord,
    rated: RatedVoltages,
    convention: &ExtractionConvention,
) -> Result<GridResult, CollectionError> {
    to_three_port(nodes, transformer, rated, convention.phase_factor)
        .map(GridResult::from)
        .ok_or(CollectionError::MissingPortCurrent {
            time: transformer.time,
        })
}

fn find_load(
    loads: &[LoadRecord],
    id: Uuid,
    time: DateTime<Utc>,
) -> Result<&LoadRecord, CollectionError> {
    loads
        .iter()
        .find(|r| r.input_model == id)
        .ok_or(CollectionError::MissingEntity { id, time })
}

fn find_node(
    nodes: &[NodeRecord],
    id: Uuid,
    time: DateTime<Utc>,
) -> Result<&NodeRecord, CollectionError> {
    nodes
        .iter()
        .find(|r| r.input_model == id)
        .ok_or(CollectionError::MissingEntity { id, time })
}
