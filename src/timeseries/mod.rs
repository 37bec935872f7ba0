//! Results of the time-series simulation path.
//!
//! The external time-series simulation writes one table per entity type.
//! Load changes take effect one tick later, so every load record is paired
//! with the power flow results at a fixed offset.

pub mod collector;
pub mod convert;
pub mod tables;

pub use collector::{CollectionSpec, DEFAULT_OFFSET_SECONDS, TapRun, collect, collect_runs};
pub use convert::{RatedVoltages, to_three_port, to_two_port};
pub use tables::{
    LOAD_TABLE, LoadRecord, NODE_TABLE, NodeRecord, TRANSFORMER_2W_TABLE, TRANSFORMER_3W_TABLE,
    TimeSeriesTables, TransformerRecord, parse_timestamp,
};
