//! Time-stamped result tables written by the time-series simulation.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::error::CollectionError;

pub const NODE_TABLE: &str = "node_res.csv";
pub const LOAD_TABLE: &str = "load_res.csv";
pub const TRANSFORMER_2W_TABLE: &str = "transformer_2_w_res.csv";
pub const TRANSFORMER_3W_TABLE: &str = "transformer_3_w_res.csv";

/// Records grouped by timestamp, in time order.
pub type Grouped<R> = BTreeMap<DateTime<Utc>, Vec<R>>;

/// Nodal voltage of one node at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeRecord {
    pub uuid: Uuid,
    pub time: DateTime<Utc>,
    pub input_model: Uuid,
    pub v_mag_pu: f64,
    pub v_ang_degree: f64,
}

/// Power of one load at one instant (MW, MVAr).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadRecord {
    pub uuid: Uuid,
    pub time: DateTime<Utc>,
    pub input_model: Uuid,
    pub p_mw: f64,
    pub q_mvar: f64,
}

/// Port currents of a transformer at one instant (A, degree).
///
/// Port a is the high voltage port. Two-winding transformers use ports a and
/// b; three-winding transformers also port c.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformerRecord {
    pub uuid: Uuid,
    pub time: DateTime<Utc>,
    pub input_model: Uuid,
    pub i_a_mag_a: f64,
    pub i_a_ang_degree: f64,
    pub i_b_mag_a: f64,
    pub i_b_ang_degree: f64,
    pub i_c_mag_a: Option<f64>,
    pub i_c_ang_degree: Option<f64>,
    pub tap_pos: i32,
}

#[derive(Deserialize)]
struct NodeRow {
    uuid: Uuid,
    time: String,
    #[serde(rename = "inputModel")]
    input_model: Uuid,
    #[serde(rename = "vMag")]
    v_mag: f64,
    #[serde(rename = "vAng")]
    v_ang: f64,
}

#[derive(Deserialize)]
struct LoadRow {
    uuid: Uuid,
    time: String,
    #[serde(rename = "inputModel")]
    input_model: Uuid,
    p: f64,
    q: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransformerRow {
    uuid: Uuid,
    time: String,
    input_model: Uuid,
    i_a_mag: f64,
    i_a_ang: f64,
    i_b_mag: f64,
    i_b_ang: f64,
    #[serde(default)]
    i_c_mag: Option<f64>,
    #[serde(default)]
    i_c_ang: Option<f64>,
    tap_pos: i32,
}

trait Row: DeserializeOwned {
    type Record;

    fn into_record(self) -> Result<Self::Record, CollectionError>;
}

impl Row for NodeRow {
    type Record = NodeRecord;

    fn into_record(self) -> Result<NodeRecord, CollectionError> {
        Ok(NodeRecord {
            uuid: self.uuid,
            time: parse_timestamp(&self.time)?,
            input_model: self.input_model,
            v_mag_pu: self.v_mag,
            v_ang_degree: self.v_ang,
        })
    }
}

impl Row for LoadRow {
    type Record = LoadRecord;

    fn into_record(self) -> Result<LoadRecord, CollectionError> {
        Ok(LoadRecord {
            uuid: self.uuid,
            time: parse_timestamp(&self.time)?,
            input_model: self.input_model,
            p_mw: self.p,
            q_mvar: self.q,
        })
    }
}

impl Row for TransformerRow {
    type Record = TransformerRecord;

    fn into_record(self) -> Result<TransformerRecord, CollectionError> {
        Ok(TransformerRecord {
            uuid: self.uuid,
            time: parse_timestamp(&self.time)?,
            input_model: self.input_model,
            i_a_mag_a: self.i_a_mag,
            i_a_ang_degree: self.i_a_ang,
            i_b_mag_a: self.i_b_mag,
            i_b_ang_degree: self.i_b_ang,
            i_c_mag_a: self.i_c_mag,
            i_c_ang_degree: self.i_c_ang,
            tap_pos: self.tap_pos,
        })
    }
}

/// Parses an ISO-8601 timestamp, ignoring a trailing `[UTC]` zone name.
///
/// Timestamps without offset are taken as UTC.
///
/// # Errors
///
/// Returns [`CollectionError::Timestamp`] if the text is not a timestamp.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, CollectionError> {
    let text = raw.trim();
    let text = text.strip_suffix("[UTC]").unwrap_or(text);
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Ok(time.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S"))
        .map(|naive| naive.and_utc())
        .map_err(|err| CollectionError::Timestamp {
            raw: raw.to_string(),
            message: err.to_string(),
        })
}

/// The four result tables of one simulation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeriesTables {
    pub nodes: Grouped<NodeRecord>,
    pub loads: Grouped<LoadRecord>,
    pub transformers_2w: Grouped<TransformerRecord>,
    pub transformers_3w: Grouped<TransformerRecord>,
}

impl TimeSeriesTables {
    /// Reads the tables of a comma separated result directory.
    ///
    /// # Errors
    ///
    /// Returns a [`CollectionError`] if the node or load table is missing or
    /// any table is malformed.
    pub fn from_directory(dir: &Path) -> Result<Self, CollectionError> {
        Self::from_directory_with_delimiter(dir, b',')
    }

    /// Reads the tables of a result directory with the given column delimiter.
    ///
    /// The transformer tables are optional; a scenario holds only the one of
    /// its winding topology.
    ///
    /// # Errors
    ///
    /// See [`TimeSeriesTables::from_directory`].
    pub fn from_directory_with_delimiter(
        dir: &Path,
        delimiter: u8,
    ) -> Result<Self, CollectionError> {
        let tables = Self {
            nodes: read_table::<NodeRow>(&dir.join(NODE_TABLE), delimiter)?,
            loads: read_table::<LoadRow>(&dir.join(LOAD_TABLE), delimiter)?,
            transformers_2w: read_optional_table(&dir.join(TRANSFORMER_2W_TABLE), delimiter)?,
            transformers_3w: read_optional_table(&dir.join(TRANSFORMER_3W_TABLE), delimiter)?,
        };
        debug!(dir = %dir.display(), %tables, "read time-series tables");
        Ok(tables)
    }

    /// Merges all records of `other` into this set.
    pub fn join(&mut self, other: Self) {
        merge(&mut self.nodes, other.nodes);
        merge(&mut self.loads, other.loads);
        merge(&mut self.transformers_2w, other.transformers_2w);
        merge(&mut self.transformers_3w, other.transformers_3w);
    }
}

impl fmt::Display for TimeSeriesTables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nodes = {}, loads = {}, transformers_2w = {}, transformers_3w = {}",
            count(&self.nodes),
            count(&self.loads),
            count(&self.transformers_2w),
            count(&self.transformers_3w)
        )
    }
}

fn count<R>(table: &Grouped<R>) -> usize {
    table.values().map(Vec::len).sum()
}

fn merge<R>(into: &mut Grouped<R>, from: Grouped<R>) {
    for (time, records) in from {
        into.entry(time).or_default().extend(records);
    }
}

fn read_optional_table(
    path: &Path,
    delimiter: u8,
) -> Result<Grouped<TransformerRecord>, CollectionError> {
    if path.exists() {
        read_table::<TransformerRow>(path, delimiter)
    } else {
        Ok(Grouped::new())
    }
}

fn read_table<T>(path: &Path, delimiter: u8) -> Result<Grouped<T::Record>, CollectionError>
where
    T: Row,
    T::Record: Timestamped,
{
    let file = File::open(path).map_err(|source| CollectionError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut grouped = Grouped::new();
    for row in reader.deserialize::<T>() {
        let row = row.map_err(|source| CollectionError::Csv {
            path: path.display().to_string(),
            source,
        })?;
        let record = row.into_record()?;
        grouped
            .entry(record.time())
            .or_insert_with(Vec::new)
            .push(record);
    }
    Ok(grouped)
}

trait Timestamped {
    fn time(&self) -> DateTime<Utc>;
}

impl Timestamped for NodeRecord {
    fn time(&self) -> DateTime<Utc> {
        self.time
    }
}

impl Timestamped for LoadRecord {
    fn time(&self) -> DateTime<Utc> {
        self.time
    }
}

impl Timestamped for TransformerRecord {
    fn time(&self) -> DateTime<Utc> {
        self.time
    }
}
