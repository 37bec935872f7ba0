//! JSON persistence of sweep points.
//!
//! Points are stored as a JSON array. Every converged point carries its
//! result with an explicit `kind` tag, so two-port and three-port files are
//! read back without knowing the topology.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::context::RunContext;
use crate::error::ExportError;
use crate::result::SweepPoint;

/// Writes `points` as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if serialization or writing fails.
pub fn write_points_json(points: &[SweepPoint], writer: impl Write) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(writer, points)?;
    Ok(())
}

/// Reads points written by [`write_points_json`].
///
/// Apparent powers are recomputed from active and reactive power.
///
/// # Errors
///
/// Returns [`ExportError::Json`] for malformed input.
pub fn read_points_json(reader: impl Read) -> Result<Vec<SweepPoint>, ExportError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Saves `points` to `name` in the run's output directory.
///
/// # Errors
///
/// See [`write_points_json`].
pub fn save_points(
    ctx: &RunContext,
    name: &str,
    points: &[SweepPoint],
) -> Result<PathBuf, ExportError> {
    ctx.write_file(name, |w| write_points_json(points, w))?;
    info!(run = ctx.label(), name, points = points.len(), "saved sweep points");
    Ok(ctx.output_path(name))
}

/// Loads points from `path`.
///
/// # Errors
///
/// * [`ExportError::Io`] if the file cannot be opened
/// * [`ExportError::Json`] for malformed content
pub fn load_points(path: &Path) -> Result<Vec<SweepPoint>, ExportError> {
    let file = File::open(path)?;
    read_points_json(BufReader::new(file))
}
