//! TOML-based bench configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::backend::Topology;
use crate::context::RunContext;
use crate::extract::{ExternalObjects, ExtractionConvention};
use crate::timeseries::CollectionSpec;

/// Top-level bench configuration parsed from TOML.
///
/// All fields have defaults matching the two-winding bench. Load from TOML
/// with [`BenchConfig::from_toml_file`] or use one of the presets.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchConfig {
    /// Ratings and tap range of the transformer under test.
    #[serde(default)]
    pub transformer: TransformerConfig,
    /// Setpoint grid of the sweep.
    #[serde(default)]
    pub sweep: SweepConfig,
    /// Angle and power conventions of the numeric and time-series paths.
    #[serde(default)]
    pub convention: ExtractionConvention,
    /// Object names inside the external application, if one is driven.
    #[serde(default)]
    pub external: Option<ExternalObjects>,
    /// Entities of a time-series scenario, if results are collected from disk.
    #[serde(default)]
    pub collection: Option<CollectionSpec>,
    /// Directories and file layout of the run.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Ratings and tap range of the transformer under test.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformerConfig {
    pub topology: Topology,
    /// Rated apparent power of the high voltage port (MVA).
    pub s_nom_hv_mva: f64,
    /// Rated apparent power of the medium voltage port (MVA), three-winding only.
    pub s_nom_mv_mva: f64,
    /// Rated apparent power of the low voltage port (MVA).
    pub s_nom_lv_mva: f64,
    /// Lowest tap position (inclusive).
    pub tap_min: i32,
    /// Highest tap position (inclusive).
    pub tap_max: i32,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            topology: Topology::TwoWinding,
            s_nom_hv_mva: 0.63,
            s_nom_mv_mva: 0.63,
            s_nom_lv_mva: 0.63,
            tap_min: -10,
            tap_max: 10,
        }
    }
}

/// Setpoint grid of the sweep.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    /// Per-unit ticks over `[-1, 1]` per power axis (must be >= 2).
    pub ticks: usize,
    /// Setpoint resolution (MW).
    pub resolution_mw: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            ticks: 21,
            resolution_mw: 0.001,
        }
    }
}

/// Directories and file layout of the run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Run label used in log records.
    pub label: String,
    /// Base directory of time-series inputs.
    pub input_dir: PathBuf,
    /// Directory all result files are written to.
    pub output_dir: PathBuf,
    /// File stem of exported tables.
    pub stem: String,
    /// Column separator of the dense grid files.
    pub col_sep: char,
    /// Setpoints closer than this are the same operating point (MW).
    pub tolerance_mw: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            label: "bench".to_string(),
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("results"),
            stem: "results".to_string(),
            col_sep: ',',
            tolerance_mw: 1e-6,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"sweep.ticks"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

fn positive(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !value.is_finite() || value <= 0.0 {
        errors.push(ConfigError {
            field: field.into(),
            message: format!("must be finite and > 0, got {value}"),
        });
    }
}

impl BenchConfig {
    /// Two-winding bench: 0.63 MVA distribution transformer, kW resolution.
    pub fn two_winding() -> Self {
        Self {
            transformer: TransformerConfig::default(),
            sweep: SweepConfig::default(),
            convention: ExtractionConvention::default(),
            external: Some(ExternalObjects::two_winding()),
            collection: None,
            output: OutputConfig::default(),
        }
    }

    /// Three-winding bench: 300/300/100 MVA grid coupling transformer,
    /// whole-megawatt resolution.
    pub fn three_winding() -> Self {
        Self {
            transformer: TransformerConfig {
                topology: Topology::ThreeWinding,
                s_nom_hv_mva: 300.0,
                s_nom_mv_mva: 300.0,
                s_nom_lv_mva: 100.0,
                ..TransformerConfig::default()
            },
            sweep: SweepConfig {
                ticks: 11,
                resolution_mw: 1.0,
            },
            convention: ExtractionConvention::default(),
            external: Some(ExternalObjects::three_winding()),
            collection: None,
            output: OutputConfig::default(),
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["two_winding", "three_winding"];

    /// Loads a bench from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "two_winding" => Ok(Self::two_winding()),
            "three_winding" => Ok(Self::three_winding()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a bench from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "bench".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a bench from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Context of a run with the configured label and directories.
    pub fn run_context(&self) -> RunContext {
        RunContext::new(
            self.output.label.clone(),
            self.output.input_dir.clone(),
            self.output.output_dir.clone(),
        )
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let t = &self.transformer;
        let three_winding = t.topology == Topology::ThreeWinding;

        positive(&mut errors, "transformer.s_nom_hv_mva", t.s_nom_hv_mva);
        if three_winding {
            positive(&mut errors, "transformer.s_nom_mv_mva", t.s_nom_mv_mva);
        }
        positive(&mut errors, "transformer.s_nom_lv_mva", t.s_nom_lv_mva);
        if t.tap_min > t.tap_max {
            errors.push(ConfigError {
                field: "transformer.tap_min".into(),
                message: "must be <= transformer.tap_max".into(),
            });
        }

        if self.sweep.ticks < 2 {
            errors.push(ConfigError {
                field: "sweep.ticks".into(),
                message: "must be >= 2".into(),
            });
        }
        positive(&mut errors, "sweep.resolution_mw", self.sweep.resolution_mw);

        if let Some(external) = self.external.as_ref().filter(|_| three_winding) {
            if external.node_mv.is_none() {
                errors.push(ConfigError {
                    field: "external.node_mv".into(),
                    message: "required for a three-winding transformer".into(),
                });
            }
            if external.load_mv.is_none() {
                errors.push(ConfigError {
                    field: "external.load_mv".into(),
                    message: "required for a three-winding transformer".into(),
                });
            }
        }

        if let Some(collection) = &self.collection {
            if collection.topology != t.topology {
                errors.push(ConfigError {
                    field: "collection.topology".into(),
                    message: "must match transformer.topology".into(),
                });
            }
            if collection.topology == Topology::ThreeWinding {
                for (field, missing) in [
                    ("collection.node_mv", collection.node_mv.is_none()),
                    ("collection.load_mv", collection.load_mv.is_none()),
                    ("collection.rated.mv_kv", collection.rated.mv_kv.is_none()),
                ] {
                    if missing {
                        errors.push(ConfigError {
                            field: field.into(),
                            message: "required for a three-winding transformer".into(),
                        });
                    }
                }
            }
        }

        let out = &self.output;
        if out.stem.is_empty() {
            errors.push(ConfigError {
                field: "output.stem".into(),
                message: "must not be empty".into(),
            });
        }
        if matches!(out.col_sep, '\n' | '\r' | '"') {
            errors.push(ConfigError {
                field: "output.col_sep".into(),
                message: format!("cannot separate columns with {:?}", out.col_sep),
            });
        }
        if !out.tolerance_mw.is_finite() || out.tolerance_mw < 0.0 {
            errors.push(ConfigError {
                field: "output.tolerance_mw".into(),
                message: "must be finite and >= 0".into(),
            });
        }

        errors
    }
}
