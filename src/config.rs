//! Configuration management for the churn scorer

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/scorer.toml";

/// Serialization format of the model artifact
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    /// XGBoost JSON document, evaluated natively
    #[default]
    XgboostJson,
    /// ONNX graph, evaluated with ONNX Runtime (requires the `onnx` feature)
    Onnx,
}

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScorerConfig {
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Model and threshold artifact locations
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// Path to the trained classifier
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    /// Path to a plain-text file holding the decision threshold
    #[serde(default = "default_threshold_path")]
    pub threshold_path: PathBuf,
    #[serde(default)]
    pub format: ModelFormat,
    /// Column order of the model input. Only read for ONNX models, which
    /// carry no feature names of their own.
    #[serde(default)]
    pub feature_names: Vec<String>,
    /// Number of intra-op threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/churn_model.json")
}

fn default_threshold_path() -> PathBuf {
    PathBuf::from("models/churn_threshold.txt")
}

fn default_onnx_threads() -> usize {
    1
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            threshold_path: default_threshold_path(),
            format: ModelFormat::default(),
            feature_names: Vec::new(),
            onnx_threads: default_onnx_threads(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ScorerConfig {
    /// Load configuration from the default file, or fall back to built-in
    /// defaults when that file does not exist.
    pub fn load() -> Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if path.exists() {
            Self::load_from_path(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
