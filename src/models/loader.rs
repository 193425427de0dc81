//! Model and threshold artifact loader

use crate::config::{ArtifactsConfig, ModelFormat};
use crate::error::ArtifactError;
use crate::models::classifier::Classifier;
use crate::models::tree_ensemble::TreeEnsemble;
use crate::types::prediction::Threshold;
use std::path::Path;
use tracing::info;

/// Loader for scorer artifacts
#[derive(Debug, Clone)]
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    #[cfg(feature = "onnx")]
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of ONNX threads.
    /// Without the `onnx` feature the thread count has nothing to configure.
    #[cfg_attr(not(feature = "onnx"), allow(unused_variables))]
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            #[cfg(feature = "onnx")]
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load the classifier described by `config`
    pub fn load_model(&self, config: &ArtifactsConfig) -> Result<Box<dyn Classifier>, ArtifactError> {
        let path = config.model_path.as_path();

        info!(path = %path.display(), format = ?config.format, "Loading model");

        match config.format {
            ModelFormat::XgboostJson => Ok(Box::new(TreeEnsemble::load(path)?)),
            ModelFormat::Onnx => self.load_onnx(path, &config.feature_names),
        }
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(
        &self,
        path: &Path,
        feature_names: &[String],
    ) -> Result<Box<dyn Classifier>, ArtifactError> {
        let model = crate::models::onnx::OnnxClassifier::load(
            path,
            feature_names.to_vec(),
            self.onnx_threads,
        )?;
        Ok(Box::new(model))
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx(
        &self,
        path: &Path,
        _feature_names: &[String],
    ) -> Result<Box<dyn Classifier>, ArtifactError> {
        Err(ArtifactError::unsupported(
            path,
            "ONNX models require the `onnx` feature",
        ))
    }

    /// Load a decision threshold stored as a single number in a text file
    pub fn load_threshold<P: AsRef<Path>>(&self, path: P) -> Result<Threshold, ArtifactError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let raw = text.trim();
        let value: f64 = raw.parse().map_err(|_| {
            ArtifactError::malformed(path, format!("expected a number, found `{}`", raw))
        })?;
        let threshold = Threshold::new(value).ok_or_else(|| ArtifactError::ThresholdOutOfRange {
            path: path.to_path_buf(),
            value,
        })?;

        info!(path = %path.display(), threshold = threshold.value(), "Threshold loaded");

        Ok(threshold)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}
