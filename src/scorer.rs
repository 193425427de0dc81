//! Churn scorer: a loaded classifier plus its decision threshold

use crate::config::ArtifactsConfig;
use crate::error::{ArtifactError, InferenceError, ScoringError};
use crate::models::classifier::Classifier;
use crate::models::loader::ModelLoader;
use crate::types::prediction::{PredictionRow, PredictionTable, Threshold};
use crate::types::record::ScoringInput;
use std::path::Path;
use tracing::{debug, info};

/// Scores customer records with a pre-trained binary classifier.
///
/// A `Scorer` only exists once both artifacts are loaded, and never changes
/// afterwards. It is `Send + Sync`, so one instance can serve many threads.
pub struct Scorer {
    classifier: Box<dyn Classifier>,
    threshold: Threshold,
}

impl Scorer {
    /// Wrap an already loaded classifier
    pub fn new(classifier: Box<dyn Classifier>, threshold: Threshold) -> Self {
        Self {
            classifier,
            threshold,
        }
    }

    /// Load an XGBoost JSON model and a threshold file
    pub fn load<P, Q>(model_path: P, threshold_path: Q) -> Result<Self, ArtifactError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let config = ArtifactsConfig {
            model_path: model_path.as_ref().to_path_buf(),
            threshold_path: threshold_path.as_ref().to_path_buf(),
            ..ArtifactsConfig::default()
        };
        Self::from_config(&config)
    }

    /// Load both artifacts as described by `config`
    pub fn from_config(config: &ArtifactsConfig) -> Result<Self, ArtifactError> {
        let loader = ModelLoader::with_threads(config.onnx_threads);
        let classifier = loader.load_model(config)?;
        let threshold = loader.load_threshold(&config.threshold_path)?;

        info!(
            model = classifier.name(),
            features = classifier.feature_names().len(),
            threshold = threshold.value(),
            "Scorer ready"
        );

        Ok(Self::new(classifier, threshold))
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Score one record or a batch of records.
    ///
    /// Returns one row per input record, in input order. Feature rows must
    /// already be encoded the way the model was trained; classifier failures
    /// are returned unchanged as [`ScoringError::Inference`].
    pub fn predict_churn(&self, input: impl Into<ScoringInput>) -> Result<PredictionTable, ScoringError> {
        let batch = input.into().into_batch();
        let probs = self.classifier.predict_proba(&batch)?;

        if probs.len() != batch.len() {
            return Err(InferenceError::RowCountMismatch {
                expected: batch.len(),
                actual: probs.len(),
            }
            .into());
        }

        let rows = probs
            .into_iter()
            .enumerate()
            .map(|(row, probability)| {
                if !(0.0..=1.0).contains(&probability) {
                    return Err(InferenceError::ProbabilityOutOfRange {
                        row,
                        value: probability,
                    });
                }
                Ok(PredictionRow::from_probability(probability, self.threshold))
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            rows = rows.len(),
            positives = rows.iter().filter(|r| r.prediction == 1).count(),
            "Scored batch"
        );

        Ok(PredictionTable::new(rows))
    }

    /// Score a JSON object (one record) or a JSON array of objects (a batch)
    pub fn predict_json(&self, input: &serde_json::Value) -> Result<PredictionTable, ScoringError> {
        self.predict_churn(ScoringInput::from_json(input)?)
    }
}
