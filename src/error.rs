//! Error types for artifact loading and scoring

use std::path::PathBuf;
use thiserror::Error;

/// Failure to load a model or threshold artifact. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed artifact {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("unsupported model {}: {reason}", path.display())]
    Unsupported { path: PathBuf, reason: String },

    #[error("model runtime failed to load {}: {reason}", path.display())]
    Runtime { path: PathBuf, reason: String },

    #[error("threshold in {} must be within [0, 1], got {value}", path.display())]
    ThresholdOutOfRange { path: PathBuf, value: f64 },
}

impl ArtifactError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ArtifactError::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ArtifactError::Unsupported {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Failure raised by the classifier while scoring a batch.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("row {row}: missing feature `{feature}`")]
    MissingFeature { row: usize, feature: String },

    #[error("row {row}: feature `{feature}` is not numeric (got {value})")]
    NonNumericFeature {
        row: usize,
        feature: String,
        value: String,
    },

    #[error("row {row}: classifier returned probability {value} outside [0, 1]")]
    ProbabilityOutOfRange { row: usize, value: f64 },

    #[error("classifier returned {actual} probabilities for {expected} rows")]
    RowCountMismatch { expected: usize, actual: usize },

    #[error("model backend failed: {0}")]
    Backend(String),
}

/// Error returned by [`crate::Scorer::predict_churn`].
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("input must be a record or a collection of records, got {received}")]
    InvalidInput { received: String },

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl ScoringError {
    pub(crate) fn invalid_input(received: impl Into<String>) -> Self {
        ScoringError::InvalidInput {
            received: received.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_names_received_type() {
        let err = ScoringError::invalid_input("number");
        assert_eq!(
            err.to_string(),
            "input must be a record or a collection of records, got number"
        );
    }

    #[test]
    fn test_inference_error_is_transparent() {
        let err: ScoringError = InferenceError::MissingFeature {
            row: 2,
            feature: "tenure".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "row 2: missing feature `tenure`");
    }
}
