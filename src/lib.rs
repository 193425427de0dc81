//! Churn Scorer Library
//!
//! Loads a pre-trained binary churn classifier and its decision threshold,
//! then scores customer records into a probability and a 0/1 prediction.

pub mod config;
pub mod error;
pub mod models;
pub mod scorer;
pub mod types;

pub use config::ScorerConfig;
pub use error::{ArtifactError, InferenceError, ScoringError};
pub use scorer::Scorer;
pub use types::{FeatureValue, PredictionRow, PredictionTable, Record, RecordBatch, ScoringInput, Threshold};
