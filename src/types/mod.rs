//! Type definitions for scorer inputs and outputs

pub mod prediction;
pub mod record;

pub use prediction::{PredictionRow, PredictionTable, Threshold};
pub use record::{FeatureValue, Record, RecordBatch, ScoringInput};
