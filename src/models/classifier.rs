//! Classifier abstraction shared by the model backends

use crate::error::InferenceError;
use crate::types::record::{Record, RecordBatch};

/// A loaded binary classifier.
///
/// Implementations are read-only after load so a single instance can be shared
/// across threads.
pub trait Classifier: Send + Sync {
    /// Human readable backend name, used in logs
    fn name(&self) -> &str;

    /// Features the model reads from each record, in model column order
    fn feature_names(&self) -> &[String];

    /// Positive-class probability for every row of `batch`, in row order.
    fn predict_proba(&self, batch: &RecordBatch) -> Result<Vec<f64>, InferenceError>;
}

/// Build a dense feature row in `feature_names` order.
///
/// Fields the model does not read are ignored.
pub fn dense_row(
    feature_names: &[String],
    record: &Record,
    row: usize,
) -> Result<Vec<f32>, InferenceError> {
    feature_names
        .iter()
        .map(|name| {
            let value = record
                .get(name)
                .ok_or_else(|| InferenceError::MissingFeature {
                    row,
                    feature: name.clone(),
                })?;
            value.as_f32().ok_or_else(|| InferenceError::NonNumericFeature {
                row,
                feature: name.clone(),
                value: format!("{:?}", value),
            })
        })
        .collect()
}
