//! ONNX Runtime backend
//!
//! Handles both tensor probability outputs (XGBoost, RandomForest exports) and
//! `seq(map(int64, float))` outputs (CatBoost, LightGBM exports).

use crate::error::{ArtifactError, InferenceError};
use crate::models::classifier::{dense_row, Classifier};
use crate::types::record::RecordBatch;
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Classifier backed by an ONNX Runtime session
pub struct OnnxClassifier {
    /// Running a session needs exclusive access
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    feature_names: Vec<String>,
}

impl OnnxClassifier {
    /// Load an ONNX model. `feature_names` fixes the input column order.
    pub fn load(path: &Path, feature_names: Vec<String>, threads: usize) -> Result<Self, ArtifactError> {
        if feature_names.is_empty() {
            return Err(ArtifactError::malformed(
                path,
                "ONNX models need `artifacts.feature_names` to map record fields to input columns",
            ));
        }

        let runtime_err = |e: ort::Error| ArtifactError::Runtime {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        info!(path = %path.display(), threads = threads, "Loading ONNX model");

        let session = Session::builder()
            .map_err(runtime_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(runtime_err)?
            .with_intra_threads(threads)
            .map_err(runtime_err)?
            .commit_from_file(path)
            .map_err(runtime_err)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob") || o.name.contains("output"))
            .map(|o| o.name.clone())
            .unwrap_or_else(|| {
                session
                    .outputs
                    .last()
                    .map(|o| o.name.clone())
                    .unwrap_or_else(|| "probabilities".to_string())
            });

        info!(
            input = %input_name,
            output = %output_name,
            features = feature_names.len(),
            "ONNX model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            feature_names,
        })
    }

    fn run(&self, rows: usize, data: Vec<f32>) -> Result<Vec<f64>, ort::Error> {
        let shape = vec![rows as i64, self.feature_names.len() as i64];
        let input = Tensor::from_array((shape, data))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ort::Error::new("session lock poisoned"))?;
        let outputs = session.run(ort::inputs![&self.input_name => input])?;

        extract_probabilities(&outputs, &self.output_name, rows)
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        "onnx"
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, batch: &RecordBatch) -> Result<Vec<f64>, InferenceError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let mut data = Vec::with_capacity(batch.len() * self.feature_names.len());
        for (i, record) in batch.iter().enumerate() {
            data.extend(dense_row(&self.feature_names, record, i)?);
        }

        let probs = self
            .run(batch.len(), data)
            .map_err(|e| InferenceError::Backend(e.to_string()))?;

        debug!(rows = probs.len(), "ONNX model scored batch");
        Ok(probs)
    }
}

/// Pull one positive-class probability per row out of the session outputs
fn extract_probabilities(
    outputs: &SessionOutputs,
    output_name: &str,
    rows: usize,
) -> Result<Vec<f64>, ort::Error> {
    if let Some(output) = outputs.get(output_name) {
        if let Some(probs) = extract_from_value(&output, rows)? {
            return Ok(probs);
        }
    }

    // Fall back to any output that is not the label tensor
    for (name, output) in outputs.iter() {
        if name.contains("label") {
            continue;
        }
        if let Some(probs) = extract_from_value(&output, rows)? {
            debug!(output = %name, "Extracted probabilities from fallback output");
            return Ok(probs);
        }
    }

    Err(ort::Error::new("no probability output found"))
}

fn extract_from_value(output: &DynValue, rows: usize) -> Result<Option<Vec<f64>>, ort::Error> {
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        return Ok(Some(probabilities_from_tensor(&dims, data, rows)?));
    }

    if DynSequenceValueType::can_downcast(&output.dtype()) {
        return probabilities_from_sequence_map(output, rows).map(Some);
    }

    Ok(None)
}

/// `[n, classes]`, `[n, 1]` or `[n]` probability tensors
fn probabilities_from_tensor(dims: &[i64], data: &[f32], rows: usize) -> Result<Vec<f64>, ort::Error> {
    let columns = match dims {
        [n, c] if *n as usize == rows => *c as usize,
        [n] if *n as usize == rows => 1,
        _ => {
            return Err(ort::Error::new(format!(
                "unexpected probability tensor shape {:?} for {} rows",
                dims, rows
            )))
        }
    };
    let column = if columns >= 2 { 1 } else { 0 };

    Ok((0..rows)
        .map(|row| data[row * columns + column] as f64)
        .collect())
}

/// One map per row, keyed by class id
fn probabilities_from_sequence_map(output: &DynValue, rows: usize) -> Result<Vec<f64>, ort::Error> {
    let allocator = Allocator::default();

    let sequence = output.downcast_ref::<DynSequenceValueType>()?;
    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    if maps.len() != rows {
        return Err(ort::Error::new(format!(
            "probability sequence has {} entries for {} rows",
            maps.len(),
            rows
        )));
    }

    maps.iter()
        .map(|map_value| {
            let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
            if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 1) {
                return Ok(*prob as f64);
            }
            kv_pairs
                .iter()
                .find(|(class_id, _)| *class_id == 0)
                .map(|(_, prob)| 1.0 - *prob as f64)
                .ok_or_else(|| ort::Error::new("no class probability found in map"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_class_tensor_takes_positive_column() {
        let probs = probabilities_from_tensor(&[2, 2], &[0.9, 0.1, 0.3, 0.7], 2).unwrap();
        assert!((probs[0] - 0.1).abs() < 1e-6);
        assert!((probs[1] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_single_column_tensor() {
        let probs = probabilities_from_tensor(&[3], &[0.2, 0.5, 0.8], 3).unwrap();
        assert_eq!(probs.len(), 3);
        assert!((probs[2] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_tensor_row_mismatch() {
        assert!(probabilities_from_tensor(&[1, 2], &[0.4, 0.6], 2).is_err());
    }
}
