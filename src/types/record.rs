//! Input records accepted by the scorer

use crate::error::ScoringError;
use serde::Serialize;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// A single scalar feature value.
///
/// Values are passed to the model as given. Categorical fields must already be
/// encoded by the caller in the form the model was trained on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FeatureValue {
    /// Numeric view used to build model feature rows.
    ///
    /// Null maps to NaN, which tree models treat as a missing value.
    /// Text has no numeric view.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            FeatureValue::Null => Some(f32::NAN),
            FeatureValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FeatureValue::Number(n) => Some(*n as f32),
            FeatureValue::Text(_) => None,
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(FeatureValue::Null),
            Value::Bool(b) => Some(FeatureValue::Bool(*b)),
            Value::Number(n) => n.as_f64().map(FeatureValue::Number),
            Value::String(s) => Some(FeatureValue::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Number(v)
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        FeatureValue::Number(v as f64)
    }
}

impl From<i32> for FeatureValue {
    fn from(v: i32) -> Self {
        FeatureValue::Number(v as f64)
    }
}

impl From<bool> for FeatureValue {
    fn from(v: bool) -> Self {
        FeatureValue::Bool(v)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Text(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        FeatureValue::Text(v)
    }
}

/// One input record: feature name to scalar value, in the order the
/// caller supplied the fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, FeatureValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Convert a JSON object into a record. `origin` names the object in errors.
    fn from_json_object(object: &Map<String, Value>, origin: &str) -> Result<Self, ScoringError> {
        let mut record = Record::new();
        for (name, value) in object {
            let value = FeatureValue::from_json(value).ok_or_else(|| {
                ScoringError::invalid_input(format!(
                    "{} field `{}` of type {}",
                    origin,
                    name,
                    json_type_name(value)
                ))
            })?;
            record.fields.insert(name.clone(), value);
        }
        Ok(record)
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<FeatureValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Ordered collection of records. Row order is preserved through scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RecordBatch {
    rows: Vec<Record>,
}

impl RecordBatch {
    pub fn new(rows: Vec<Record>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.rows.iter()
    }
}

impl From<Vec<Record>> for RecordBatch {
    fn from(rows: Vec<Record>) -> Self {
        Self::new(rows)
    }
}

impl FromIterator<Record> for RecordBatch {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RecordBatch {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// The two input shapes accepted by the scorer.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringInput {
    One(Record),
    Batch(RecordBatch),
}

impl ScoringInput {
    /// Accept a JSON object (one record) or a JSON array of objects (a batch).
    ///
    /// Any other shape is rejected with an error naming what was received.
    pub fn from_json(value: &Value) -> Result<Self, ScoringError> {
        match value {
            Value::Object(object) => Ok(ScoringInput::One(Record::from_json_object(
                object, "record",
            )?)),
            Value::Array(items) => {
                let mut rows = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item {
                        Value::Object(object) => {
                            rows.push(Record::from_json_object(object, &format!("row {}", i))?)
                        }
                        other => {
                            return Err(ScoringError::invalid_input(format!(
                                "array element {} of type {}",
                                i,
                                json_type_name(other)
                            )))
                        }
                    }
                }
                Ok(ScoringInput::Batch(RecordBatch::new(rows)))
            }
            other => Err(ScoringError::invalid_input(json_type_name(other))),
        }
    }

    /// Normalize into a batch; a lone record becomes a one-row batch.
    pub fn into_batch(self) -> RecordBatch {
        match self {
            ScoringInput::One(record) => RecordBatch::new(vec![record]),
            ScoringInput::Batch(batch) => batch,
        }
    }
}

impl From<Record> for ScoringInput {
    fn from(record: Record) -> Self {
        ScoringInput::One(record)
    }
}

impl From<RecordBatch> for ScoringInput {
    fn from(batch: RecordBatch) -> Self {
        ScoringInput::Batch(batch)
    }
}

impl From<Vec<Record>> for ScoringInput {
    fn from(rows: Vec<Record>) -> Self {
        ScoringInput::Batch(RecordBatch::new(rows))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_is_one_record() {
        let input = ScoringInput::from_json(&json!({
            "tenure": 12,
            "gender": "Male",
            "paperless": true,
            "total_charges": null
        }))
        .unwrap();

        let ScoringInput::One(record) = input else {
            panic!("expected a single record");
        };
        assert_eq!(record.len(), 4);
        assert_eq!(record.get("tenure"), Some(&FeatureValue::Number(12.0)));
        assert_eq!(record.get("gender"), Some(&FeatureValue::Text("Male".to_string())));
        assert_eq!(record.get("paperless"), Some(&FeatureValue::Bool(true)));
        assert_eq!(record.get("total_charges"), Some(&FeatureValue::Null));
    }

    #[test]
    fn test_record_keeps_field_order() {
        let input = ScoringInput::from_json(&json!({
            "tenure": 12,
            "contract": "Month-to-month",
            "monthly_charges": 70.5,
            "gender": "Male"
        }))
        .unwrap();

        let ScoringInput::One(record) = input else {
            panic!("expected a single record");
        };
        let names: Vec<_> = record.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["tenure", "contract", "monthly_charges", "gender"]);
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"tenure":12.0,"contract":"Month-to-month","monthly_charges":70.5,"gender":"Male"}"#
        );

        let built = Record::new().with("total_charges", 850.75).with("senior_citizen", 0);
        let names: Vec<_> = built.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["total_charges", "senior_citizen"]);
    }

    #[test]
    fn test_array_keeps_row_order() {
        let input = ScoringInput::from_json(&json!([
            {"tenure": 1},
            {"tenure": 2},
            {"tenure": 3}
        ]))
        .unwrap();

        let batch = input.into_batch();
        let tenures: Vec<_> = batch
            .iter()
            .map(|r| r.get("tenure").and_then(FeatureValue::as_f32))
            .collect();
        assert_eq!(tenures, vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_lone_record_becomes_one_row() {
        let record = Record::new().with("tenure", 12);
        let batch = ScoringInput::from(record.clone()).into_batch();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.rows()[0], record);
    }

    #[test]
    fn test_rejects_scalars() {
        for (value, name) in [
            (json!(42), "number"),
            (json!("customer"), "string"),
            (json!(null), "null"),
            (json!(true), "boolean"),
        ] {
            match ScoringInput::from_json(&value) {
                Err(ScoringError::InvalidInput { received }) => assert_eq!(received, name),
                other => panic!("expected InvalidInput, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_rejects_non_record_array_element() {
        let err = ScoringInput::from_json(&json!([{"tenure": 1}, 7])).unwrap_err();
        match err {
            ScoringError::InvalidInput { received } => {
                assert_eq!(received, "array element 1 of type number")
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_nested_field() {
        let err = ScoringInput::from_json(&json!({"tenure": [1, 2]})).unwrap_err();
        assert!(err.to_string().contains("record field `tenure` of type array"));
    }

    #[test]
    fn test_empty_array_is_empty_batch() {
        let batch = ScoringInput::from_json(&json!([])).unwrap().into_batch();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(FeatureValue::from(70.5).as_f32(), Some(70.5));
        assert_eq!(FeatureValue::from(false).as_f32(), Some(0.0));
        assert!(FeatureValue::Null.as_f32().unwrap().is_nan());
        assert_eq!(FeatureValue::from("Fiber optic").as_f32(), None);
    }
}
