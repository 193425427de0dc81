//! Scoring output structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Decision threshold in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Threshold(f64);

impl Threshold {
    /// Returns `None` unless `value` is finite and within [0, 1].
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// 1 when `probability >= threshold`, else 0.
    pub fn classify(self, probability: f64) -> u8 {
        if probability >= self.0 {
            1
        } else {
            0
        }
    }
}

impl TryFrom<f64> for Threshold {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Threshold::new(value).ok_or_else(|| format!("threshold {} is outside [0, 1]", value))
    }
}

impl From<Threshold> for f64 {
    fn from(t: Threshold) -> Self {
        t.0
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Score for one input record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    /// Positive-class probability (0.0 - 1.0)
    pub probability: f64,
    /// 1 when `probability >= threshold`, else 0
    pub prediction: u8,
}

impl PredictionRow {
    pub fn from_probability(probability: f64, threshold: Threshold) -> Self {
        Self {
            probability,
            prediction: threshold.classify(probability),
        }
    }
}

/// Scores for a batch, one row per input record in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictionTable {
    rows: Vec<PredictionRow>,
}

impl PredictionTable {
    pub fn new(rows: Vec<PredictionRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[PredictionRow] {
        &self.rows
    }

    pub fn probabilities(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|r| r.probability)
    }

    pub fn predictions(&self) -> impl Iterator<Item = u8> + '_ {
        self.rows.iter().map(|r| r.prediction)
    }

    pub fn into_rows(self) -> Vec<PredictionRow> {
        self.rows
    }
}

impl fmt::Display for PredictionTable {
    /// Index-prefixed two column layout:
    ///
    /// ```text
    ///    probability  prediction
    /// 0     0.598688           1
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let index_width = self.rows.len().saturating_sub(1).to_string().len();
        write!(f, "{:>w$}  {:>11}  {:>10}", "", "probability", "prediction", w = index_width)?;
        for (i, row) in self.rows.iter().enumerate() {
            write!(
                f,
                "\n{:<w$}  {:>11.6}  {:>10}",
                i,
                row.probability,
                row.prediction,
                w = index_width
            )?;
        }
        Ok(())
    }
}
