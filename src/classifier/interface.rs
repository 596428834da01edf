use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transform::ClassifierInput;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model rejected input: {0}")]
    InvalidInput(String),
    #[error("model prediction failed: {0}")]
    Prediction(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub label: String,
    pub probabilities: BTreeMap<String, f64>,
}

impl ClassificationResult {
    pub fn new(label: impl Into<String>, probabilities: BTreeMap<String, f64>) -> Self {
        Self {
            label: label.into(),
            probabilities,
        }
    }

    /// Probability the model assigned to the winning label, if it reported one.
    pub fn confidence(&self) -> Option<f64> {
        self.probabilities.get(&self.label).copied()
    }
}

/// Adapter over a pre-trained model with a fixed input contract.
///
/// Implementations do not resize or validate; callers hand over an input that
/// already matches the model's declared shape.
pub trait ImageClassifier: Send + Sync {
    fn classify(&self, input: &ClassifierInput) -> Result<ClassificationResult, InferenceError>;
}
