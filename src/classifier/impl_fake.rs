use std::collections::BTreeMap;
use std::sync::Mutex;

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::interface::{ClassificationResult, ImageClassifier, InferenceError};
use crate::transform::ClassifierInput;

const SIGN_LABELS: [&str; 12] = [
    "stop",
    "yield",
    "no_entry",
    "speed_limit_30",
    "speed_limit_50",
    "speed_limit_80",
    "pedestrian_crossing",
    "roundabout",
    "keep_right",
    "no_parking",
    "road_work",
    "children_crossing",
];

/// Stand-in model that returns a random traffic-sign label.
pub struct FakeImageClassifier {
    rng: Mutex<StdRng>,
    input_size: (u32, u32),
}

impl FakeImageClassifier {
    pub fn new(input_size: (u32, u32)) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            input_size,
        }
    }

    pub fn with_seed(input_size: (u32, u32), seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            input_size,
        }
    }

    pub fn labels() -> &'static [&'static str] {
        &SIGN_LABELS
    }
}

impl ImageClassifier for FakeImageClassifier {
    fn classify(&self, input: &ClassifierInput) -> Result<ClassificationResult, InferenceError> {
        // A real model would fail the same way on a mis-shaped buffer.
        if input.dimensions() != self.input_size {
            return Err(InferenceError::InvalidInput(format!(
                "expected {}x{}, got {}x{}",
                self.input_size.0,
                self.input_size.1,
                input.width(),
                input.height()
            )));
        }

        let mut rng = self
            .rng
            .lock()
            .map_err(|_| InferenceError::Prediction("classifier rng poisoned".into()))?;

        let weights: Vec<f64> = SIGN_LABELS.iter().map(|_| rng.gen_range(0.01..1.0)).collect();
        let total: f64 = weights.iter().sum();

        let probabilities: BTreeMap<String, f64> = SIGN_LABELS
            .iter()
            .zip(&weights)
            .map(|(label, weight)| (label.to_string(), weight / total))
            .collect();

        let label = probabilities
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(label, _)| label.clone())
            .ok_or_else(|| InferenceError::Prediction("empty label set".into()))?;

        Ok(ClassificationResult::new(label, probabilities))
    }
}
