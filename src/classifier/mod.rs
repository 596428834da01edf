pub mod impl_fake;
pub mod interface;

pub use impl_fake::FakeImageClassifier;
pub use interface::{ClassificationResult, ImageClassifier, InferenceError};
