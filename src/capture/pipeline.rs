use std::{sync::Arc, time::Instant};

use chrono::Utc;
use image::{codecs::jpeg::JpegEncoder, RgbImage};
use serde::Serialize;
use thiserror::Error;

use crate::{
    classifier::{ClassificationResult, ImageClassifier, InferenceError},
    config::AppConfig,
    db::{HistoryEntry, NewHistoryEntry},
    frame::RawFrame,
    history::HistoryStore,
    transform::{transform_frame, CropRegion, ResizeMode, TargetSize, TransformError},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("failed to encode history image: {0}")]
    Encode(#[from] image::ImageError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error("failed to persist capture: {0:#}")]
    Persistence(anyhow::Error),
    #[error("capture worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub target: TargetSize,
    pub resize_mode: ResizeMode,
    pub jpeg_quality: u8,
    /// Store the image even when the classifier fails, with no label.
    pub keep_unlabeled: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            target: config.target_size(),
            resize_mode: config.resize_mode,
            jpeg_quality: config.jpeg_quality,
            keep_unlabeled: config.keep_unlabeled_captures,
        }
    }
}

/// What the preview thumbnail shows: the most recently completed capture.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturePreview {
    pub entry_id: String,
    pub image_jpeg: Vec<u8>,
    pub label: Option<String>,
}

impl From<&HistoryEntry> for CapturePreview {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            entry_id: entry.id.clone(),
            image_jpeg: entry.image_jpeg.clone(),
            label: entry.label.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub entry: HistoryEntry,
    pub preview: CapturePreview,
}

struct Analysis {
    image_jpeg: Vec<u8>,
    classification: Result<ClassificationResult, InferenceError>,
    transform_ms: u128,
    inference_ms: u128,
}

/// Crop → resize → convert → classify → store, for one captured frame.
pub struct CapturePipeline {
    classifier: Arc<dyn ImageClassifier>,
    history: HistoryStore,
    settings: PipelineSettings,
}

impl CapturePipeline {
    pub fn new(
        classifier: Arc<dyn ImageClassifier>,
        history: HistoryStore,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            classifier,
            history,
            settings,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run a frame through every stage. Runs to completion once started.
    pub async fn process(
        &self,
        frame: RawFrame,
        crop: CropRegion,
    ) -> Result<CaptureOutcome, CaptureError> {
        let captured_at = Utc::now();
        let classifier = Arc::clone(&self.classifier);
        let settings = self.settings.clone();

        // Pixel work and inference are CPU bound; keep them off the runtime.
        let analysis = tokio::task::spawn_blocking(move || {
            analyze(&frame, &crop, &settings, classifier.as_ref())
        })
        .await??;

        let (label, confidence) = match analysis.classification {
            Ok(result) => {
                log_debug!(
                    "Classified capture as {} ({:?}) in {}ms",
                    result.label,
                    result.confidence(),
                    analysis.inference_ms
                );
                let confidence = result.confidence();
                (Some(result.label), confidence)
            }
            Err(err) if self.settings.keep_unlabeled => {
                log_warn!("Inference failed, storing capture without a label: {err}");
                (None, None)
            }
            Err(err) => return Err(err.into()),
        };

        let persist_start = Instant::now();
        let entry = NewHistoryEntry {
            image_jpeg: analysis.image_jpeg,
            label,
            confidence,
            captured_at,
        };
        let entry = self
            .history
            .append(entry)
            .await
            .map_err(CaptureError::Persistence)?;

        log_debug!(
            "Capture {} timings: transform {}ms, inference {}ms, persist {}ms",
            entry.id,
            analysis.transform_ms,
            analysis.inference_ms,
            persist_start.elapsed().as_millis()
        );

        let preview = CapturePreview::from(&entry);
        Ok(CaptureOutcome { entry, preview })
    }
}

fn analyze(
    frame: &RawFrame,
    crop: &CropRegion,
    settings: &PipelineSettings,
    classifier: &dyn ImageClassifier,
) -> Result<Analysis, CaptureError> {
    let transform_start = Instant::now();
    let output = transform_frame(frame, crop, settings.target, settings.resize_mode)?;
    let image_jpeg = encode_jpeg(&output.resized, settings.jpeg_quality)?;
    let transform_ms = transform_start.elapsed().as_millis();

    let inference_start = Instant::now();
    let classification = classifier.classify(&output.input);
    let inference_ms = inference_start.elapsed().as_millis();

    Ok(Analysis {
        image_jpeg,
        classification,
        transform_ms,
        inference_ms,
    })
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
        encoder.encode_image(image)?;
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FakeImageClassifier;
    use crate::db::Database;
    use crate::frame::{FrameOrientation, PixelFormat};

    struct BrokenClassifier;

    impl ImageClassifier for BrokenClassifier {
        fn classify(
            &self,
            _input: &crate::transform::ClassifierInput,
        ) -> Result<ClassificationResult, InferenceError> {
            Err(InferenceError::Prediction("model unavailable".into()))
        }
    }

    fn frame() -> RawFrame {
        let data = [40u8, 80, 120, 255].repeat(640 * 480);
        RawFrame::new(640, 480, PixelFormat::Bgra8, FrameOrientation::Up, data).unwrap()
    }

    fn pipeline(
        dir: &tempfile::TempDir,
        classifier: Arc<dyn ImageClassifier>,
        keep_unlabeled: bool,
    ) -> CapturePipeline {
        let db = Database::new(dir.path().join("history.sqlite3")).unwrap();
        let mut config = AppConfig::default();
        config.keep_unlabeled_captures = keep_unlabeled;
        CapturePipeline::new(
            classifier,
            HistoryStore::new(db),
            PipelineSettings::from_config(&config),
        )
    }

    #[tokio::test]
    async fn stores_a_decodable_48px_jpeg_with_label() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            &dir,
            Arc::new(FakeImageClassifier::with_seed((48, 48), 3)),
            true,
        );
        let crop = CropRegion::centered(640, 480, 300).unwrap();

        let outcome = pipeline.process(frame(), crop).await.unwrap();

        assert!(outcome.entry.label.is_some());
        assert!(outcome.entry.confidence.is_some());
        let decoded = image::load_from_memory(&outcome.entry.image_jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (48, 48));
        assert_eq!(outcome.preview.entry_id, outcome.entry.id);
        assert_eq!(pipeline.history().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn inference_failure_still_stores_the_image() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&dir, Arc::new(BrokenClassifier), true);
        let crop = CropRegion::centered(640, 480, 300).unwrap();

        let outcome = pipeline.process(frame(), crop).await.unwrap();

        assert_eq!(outcome.entry.label, None);
        assert_eq!(pipeline.history().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn inference_failure_can_drop_the_capture() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&dir, Arc::new(BrokenClassifier), false);
        let crop = CropRegion::centered(640, 480, 300).unwrap();

        let err = pipeline.process(frame(), crop).await.unwrap_err();

        assert!(matches!(err, CaptureError::Inference(_)));
        assert_eq!(pipeline.history().len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn out_of_bounds_crop_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            &dir,
            Arc::new(FakeImageClassifier::with_seed((48, 48), 3)),
            true,
        );

        let err = pipeline
            .process(frame(), CropRegion::square(500, 300, 300))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CaptureError::Transform(TransformError::OutOfBounds { .. })
        ));
        assert!(pipeline.history().is_empty().await.unwrap());
    }
}
