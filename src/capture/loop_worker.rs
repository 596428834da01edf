use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::{frame::RawFrame, transform::CropRegion};

use super::pipeline::{CapturePipeline, CapturePreview};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

/// Serial consumer of the frame queue. Every queued frame already holds a
/// shutter press; frames run one at a time, so at most one capture is in
/// flight.
pub async fn capture_loop(
    pipeline: Arc<CapturePipeline>,
    crop: CropRegion,
    mut frames: mpsc::Receiver<RawFrame>,
    previews: watch::Sender<Option<CapturePreview>>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("capture loop shutting down");
                break;
            }
            delivered = frames.recv() => {
                let Some(frame) = delivered else {
                    log_info!("frame queue closed, capture loop exiting");
                    break;
                };

                log_debug!("capturing {}x{} frame", frame.width(), frame.height());
                match pipeline.process(frame, crop).await {
                    Ok(outcome) => {
                        log_info!(
                            "capture {} stored as {}",
                            outcome.entry.id,
                            outcome.entry.label.as_deref().unwrap_or("<unlabeled>")
                        );
                        previews.send_replace(Some(outcome.preview));
                    }
                    Err(err) => log_error!("capture failed: {err}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::capture::pipeline::PipelineSettings;
    use crate::classifier::{ClassificationResult, ImageClassifier, InferenceError};
    use crate::config::AppConfig;
    use crate::db::Database;
    use crate::frame::{FrameOrientation, PixelFormat};
    use crate::history::HistoryStore;
    use crate::transform::ClassifierInput;

    #[derive(Default)]
    struct CountingClassifier {
        calls: AtomicUsize,
    }

    impl ImageClassifier for CountingClassifier {
        fn classify(&self, _input: &ClassifierInput) -> Result<ClassificationResult, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ClassificationResult::new("stop", Default::default()))
        }
    }

    fn frame() -> RawFrame {
        let data = vec![128u8; 400 * 400 * 4];
        RawFrame::new(400, 400, PixelFormat::Bgra8, FrameOrientation::Up, data).unwrap()
    }

    struct Harness {
        _dir: tempfile::TempDir,
        classifier: Arc<CountingClassifier>,
        history: HistoryStore,
        pipeline: Arc<CapturePipeline>,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let history = HistoryStore::new(Database::new(dir.path().join("h.sqlite3")).unwrap());
        let classifier = Arc::new(CountingClassifier::default());
        let pipeline = Arc::new(CapturePipeline::new(
            classifier.clone(),
            history.clone(),
            PipelineSettings::from_config(&AppConfig::default()),
        ));
        Harness {
            _dir: dir,
            classifier,
            history,
            pipeline,
        }
    }

    #[tokio::test]
    async fn each_queued_frame_becomes_one_capture() {
        let h = harness();
        let (frame_tx, frame_rx) = mpsc::channel(4);
        let (preview_tx, preview_rx) = watch::channel(None);

        frame_tx.send(frame()).await.unwrap();
        frame_tx.send(frame()).await.unwrap();
        drop(frame_tx);

        capture_loop(
            h.pipeline.clone(),
            CropRegion::centered(400, 400, 300).unwrap(),
            frame_rx,
            preview_tx,
            CancellationToken::new(),
        )
        .await;

        assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 2);
        let stored = h.history.load().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(
            preview_rx.borrow().as_ref().map(|p| p.entry_id.clone()),
            Some(stored[1].id.clone())
        );
    }

    #[tokio::test]
    async fn failed_capture_leaves_preview_unchanged() {
        let h = harness();
        let (frame_tx, frame_rx) = mpsc::channel(1);
        let (preview_tx, preview_rx) = watch::channel(None);

        frame_tx.send(frame()).await.unwrap();
        drop(frame_tx);

        // 350px region cannot fit at (100, 100) in a 400px frame.
        capture_loop(
            h.pipeline.clone(),
            CropRegion::square(100, 100, 350),
            frame_rx,
            preview_tx,
            CancellationToken::new(),
        )
        .await;

        assert!(h.history.is_empty().await.unwrap());
        assert!(preview_rx.borrow().is_none());
    }

    #[tokio::test]
    async fn cancelled_loop_exits_without_processing() {
        let h = harness();
        let (frame_tx, frame_rx) = mpsc::channel(1);
        let (preview_tx, preview_rx) = watch::channel(None);
        let token = CancellationToken::new();

        frame_tx.send(frame()).await.unwrap();
        token.cancel();

        capture_loop(
            h.pipeline.clone(),
            CropRegion::centered(400, 400, 300).unwrap(),
            frame_rx,
            preview_tx,
            token,
        )
        .await;

        assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 0);
        assert!(h.history.is_empty().await.unwrap());
        assert!(preview_rx.borrow().is_none());
    }
}
