use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::frame::{FrameGeometry, RawFrame};
use crate::transform::CropRegion;

use super::loop_worker::capture_loop;
use super::pipeline::{CapturePipeline, CapturePreview};
use super::trigger::{CaptureTrigger, TriggerState};

/// What happened to a frame handed to [`CaptureController::deliver_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FrameDelivery {
    /// A capture is pending; the frame was queued for it.
    Queued,
    /// Nothing pending; the frame only feeds the live preview.
    Ignored,
    /// The queue was full; dropped like any late video frame.
    DroppedLate,
    /// The capture loop has shut down.
    Closed,
}

/// Owns the capture loop for one camera session.
pub struct CaptureController {
    trigger: Arc<CaptureTrigger>,
    crop: CropRegion,
    geometry: FrameGeometry,
    frame_tx: Mutex<Option<mpsc::Sender<RawFrame>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    cancel_token: CancellationToken,
    preview_rx: watch::Receiver<Option<CapturePreview>>,
}

impl CaptureController {
    /// Compute the session's crop region and spawn the capture loop.
    ///
    /// Fails if the configured crop side does not fit the upright frame.
    pub async fn start(
        pipeline: CapturePipeline,
        geometry: FrameGeometry,
        crop_side: u32,
        queue_depth: usize,
    ) -> Result<Self> {
        let (upright_w, upright_h) = geometry.upright_size();
        let crop = CropRegion::centered(upright_w, upright_h, crop_side)
            .context("capture region does not fit the camera frame")?;

        let initial_preview = pipeline
            .history()
            .latest()
            .await
            .context("failed to load latest capture for preview")?
            .map(|entry| CapturePreview::from(&entry));

        let trigger = Arc::new(CaptureTrigger::new());
        let cancel_token = CancellationToken::new();
        let (frame_tx, frame_rx) = mpsc::channel(queue_depth.max(1));
        let (preview_tx, preview_rx) = watch::channel(initial_preview);

        let handle = tokio::spawn(capture_loop(
            Arc::new(pipeline),
            crop,
            frame_rx,
            preview_tx,
            cancel_token.clone(),
        ));

        info!(
            "Capture session started: {}x{} {:?}, crop {}px at ({}, {})",
            geometry.width,
            geometry.height,
            geometry.orientation,
            crop.side(),
            crop.x(),
            crop.y()
        );

        Ok(Self {
            trigger,
            crop,
            geometry,
            frame_tx: Mutex::new(Some(frame_tx)),
            handle: Mutex::new(Some(handle)),
            cancel_token,
            preview_rx,
        })
    }

    pub fn crop_region(&self) -> CropRegion {
        self.crop
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Shutter press. Returns `false` if a capture is already pending.
    pub fn trigger_capture(&self) -> bool {
        // Serialized with `deliver_frame`, which may hand the latch back.
        let _queue = lock(&self.frame_tx);
        let armed = self.trigger.arm();
        if armed {
            debug!("Capture armed for next frame");
        } else {
            debug!("Capture already pending, shutter ignored");
        }
        armed
    }

    pub fn trigger_state(&self) -> TriggerState {
        self.trigger.state()
    }

    /// Called from the camera's frame callback. Never blocks.
    ///
    /// The latch is taken here, so the frame queued for a shutter press is
    /// always the first one delivered after it. A frame that cannot be queued
    /// hands the latch back for the next one.
    pub fn deliver_frame(&self, frame: RawFrame) -> FrameDelivery {
        let guard = lock(&self.frame_tx);
        let Some(sender) = guard.as_ref() else {
            return FrameDelivery::Closed;
        };

        if !self.trigger.consume() {
            return FrameDelivery::Ignored;
        }

        match sender.try_send(frame) {
            Ok(()) => FrameDelivery::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.trigger.arm();
                debug!("Frame queue full, capture stays armed");
                FrameDelivery::DroppedLate
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.trigger.arm();
                FrameDelivery::Closed
            }
        }
    }

    pub fn subscribe_previews(&self) -> watch::Receiver<Option<CapturePreview>> {
        self.preview_rx.clone()
    }

    pub fn latest_preview(&self) -> Option<CapturePreview> {
        self.preview_rx.borrow().clone()
    }

    /// Stop accepting frames, finish the ones already queued, then exit.
    pub async fn drain(&self) -> Result<()> {
        lock(&self.frame_tx).take();
        self.join().await
    }

    /// Stop after the capture in progress, dropping queued frames.
    pub async fn stop(&self) -> Result<()> {
        self.cancel_token.cancel();
        lock(&self.frame_tx).take();
        self.join().await
    }

    async fn join(&self) -> Result<()> {
        let handle = lock(&self.handle).take();
        if let Some(handle) = handle {
            handle.await.context("capture loop task failed to join")?;
        }
        Ok(())
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
