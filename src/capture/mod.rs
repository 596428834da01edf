pub mod controller;
pub mod loop_worker;
pub mod pipeline;
pub mod trigger;
pub mod zoom;

pub use controller::{CaptureController, FrameDelivery};
pub use pipeline::{CaptureError, CaptureOutcome, CapturePipeline, CapturePreview, PipelineSettings};
pub use trigger::{CaptureTrigger, TriggerState};
pub use zoom::{apply_pinch, next_zoom_factor, ZoomableDevice};
