use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerState {
    Idle,
    ArmedForNextFrame,
}

/// One-shot latch between the shutter button and the frame queue.
///
/// `arm` succeeds only from `Idle`; `consume` succeeds only from
/// `ArmedForNextFrame`. Each successful `arm` therefore admits exactly one
/// frame, however many frames race to consume it.
#[derive(Debug, Default)]
pub struct CaptureTrigger {
    armed: AtomicBool,
}

impl CaptureTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if a capture is already pending.
    pub fn arm(&self) -> bool {
        self.armed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Take the pending capture, if any.
    pub fn consume(&self) -> bool {
        self.armed
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub fn state(&self) -> TriggerState {
        if self.is_armed() {
            TriggerState::ArmedForNextFrame
        } else {
            TriggerState::Idle
        }
    }
}
