//! Pinch-to-zoom for the capture device.

use anyhow::Result;

/// Damps pinch velocity before it is added to the zoom factor.
pub const PINCH_VELOCITY_DIVIDER: f64 = 5.0;

/// Camera device whose zoom can be reconfigured while capturing.
pub trait ZoomableDevice: Send + Sync {
    fn zoom_factor(&self) -> f64;
    fn max_zoom_factor(&self) -> f64;
    fn set_zoom_factor(&self, factor: f64) -> Result<()>;
}

/// Zoom after one pinch update: `atan2` keeps large velocities from jumping
/// the factor, and the result stays within `1.0..=max`.
pub fn next_zoom_factor(current: f64, pinch_velocity: f64, max: f64) -> f64 {
    let desired = current + pinch_velocity.atan2(PINCH_VELOCITY_DIVIDER);
    desired.clamp(1.0, max.max(1.0))
}

pub fn apply_pinch(device: &dyn ZoomableDevice, pinch_velocity: f64) -> Result<f64> {
    let factor = next_zoom_factor(
        device.zoom_factor(),
        pinch_velocity,
        device.max_zoom_factor(),
    );
    device.set_zoom_factor(factor)?;
    Ok(factor)
}
