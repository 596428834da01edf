use serde::{Deserialize, Serialize};

use super::TransformError;

/// Square capture region in upright frame coordinates.
///
/// Only constructible as a square, so `width == height` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropRegion {
    x: u32,
    y: u32,
    side: u32,
}

impl CropRegion {
    pub fn square(x: u32, y: u32, side: u32) -> Self {
        Self { x, y, side }
    }

    /// Region of `side` pixels centered on a `width`x`height` frame.
    pub fn centered(width: u32, height: u32, side: u32) -> Result<Self, TransformError> {
        if side == 0 || side > width || side > height {
            return Err(TransformError::OutOfBounds {
                x: 0,
                y: 0,
                side,
                frame_width: width,
                frame_height: height,
            });
        }

        Ok(Self {
            x: width / 2 - side / 2,
            y: height / 2 - side / 2,
            side,
        })
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    pub fn contains_within(&self, width: u32, height: u32) -> bool {
        let fits_x = self.x.checked_add(self.side).is_some_and(|end| end <= width);
        let fits_y = self.y.checked_add(self.side).is_some_and(|end| end <= height);
        self.side > 0 && fits_x && fits_y
    }

    pub(crate) fn ensure_within(&self, width: u32, height: u32) -> Result<(), TransformError> {
        if self.contains_within(width, height) {
            Ok(())
        } else {
            Err(TransformError::OutOfBounds {
                x: self.x,
                y: self.y,
                side: self.side,
                frame_width: width,
                frame_height: height,
            })
        }
    }
}
