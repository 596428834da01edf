//! Camera frames as handed over by the host capture session.
//!
//! A `RawFrame` lives only for the duration of one delivery callback. The
//! transform stage borrows it and never writes to its buffer.

use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};

use crate::transform::TransformError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PixelFormat {
    /// 32-bit BGRA, the layout camera sessions deliver by default.
    Bgra8,
    Rgba8,
    Rgb8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Bgra8 | PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }

    fn rgb_at(&self, px: &[u8]) -> [u8; 3] {
        match self {
            PixelFormat::Bgra8 => [px[2], px[1], px[0]],
            PixelFormat::Rgba8 | PixelFormat::Rgb8 => [px[0], px[1], px[2]],
        }
    }
}

/// How the sensor image must be rotated to appear upright on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FrameOrientation {
    #[default]
    Up,
    /// Rotate 90° clockwise. Back cameras held in portrait deliver this.
    Right,
    Down,
    /// Rotate 90° counter-clockwise.
    Left,
}

impl FrameOrientation {
    pub fn swaps_axes(&self) -> bool {
        matches!(self, FrameOrientation::Right | FrameOrientation::Left)
    }
}

/// Dimensions and orientation of every frame a capture session produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub orientation: FrameOrientation,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32, orientation: FrameOrientation) -> Self {
        Self {
            width,
            height,
            orientation,
        }
    }

    /// Size after the orientation is applied.
    pub fn upright_size(&self) -> (u32, u32) {
        if self.orientation.swaps_axes() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

#[derive(Debug, Clone)]
pub struct RawFrame {
    width: u32,
    height: u32,
    bytes_per_row: usize,
    format: PixelFormat,
    orientation: FrameOrientation,
    data: Vec<u8>,
}

impl RawFrame {
    /// Wrap a tightly packed buffer.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        orientation: FrameOrientation,
        data: Vec<u8>,
    ) -> Result<Self, TransformError> {
        let bytes_per_row = width as usize * format.bytes_per_pixel();
        Self::with_stride(width, height, bytes_per_row, format, orientation, data)
    }

    /// Wrap a buffer whose rows may be padded past `width * bpp`.
    pub fn with_stride(
        width: u32,
        height: u32,
        bytes_per_row: usize,
        format: PixelFormat,
        orientation: FrameOrientation,
        data: Vec<u8>,
    ) -> Result<Self, TransformError> {
        if width == 0 || height == 0 {
            return Err(TransformError::Conversion(format!(
                "frame has no pixels ({width}x{height})"
            )));
        }

        let row_len = width as usize * format.bytes_per_pixel();
        if bytes_per_row < row_len {
            return Err(TransformError::Conversion(format!(
                "bytes_per_row {bytes_per_row} is shorter than a {width}px row ({row_len} bytes)"
            )));
        }

        let required = bytes_per_row * (height as usize - 1) + row_len;
        if data.len() < required {
            return Err(TransformError::Conversion(format!(
                "frame buffer holds {} bytes, {required} needed",
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            bytes_per_row,
            format,
            orientation,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn orientation(&self) -> FrameOrientation {
        self.orientation
    }

    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.width, self.height, self.orientation)
    }

    pub fn upright_size(&self) -> (u32, u32) {
        self.geometry().upright_size()
    }

    /// Decode into an upright RGB image. The frame buffer is left untouched.
    pub fn to_upright_rgb(&self) -> RgbImage {
        let bpp = self.format.bytes_per_pixel();
        let sensor = RgbImage::from_fn(self.width, self.height, |x, y| {
            let offset = y as usize * self.bytes_per_row + x as usize * bpp;
            image::Rgb(self.format.rgb_at(&self.data[offset..offset + bpp]))
        });

        match self.orientation {
            FrameOrientation::Up => sensor,
            FrameOrientation::Right => imageops::rotate90(&sensor),
            FrameOrientation::Down => imageops::rotate180(&sensor),
            FrameOrientation::Left => imageops::rotate270(&sensor),
        }
    }
}
