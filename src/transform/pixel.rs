use image::RgbImage;

use super::TransformError;

/// Channel layout handed to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// 32-bit pixels ordered X, R, G, B. The leading byte carries no alpha and
    /// is written as 0xFF.
    Argb32,
}

impl InputFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            InputFormat::Argb32 => 4,
        }
    }
}

/// Pixel buffer shaped for one classifier call. Built fresh for every capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierInput {
    width: u32,
    height: u32,
    bytes_per_row: usize,
    format: InputFormat,
    data: Vec<u8>,
}

impl ClassifierInput {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn bytes_per_row(&self) -> usize {
        self.bytes_per_row
    }

    pub fn format(&self) -> InputFormat {
        self.format
    }

    /// Rows top to bottom, `bytes_per_row` apart.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// `[r, g, b]` at `(x, y)` with a top-left origin.
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.bytes_per_row + x as usize * self.format.bytes_per_pixel();
        let px = &self.data[offset..offset + 4];
        Some([px[1], px[2], px[3]])
    }
}

/// Repack an RGB image into the classifier's ARGB layout.
///
/// The first row of `image` becomes the first row of the buffer; no vertical
/// flip is needed because `RgbImage` is already top-left origin.
pub fn to_classifier_input(image: &RgbImage) -> Result<ClassifierInput, TransformError> {
    let format = InputFormat::Argb32;
    let (width, height) = image.dimensions();
    let bytes_per_row = width as usize * format.bytes_per_pixel();
    let len = bytes_per_row
        .checked_mul(height as usize)
        .ok_or_else(|| TransformError::Conversion(format!("{width}x{height} buffer overflows")))?;

    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|err| {
        TransformError::Conversion(format!("failed to allocate {len} byte pixel buffer: {err}"))
    })?;

    for px in image.pixels() {
        let [r, g, b] = px.0;
        data.extend_from_slice(&[0xFF, r, g, b]);
    }

    Ok(ClassifierInput {
        width,
        height,
        bytes_per_row,
        format,
        data,
    })
}
