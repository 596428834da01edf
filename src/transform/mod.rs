//! Frame → classifier input: crop, aspect-preserving resize, ARGB repack.

pub mod crop;
pub mod pixel;
pub mod resize;

use image::{imageops, RgbImage};
use thiserror::Error;

use crate::frame::RawFrame;

pub use crop::CropRegion;
pub use pixel::{to_classifier_input, ClassifierInput, InputFormat};
pub use resize::{fit_dimensions, ResizeMode, TargetSize};

#[derive(Debug, Error)]
pub enum TransformError {
    #[error(
        "crop {side}x{side} at ({x}, {y}) does not fit a {frame_width}x{frame_height} frame"
    )]
    OutOfBounds {
        x: u32,
        y: u32,
        side: u32,
        frame_width: u32,
        frame_height: u32,
    },
    #[error("pixel conversion failed: {0}")]
    Conversion(String),
}

/// Everything one capture needs from a frame: the resized image kept for the
/// history list and the buffer fed to the classifier.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub resized: RgbImage,
    pub input: ClassifierInput,
}

/// Cut the crop region out of the upright frame.
pub fn crop_frame(frame: &RawFrame, crop: &CropRegion) -> Result<RgbImage, TransformError> {
    let (width, height) = frame.upright_size();
    crop.ensure_within(width, height)?;

    let upright = frame.to_upright_rgb();
    Ok(imageops::crop_imm(&upright, crop.x(), crop.y(), crop.side(), crop.side()).to_image())
}

pub fn transform_frame(
    frame: &RawFrame,
    crop: &CropRegion,
    target: TargetSize,
    mode: ResizeMode,
) -> Result<TransformOutput, TransformError> {
    let cropped = crop_frame(frame, crop)?;
    let resized = resize::resize(&cropped, target, mode);
    let input = to_classifier_input(&resized)?;
    Ok(TransformOutput { resized, input })
}

/// Crop, resize and convert in one call, discarding the intermediate image.
pub fn transform(
    frame: &RawFrame,
    crop: &CropRegion,
    target: TargetSize,
    mode: ResizeMode,
) -> Result<ClassifierInput, TransformError> {
    transform_frame(frame, crop, target, mode).map(|output| output.input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FrameOrientation, PixelFormat};

    fn solid_frame(width: u32, height: u32, bgra: [u8; 4]) -> RawFrame {
        let data = bgra.repeat((width * height) as usize);
        RawFrame::new(width, height, PixelFormat::Bgra8, FrameOrientation::Up, data).unwrap()
    }

    #[test]
    fn square_crop_on_square_frame_yields_exact_target() {
        let frame = solid_frame(1000, 1000, [0, 0, 255, 255]);
        let crop = CropRegion::square(10, 10, 300);

        let input = transform(&frame, &crop, TargetSize::new(48, 48), ResizeMode::Fit).unwrap();

        assert_eq!(input.dimensions(), (48, 48));
        assert_eq!(input.rgb_at(0, 0), Some([255, 0, 0]));
        assert_eq!(input.rgb_at(47, 47), Some([255, 0, 0]));
    }

    #[test]
    fn non_square_target_shrinks_to_the_tighter_axis() {
        let frame = solid_frame(640, 480, [0, 0, 0, 255]);
        let crop = CropRegion::centered(640, 480, 300).unwrap();

        let input = transform(&frame, &crop, TargetSize::new(64, 32), ResizeMode::Fit).unwrap();

        assert_eq!(input.dimensions(), (32, 32));
    }

    #[test]
    fn crop_outside_frame_fails_without_touching_pixels() {
        let frame = solid_frame(320, 240, [1, 2, 3, 255]);
        let crop = CropRegion::square(100, 100, 200);

        let err = transform(&frame, &crop, TargetSize::new(48, 48), ResizeMode::Fit).unwrap_err();
        assert!(matches!(
            err,
            TransformError::OutOfBounds {
                frame_width: 320,
                frame_height: 240,
                ..
            }
        ));
    }

    #[test]
    fn crop_is_checked_against_the_rotated_frame() {
        // 400x200 sensor frame rotated to portrait is 200 wide.
        let data = vec![0u8; 400 * 200 * 4];
        let frame =
            RawFrame::new(400, 200, PixelFormat::Bgra8, FrameOrientation::Right, data).unwrap();

        assert!(crop_frame(&frame, &CropRegion::square(0, 150, 200)).is_ok());
        assert!(crop_frame(&frame, &CropRegion::square(150, 0, 200)).is_err());
    }

    #[test]
    fn crop_picks_the_requested_pixels() {
        let mut data = [0u8, 0, 0, 255].repeat(100);
        // Pixel (3, 4) on a 10x10 frame is pure green.
        let offset = (4 * 10 + 3) * 4;
        data[offset..offset + 4].copy_from_slice(&[0, 255, 0, 255]);
        let frame = RawFrame::new(10, 10, PixelFormat::Bgra8, FrameOrientation::Up, data).unwrap();

        let cropped = crop_frame(&frame, &CropRegion::square(3, 4, 2)).unwrap();

        assert_eq!(cropped.dimensions(), (2, 2));
        assert_eq!(cropped.get_pixel(0, 0).0, [0, 255, 0]);
        assert_eq!(cropped.get_pixel(1, 1).0, [0, 0, 0]);
    }
}
