use image::{imageops, imageops::FilterType, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResizeMode {
    /// Uniform scale so the image fits inside the target; one axis may come
    /// out shorter. The classifier must accept that size.
    #[default]
    Fit,
    /// Same scale, then centered on a black canvas of exactly the target size.
    Letterbox,
}

/// Dimensions after scaling `(width, height)` by the smaller of the two
/// target ratios. Never exceeds `target` and never collapses an axis to 0.
pub fn fit_dimensions(width: u32, height: u32, target: TargetSize) -> (u32, u32) {
    let width_ratio = target.width as f64 / width as f64;
    let height_ratio = target.height as f64 / height as f64;
    let scale = width_ratio.min(height_ratio);

    let scaled = |len: u32, limit: u32| ((len as f64 * scale).round() as u32).clamp(1, limit);
    (scaled(width, target.width), scaled(height, target.height))
}

pub fn resize(image: &RgbImage, target: TargetSize, mode: ResizeMode) -> RgbImage {
    let (new_w, new_h) = fit_dimensions(image.width(), image.height(), target);
    let scaled = if (new_w, new_h) == image.dimensions() {
        image.clone()
    } else {
        imageops::resize(image, new_w, new_h, FilterType::Triangle)
    };

    match mode {
        ResizeMode::Fit => scaled,
        ResizeMode::Letterbox => {
            if scaled.dimensions() == (target.width, target.height) {
                return scaled;
            }
            let mut canvas = RgbImage::from_pixel(target.width, target.height, Rgb([0, 0, 0]));
            let x_offset = (target.width - new_w) / 2;
            let y_offset = (target.height - new_h) / 2;
            imageops::replace(&mut canvas, &scaled, x_offset as i64, y_offset as i64);
            canvas
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: TargetSize = TargetSize {
        width: 48,
        height: 48,
    };

    #[test]
    fn square_input_fills_target() {
        assert_eq!(fit_dimensions(300, 300, TARGET), (48, 48));
        assert_eq!(fit_dimensions(10, 10, TARGET), (48, 48));
    }

    #[test]
    fn wide_input_keeps_aspect_ratio() {
        assert_eq!(fit_dimensions(200, 100, TARGET), (48, 24));
        assert_eq!(fit_dimensions(100, 300, TARGET), (16, 48));
    }

    #[test]
    fn extreme_aspect_never_collapses_an_axis() {
        assert_eq!(fit_dimensions(5000, 2, TARGET), (48, 1));
    }

    #[test]
    fn larger_dimension_always_hits_target() {
        for (w, h) in [(301, 299), (640, 480), (17, 1000), (999, 998)] {
            let (nw, nh) = fit_dimensions(w, h, TARGET);
            assert_eq!(nw.max(nh), 48, "{w}x{h} -> {nw}x{nh}");

            // Aspect ratio holds up to half a pixel of rounding per axis.
            let scale = 48.0 / w.max(h) as f64;
            assert!((nw as f64 - w as f64 * scale).abs() <= 0.5 + 1e-9);
            assert!((nh as f64 - h as f64 * scale).abs() <= 0.5 + 1e-9);
        }
    }

    #[test]
    fn letterbox_pads_to_exact_target_and_centers() {
        let image = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
        let boxed = resize(&image, TARGET, ResizeMode::Letterbox);

        assert_eq!(boxed.dimensions(), (48, 48));
        assert_eq!(boxed.get_pixel(24, 24).0, [255, 255, 255]);
        assert_eq!(boxed.get_pixel(24, 0).0, [0, 0, 0]);
        assert_eq!(boxed.get_pixel(24, 47).0, [0, 0, 0]);
    }

    #[test]
    fn fit_leaves_short_axis_unpadded() {
        let image = RgbImage::new(200, 100);
        assert_eq!(resize(&image, TARGET, ResizeMode::Fit).dimensions(), (48, 24));
    }
}
