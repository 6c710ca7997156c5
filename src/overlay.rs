use image::RgbImage;
use ndarray::prelude::*;

use crate::errors::{Result, SiloError};
use crate::normalize::CHANNELS;

/// Blend a mask onto a `[H, W, 3]` image in `[0, 1]` to show the covered area.
///
/// The mask is broadcast over the three channels and added to the image. A pixel
/// where any channel ends up above 1 is set to black, so covered pixels are
/// blacked out rather than saturated. Everything else keeps its original value.
pub fn composite(image: ArrayView3<f32>, mask: ArrayView2<u8>) -> Result<Array3<f32>> {
    let (height, width, channels) = image.dim();
    if channels != CHANNELS {
        return Err(SiloError::shape_mismatch(
            "overlay image",
            "[H, W, 3]",
            image.shape(),
        ));
    }
    if mask.dim() != (height, width) {
        return Err(SiloError::shape_mismatch(
            "overlay mask",
            format!("[{height}, {width}]"),
            mask.shape(),
        ));
    }

    // [H, W] -> [H, W, 3]
    let mask = mask.mapv(f32::from).insert_axis(Axis(2));
    let mut covered = &image + &mask;

    for mut pixel in covered.lanes_mut(Axis(2)) {
        if pixel.iter().any(|&v| v > 1.0) {
            pixel.fill(0.0);
        }
    }

    Ok(covered)
}

/// Render a `[H, W, 3]` float image as 8-bit RGB.
///
/// Values are shifted so the minimum becomes 0, divided by the resulting maximum
/// when it is non-zero, then scaled to 0..=255.
pub fn to_rgb_image(image: ArrayView3<f32>) -> Result<RgbImage> {
    let (height, width, channels) = image.dim();
    if channels != CHANNELS {
        return Err(SiloError::shape_mismatch(
            "rendered image",
            "[H, W, 3]",
            image.shape(),
        ));
    }

    let min = image.fold(f32::INFINITY, |acc, &v| acc.min(v));
    let shifted = image.mapv(|v| v - min);
    let max = shifted.fold(0.0_f32, |acc, &v| acc.max(v));
    let scale = if max > 0.0 { 255.0 / max } else { 255.0 };

    let raw = shifted
        .as_standard_layout()
        .iter()
        .map(|&v| (v * scale).round().clamp(0.0, 255.0) as u8)
        .collect();

    RgbImage::from_raw(width as u32, height as u32, raw).ok_or_else(|| {
        SiloError::shape_mismatch("rendered image buffer", "[H, W, 3]", image.shape())
    })
}
