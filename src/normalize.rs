//! Conversion of a channel-last image array into segmentation model input.

use log::debug;
use ndarray::prelude::*;
use num_traits::AsPrimitive;

use crate::errors::{Result, SiloError};

/// Number of colour channels the segmentation model consumes.
pub const CHANNELS: usize = 3;

/// Turn a `[H, W, 3]` image into a `[1, 3, H, W]` float32 tensor scaled to `[0, 1]`.
///
/// The rescaling uses a single minimum and maximum taken over the whole image,
/// all channels together. The segmentation weights were trained against exactly
/// this scaling, so it must not be replaced with a per-channel one.
///
/// # Errors
///
/// * [`SiloError::ShapeMismatch`] if the image is empty or does not have 3 channels.
/// * [`SiloError::DegenerateInput`] if every sample has the same value.
pub fn normalize<S>(image: ArrayView3<S>) -> Result<Array4<f32>>
where
    S: AsPrimitive<f64>,
{
    let (height, width, channels) = image.dim();
    if channels != CHANNELS || image.is_empty() {
        return Err(SiloError::shape_mismatch(
            "normalizer input",
            "[H, W, 3] with H, W > 0",
            image.shape(),
        ));
    }

    // [H, W, C] -> [C, H, W]
    let chw = image.permuted_axes([2, 0, 1]);

    let (min, max) = chw
        .iter()
        .map(|v| v.as_())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    if range == 0.0 {
        return Err(SiloError::DegenerateInput { min });
    }
    debug!("normalizing {height}x{width} image, min={min}, max={max}");

    let scaled = chw.mapv(|v| (v.as_() - min) / range);

    Ok(scaled.insert_axis(Axis(0)).mapv(|v| v as f32))
}
