//! Decoding of segmentation logits into a per-pixel class mask.

use log::debug;
use ndarray::prelude::*;

use crate::device::Device;
use crate::errors::{Result, SiloError};
use crate::normalize::CHANNELS;
use crate::traits::SegmentationModel;

/// Classes produced by the segmentation model: background and silo.
pub const NUM_CLASSES: usize = 2;

/// Class id of silo-covered pixels in a decoded mask.
pub const SILO_CLASS: u8 = 1;

/// `[H, W]` class ids, 0 for background and 1 for silo.
pub type Mask = Array2<u8>;

/// Softmax over the class axis (axis 1) of a `[N, C, H, W]` tensor.
pub fn softmax(logits: ArrayView4<f32>) -> Array4<f32> {
    let mut probs = logits.to_owned();
    for mut lane in probs.lanes_mut(Axis(1)) {
        let max = lane.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
        lane.mapv_inplace(|v| (v - max).exp());
        let sum = lane.sum();
        lane.mapv_inplace(|v| v / sum);
    }
    probs
}

/// Index of the largest class score per pixel, `[N, C, H, W]` -> `[N, H, W]`.
///
/// Ties resolve to the lowest class index.
pub fn argmax(scores: ArrayView4<f32>) -> Array3<usize> {
    scores.map_axis(Axis(1), |lane| {
        lane.iter()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |(best, best_v), (i, &v)| {
                if v > best_v {
                    (i, v)
                } else {
                    (best, best_v)
                }
            })
            .0
    })
}

/// Run `model` on a normalized `[1, 3, H, W]` tensor and decode its output into a mask.
///
/// The forward pass happens in inference mode on `device`. The logits go through a
/// softmax and an arg-max over the class axis, and the batch axis is dropped.
///
/// # Errors
///
/// [`SiloError::ShapeMismatch`] if the input is not `[1, 3, H, W]` or the model
/// output is not `[1, 2, H, W]`. Model failures are propagated as-is.
pub fn decode_mask<M>(model: &M, input: ArrayView4<f32>, device: Device) -> Result<Mask>
where
    M: SegmentationModel + ?Sized,
{
    let (batch, channels, height, width) = input.dim();
    if batch != 1 || channels != CHANNELS {
        return Err(SiloError::shape_mismatch(
            "segmentation input",
            "[1, 3, H, W]",
            input.shape(),
        ));
    }

    model.enter_inference_mode();
    let logits = model.forward(input, device)?;
    if logits.shape() != &[1, NUM_CLASSES, height, width][..] {
        return Err(SiloError::shape_mismatch(
            "segmentation output",
            format!("[1, {NUM_CLASSES}, {height}, {width}]"),
            logits.shape(),
        ));
    }
    debug!("decoding {height}x{width} logits on {device}");

    let probs = softmax(logits.view());
    let classes = argmax(probs.view()).index_axis_move(Axis(0), 0);

    Ok(classes.mapv(|class| class as u8))
}
