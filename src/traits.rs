use crate::device::Device;
use crate::errors::Result;
use ndarray::prelude::*;

/// Segmentation network producing per-pixel class scores.
///
/// `forward` takes a `[1, 3, H, W]` float32 tensor and returns unnormalized
/// `[1, classes, H, W]` logits. Implementations must not keep any training-time
/// state: no dropout, no running statistics updates, no gradient bookkeeping.
pub trait SegmentationModel: Send + Sync {
    /// Switch the model to inference mode before a forward pass.
    fn enter_inference_mode(&self) {}

    /// Run a forward pass on `device`.
    fn forward(&self, input: ArrayView4<f32>, device: Device) -> Result<Array4<f32>>;
}

/// Binary classifier answering "is there a silo in this tile".
pub trait ClassificationModel: Send + Sync {
    /// Probability that a silo is present, for a raw `[1, H, W, 3]` batch in 0..=255.
    fn predict_probability(&self, batch: ArrayView4<f32>) -> Result<f32>;
}
