use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::decode::{Mask, NUM_CLASSES, SILO_CLASS};
use crate::device::Device;
use crate::errors::{Result, SiloError};
use crate::traits::{ClassificationModel, SegmentationModel};
use ndarray::prelude::*;

/// テスト用のモックセグメンテーションモデル
///
/// Returns logits whose arg-max reproduces a fixed mask, whatever the input.
#[derive(Debug)]
pub struct MockSegmentationModel {
    mask: Mask,
    classes: usize,
    inference_mode: AtomicBool,
    forward_calls: AtomicUsize,
}

impl MockSegmentationModel {
    pub fn from_mask(mask: Mask) -> Self {
        Self {
            mask,
            classes: NUM_CLASSES,
            inference_mode: AtomicBool::new(false),
            forward_calls: AtomicUsize::new(0),
        }
    }

    /// No silo anywhere.
    pub fn empty(height: usize, width: usize) -> Self {
        Self::from_mask(Mask::zeros((height, width)))
    }

    /// Exactly `covered` silo pixels, filled in row-major order.
    pub fn with_covered_pixels(height: usize, width: usize, covered: usize) -> Self {
        Self::from_mask(Mask::from_shape_fn((height, width), |(y, x)| {
            u8::from(y * width + x < covered) * SILO_CLASS
        }))
    }

    pub fn checkerboard(height: usize, width: usize) -> Self {
        Self::from_mask(Mask::from_shape_fn((height, width), |(y, x)| {
            ((y + x) % 2) as u8
        }))
    }

    /// Emits `classes` output channels, used to exercise shape validation.
    pub fn with_classes(height: usize, width: usize, classes: usize) -> Self {
        Self {
            classes,
            ..Self::empty(height, width)
        }
    }

    pub fn inference_mode_entered(&self) -> bool {
        self.inference_mode.load(Ordering::SeqCst)
    }

    pub fn forward_calls(&self) -> usize {
        self.forward_calls.load(Ordering::SeqCst)
    }
}

impl SegmentationModel for MockSegmentationModel {
    fn enter_inference_mode(&self) {
        self.inference_mode.store(true, Ordering::SeqCst);
    }

    fn forward(&self, input: ArrayView4<f32>, _device: Device) -> Result<Array4<f32>> {
        self.forward_calls.fetch_add(1, Ordering::SeqCst);

        let (height, width) = self.mask.dim();
        let (_, _, in_height, in_width) = input.dim();
        if (in_height, in_width) != (height, width) {
            return Err(SiloError::shape_mismatch(
                "mock segmentation input",
                format!("[1, 3, {height}, {width}]"),
                input.shape(),
            ));
        }

        // テスト用の簡易実装：マスクの位置でクラス1のロジットを高くする
        Ok(Array4::from_shape_fn(
            (1, self.classes, height, width),
            |(_, class, y, x)| {
                let target = usize::from(self.mask[[y, x]]);
                if class == target {
                    2.0
                } else {
                    -2.0
                }
            },
        ))
    }
}

/// テスト用のモック分類モデル
#[derive(Debug, Clone)]
pub struct MockClassificationModel {
    pub probability: f32,
}

impl MockClassificationModel {
    pub const fn new(probability: f32) -> Self {
        Self { probability }
    }
}

impl ClassificationModel for MockClassificationModel {
    fn predict_probability(&self, batch: ArrayView4<f32>) -> Result<f32> {
        if batch.shape()[0] != 1 || batch.shape()[3] != 3 {
            return Err(SiloError::shape_mismatch(
                "mock classification input",
                "[1, H, W, 3]",
                batch.shape(),
            ));
        }
        Ok(self.probability)
    }
}
