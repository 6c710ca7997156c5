//! Post-segmentation inference pipeline.
//!
//! ```text
//! image [H, W, 3] -> normalize -> decode_mask -> calculate_area -> SizeCategory
//!                                            \-> composite (with the original image)
//! ```

use log::debug;
use ndarray::prelude::*;

use crate::area::{calculate_area, DEFAULT_RESOLUTION};
use crate::category::SizeCategory;
use crate::decode::{decode_mask, Mask};
use crate::device::Device;
use crate::errors::Result;
use crate::normalize::normalize;
use crate::overlay::composite;
use crate::traits::SegmentationModel;

/// Everything the caller gets back from one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Source image with covered pixels blacked out, `[H, W, 3]`.
    pub overlay: Array3<f32>,
    /// Covered area in square meters.
    pub area: f64,
    pub category: SizeCategory,
    /// Decoded `[H, W]` class ids the other fields were derived from.
    pub mask: Mask,
}

impl Prediction {
    pub fn into_parts(self) -> (Array3<f32>, f64, SizeCategory) {
        (self.overlay, self.area, self.category)
    }
}

/// Segment `image` with `model` and derive the covered area, its size bucket and
/// an overlay.
///
/// `image` is `[H, W, 3]` with values already scaled to `[0, 1]`. The area uses the
/// 256 px ground-sample distance; see [`final_pred_at`] for other resolutions.
pub fn final_pred<M>(image: ArrayView3<f32>, model: &M, device: Device) -> Result<Prediction>
where
    M: SegmentationModel + ?Sized,
{
    final_pred_at(image, model, device, DEFAULT_RESOLUTION)
}

/// [`final_pred`] with an explicit tile resolution for the area conversion.
pub fn final_pred_at<M>(
    image: ArrayView3<f32>,
    model: &M,
    device: Device,
    resolution: u32,
) -> Result<Prediction>
where
    M: SegmentationModel + ?Sized,
{
    let input = normalize(image)?;
    let mask = decode_mask(model, input.view(), device)?;

    let area = calculate_area(mask.view(), resolution);
    let category = SizeCategory::from_area(area);
    debug!("covered area {area} m² ({category})");

    let overlay = composite(image, mask.view())?;

    Ok(Prediction {
        overlay,
        area,
        category,
        mask,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SiloError;
    use crate::mocks::MockSegmentationModel;
    use crate::Result;

    fn gradient(edge: usize) -> Array3<f32> {
        Array3::from_shape_fn((edge, edge, 3), |(y, x, c)| {
            ((y + x + c) % 200) as f32 / 255.0
        })
    }

    #[test]
    fn test_no_silo() -> Result<()> {
        let image = gradient(256);
        let model = MockSegmentationModel::empty(256, 256);

        let prediction = final_pred(image.view(), &model, Device::Cpu)?;

        assert_eq!(prediction.area, 0.0);
        assert_eq!(prediction.category, SizeCategory::Small);
        assert_eq!(prediction.overlay, image);
        Ok(())
    }

    #[test]
    fn test_medium_silo() -> Result<()> {
        let image = gradient(256);
        let model = MockSegmentationModel::with_covered_pixels(256, 256, 320);

        let (overlay, area, category) =
            final_pred(image.view(), &model, Device::Cpu)?.into_parts();

        assert_eq!(area, 80.0);
        assert_eq!(category, SizeCategory::Medium);
        assert_eq!(overlay.dim(), (256, 256, 3));
        Ok(())
    }

    #[test]
    fn test_huge_silo() -> Result<()> {
        let image = gradient(256);
        let model = MockSegmentationModel::with_covered_pixels(256, 256, 1490);

        let prediction = final_pred(image.view(), &model, Device::Cpu)?;

        assert_eq!(prediction.area, 372.5);
        assert_eq!(prediction.category, SizeCategory::Huge);
        Ok(())
    }

    #[test]
    fn test_unit_resolution() -> Result<()> {
        let image = gradient(128);
        let model = MockSegmentationModel::with_covered_pixels(128, 128, 100);

        let prediction = final_pred_at(image.view(), &model, Device::Cpu, 128)?;

        assert_eq!(prediction.area, 100.0);
        assert_eq!(prediction.category, SizeCategory::Medium);
        Ok(())
    }

    #[test]
    fn test_repeated_runs_agree() -> Result<()> {
        let image = gradient(64);
        let model = MockSegmentationModel::checkerboard(64, 64);

        let first = final_pred(image.view(), &model, Device::Cpu)?;
        let second = final_pred(image.view(), &model, Device::Cpu)?;

        assert_eq!(first.area.to_bits(), second.area.to_bits());
        assert_eq!(first.category, second.category);
        assert_eq!(model.forward_calls(), 2);
        Ok(())
    }

    #[test]
    fn test_constant_image_fails_before_inference() {
        let image = Array3::<f32>::from_elem((16, 16, 3), 0.5);
        let model = MockSegmentationModel::empty(16, 16);

        let err = final_pred(image.view(), &model, Device::Cpu).unwrap_err();

        assert!(matches!(err, SiloError::DegenerateInput { .. }));
        assert_eq!(model.forward_calls(), 0);
    }

    #[test]
    fn test_model_shape_errors_propagate() {
        let image = gradient(16);
        let model = MockSegmentationModel::with_classes(16, 16, 1);

        let err = final_pred(image.view(), &model, Device::Cpu).unwrap_err();
        assert!(matches!(err, SiloError::ShapeMismatch { .. }));
    }
}
