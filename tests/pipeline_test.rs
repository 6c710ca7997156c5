use ndarray::prelude::*;

use silo_mapper::{
    area::calculate_area,
    decode::{decode_mask, SILO_CLASS},
    mocks::MockSegmentationModel,
    normalize::normalize,
    overlay::composite,
    final_pred, Device, SegmentationModel, SiloError, SizeCategory,
};

// 統合テスト用のモックモデル：入力の赤チャンネルが明るい画素をサイロとみなす
struct ThresholdModel;

impl SegmentationModel for ThresholdModel {
    fn forward(
        &self,
        input: ArrayView4<f32>,
        _device: Device,
    ) -> silo_mapper::Result<Array4<f32>> {
        let (_, _, height, width) = input.dim();
        Ok(Array4::from_shape_fn((1, 2, height, width), |(_, class, y, x)| {
            let red = input[[0, 0, y, x]];
            if class == 1 {
                red - 0.5
            } else {
                0.5 - red
            }
        }))
    }
}

fn aerial_tile(edge: usize, bright: impl Fn(usize, usize) -> bool) -> Array3<f32> {
    Array3::from_shape_fn((edge, edge, 3), |(y, x, c)| {
        if bright(y, x) {
            0.9
        } else {
            0.1 + 0.05 * c as f32
        }
    })
}

#[test]
fn test_no_silo_detected() -> silo_mapper::Result<()> {
    let image = aerial_tile(256, |_, _| false);
    let model = MockSegmentationModel::empty(256, 256);

    let prediction = final_pred(image.view(), &model, Device::Cpu)?;

    assert_eq!(prediction.area, 0.0);
    assert_eq!(prediction.category, SizeCategory::Small);
    assert_eq!(prediction.category.to_string(), "small");
    assert_eq!(prediction.overlay, image);
    Ok(())
}

#[test]
fn test_area_buckets_end_to_end() -> silo_mapper::Result<()> {
    let image = aerial_tile(256, |y, x| (y + x) % 7 == 0);
    let cases = [
        (319, 79.75, SizeCategory::Small),
        (320, 80.0, SizeCategory::Medium),
        (628, 157.0, SizeCategory::Medium),
        (629, 157.25, SizeCategory::Big),
        (1490, 372.5, SizeCategory::Huge),
    ];

    for (covered, area, category) in cases {
        let model = MockSegmentationModel::with_covered_pixels(256, 256, covered);
        let prediction = final_pred(image.view(), &model, Device::Cpu)?;

        assert_eq!(prediction.area, area, "{covered} pixels");
        assert_eq!(prediction.category, category, "{covered} pixels");
    }
    Ok(())
}

#[test]
fn test_overlay_blacks_out_detected_region() -> silo_mapper::Result<()> {
    let silo = |y: usize, x: usize| (40..60).contains(&y) && (100..130).contains(&x);
    let image = aerial_tile(256, silo);

    let prediction = final_pred(image.view(), &ThresholdModel, Device::Cpu)?;

    assert_eq!(prediction.area, 20.0 * 30.0 * 0.25);
    assert_eq!(prediction.category, SizeCategory::Medium);
    for ((y, x, c), &value) in prediction.overlay.indexed_iter() {
        if silo(y, x) {
            assert_eq!(value, 0.0, "pixel ({y}, {x}) should be blacked out");
        } else {
            assert_eq!(value, image[[y, x, c]], "pixel ({y}, {x}) should be untouched");
        }
    }
    Ok(())
}

#[test]
fn test_components_compose_like_final_pred() -> silo_mapper::Result<()> {
    let image = aerial_tile(64, |y, _| y < 8);

    let input = normalize(image.view())?;
    let mask = decode_mask(&ThresholdModel, input.view(), Device::Cpu)?;
    let overlay = composite(image.view(), mask.view())?;
    let area = calculate_area(mask.view(), 256);

    let prediction = final_pred(image.view(), &ThresholdModel, Device::Cpu)?;

    assert_eq!(mask.iter().filter(|&&v| v == SILO_CLASS).count(), 8 * 64);
    assert_eq!(prediction.mask, mask);
    assert_eq!(prediction.overlay, overlay);
    assert_eq!(prediction.area, area);
    Ok(())
}

#[test]
fn test_degenerate_tile_is_rejected() {
    let image = Array3::<f32>::zeros((32, 32, 3));
    let err = final_pred(image.view(), &ThresholdModel, Device::Cpu).unwrap_err();
    assert!(matches!(err, SiloError::DegenerateInput { .. }));
}
