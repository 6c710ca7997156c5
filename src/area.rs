use log::warn;
use ndarray::ArrayView2;

use crate::decode::SILO_CLASS;

/// Model edge length in pixels the tiles are resized to by default.
pub const DEFAULT_RESOLUTION: u32 = 256;

/// Edge length at which one pixel covers one square meter.
pub const UNIT_RESOLUTION: u32 = 128;

/// Square meters covered by one pixel of a [`DEFAULT_RESOLUTION`] tile.
pub const DEFAULT_PIXEL_AREA: f64 = 0.25;

/// Covered area in square meters for a decoded mask.
///
/// Tiles span roughly 128 m, so at 128 px a pixel is 1 m² and at 256 px it is
/// 0.25 m². Only those two resolutions are known; every value other than 128 uses
/// the 256 px factor.
pub fn calculate_area(mask: ArrayView2<u8>, resolution: u32) -> f64 {
    let covered = mask.iter().filter(|&&class| class == SILO_CLASS).count();

    if resolution == UNIT_RESOLUTION {
        covered as f64
    } else {
        if resolution != DEFAULT_RESOLUTION {
            warn!(
                "no ground-sample distance known for {resolution}px tiles, \
                 using the {DEFAULT_RESOLUTION}px factor"
            );
        }
        covered as f64 * DEFAULT_PIXEL_AREA
    }
}
