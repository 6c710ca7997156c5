use std::path::Path;

use image::{imageops, imageops::FilterType, RgbImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;

use crate::errors::{Result, SiloError};

/// An aerial tile resized to the model resolution, `[H, W, 3]` with values in 0..=255.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pixels: Array3<f32>,
}

impl Tile {
    pub fn open(path: &Path, resolution: u32) -> Result<Self> {
        let image = image::open(path)
            .map_err(|e| SiloError::ImageProcessing {
                path: path.display().to_string(),
                operation: "image decode".to_string(),
                source: Box::new(e),
            })?
            .into_rgb8();
        Ok(Self::from_rgb(&image, resolution))
    }

    /// Resize to `resolution` x `resolution` with a bicubic filter.
    pub fn from_rgb(image: &RgbImage, resolution: u32) -> Self {
        let resized = if image.dimensions() == (resolution, resolution) {
            image.clone()
        } else {
            imageops::resize(image, resolution, resolution, FilterType::CatmullRom)
        };

        // [C, H, W] -> [H, W, C]
        let pixels = resized
            .as_ndarray3()
            .permuted_axes([1, 2, 0])
            .mapv(f32::from);
        Self { pixels }
    }

    pub fn resolution(&self) -> u32 {
        self.pixels.dim().0 as u32
    }

    /// Raw `[H, W, 3]` samples in 0..=255.
    pub fn raw(&self) -> ArrayView3<f32> {
        self.pixels.view()
    }

    /// `[H, W, 3]` in `[0, 1]`, the layout the segmentation pipeline expects.
    pub fn scaled(&self) -> Array3<f32> {
        &self.pixels / 255.0
    }

    /// Raw samples with a leading batch axis, `[1, H, W, 3]`, for the classifier.
    pub fn batch(&self) -> ArrayView4<f32> {
        self.pixels.view().insert_axis(Axis(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use image::Rgb;
    use tempfile::TempDir;

    #[test]
    fn test_from_rgb_keeps_channel_last_layout() {
        let mut image = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        image.put_pixel(3, 1, Rgb([10, 20, 255]));

        let tile = Tile::from_rgb(&image, 4);

        assert_eq!(tile.raw().dim(), (4, 4, 3));
        assert_eq!(tile.raw().slice(s![1, 3, ..]), array![10.0f32, 20.0, 255.0]);
        assert_eq!(tile.scaled()[[1, 3, 2]], 1.0);
        assert_eq!(tile.batch().shape(), &[1, 4, 4, 3]);
    }

    #[test]
    fn test_resizes_to_resolution() {
        let image = RgbImage::from_pixel(40, 25, Rgb([90, 120, 30]));
        let tile = Tile::from_rgb(&image, 16);

        assert_eq!(tile.resolution(), 16);
        assert_eq!(tile.raw().dim(), (16, 16, 3));
    }

    #[test]
    fn test_open_from_disk() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("tile.png");
        RgbImage::from_fn(32, 32, |x, y| Rgb([x as u8 * 8, y as u8 * 8, 0])).save(&path)?;

        let tile = Tile::open(&path, 8)?;
        assert_eq!(tile.raw().dim(), (8, 8, 3));
        Ok(())
    }

    #[test]
    fn test_open_rejects_non_image() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("tile.png");
        std::fs::write(&path, b"not an image")?;

        let err = Tile::open(&path, 8).unwrap_err();
        assert!(matches!(err, SiloError::ImageProcessing { .. }));
        Ok(())
    }
}
