use anyhow::{ensure, Context, Result};
use burn::prelude::*;
use image::GrayImage;
use thiserror::Error;

/// Half of the u8 pixel range; maps [0, 255] onto [-1, 1] and back.
pub const PIXEL_SCALE: f32 = 127.5;

pub fn normalize(pixel: f32) -> f32 {
    (pixel - PIXEL_SCALE) / PIXEL_SCALE
}

pub fn denormalize(value: f32) -> f32 {
    value * PIXEL_SCALE + PIXEL_SCALE
}

#[derive(Debug, Error)]
pub enum TileError {
    #[error("cannot tile an empty batch")]
    Empty,
    #[error("image {index} is {found_w}x{found_h}, expected {expected_w}x{expected_h}")]
    ShapeMismatch {
        index: usize,
        expected_w: u32,
        expected_h: u32,
        found_w: u32,
        found_h: u32,
    },
}

/// Splits a single-channel NCHW batch into grayscale images, mapping the
/// model's [-1, 1] output range back to u8 pixels.
pub fn batch_to_images<B: Backend>(batch: Tensor<B, 4>) -> Result<Vec<GrayImage>> {
    let [count, channels, height, width] = batch.dims();
    ensure!(channels == 1, "expected single-channel images, got {channels}");

    let data = batch
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("failed to read image batch data: {e:?}"))?;

    let mut images = Vec::with_capacity(count);
    for chunk in data.chunks(height * width) {
        let pixels = chunk
            .iter()
            .map(|v| denormalize(*v).clamp(0.0, 255.0) as u8)
            .collect::<Vec<_>>();
        let image = GrayImage::from_raw(width as u32, height as u32, pixels)
            .context("pixel buffer does not match image dimensions")?;
        images.push(image);
    }
    Ok(images)
}

/// Lays a batch of equally sized images out as one grid image.
///
/// The grid is `floor(sqrt(n))` columns wide and `ceil(n / cols)` rows tall;
/// image `k` lands in cell `(k / cols, k % cols)` and trailing cells stay
/// black.
pub fn tile_images(images: &[GrayImage]) -> Result<GrayImage, TileError> {
    let first = images.first().ok_or(TileError::Empty)?;
    let (width, height) = first.dimensions();
    for (index, image) in images.iter().enumerate() {
        let (found_w, found_h) = image.dimensions();
        if (found_w, found_h) != (width, height) {
            return Err(TileError::ShapeMismatch {
                index,
                expected_w: width,
                expected_h: height,
                found_w,
                found_h,
            });
        }
    }

    let cols = (images.len() as f64).sqrt().floor() as u32;
    let rows = (images.len() as u32).div_ceil(cols);

    let mut grid = GrayImage::new(cols * width, rows * height);
    for (k, image) in images.iter().enumerate() {
        let row = k as u32 / cols;
        let col = k as u32 % cols;
        for (x, y, pixel) in image.enumerate_pixels() {
            grid.put_pixel(col * width + x, row * height + y, *pixel);
        }
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn solid(width: u32, height: u32, value: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([value]))
    }

    #[test]
    fn tile_grid_dimensions() {
        // 10 images -> 3 columns, 4 rows
        let images = vec![solid(28, 28, 7); 10];
        let grid = tile_images(&images).unwrap();
        assert_eq!(grid.dimensions(), (3 * 28, 4 * 28));
    }

    #[test]
    fn tile_places_images_row_major() {
        // 5 images -> 2 columns, 3 rows
        let images: Vec<GrayImage> = (0..5).map(|k| solid(2, 2, 10 * (k + 1))).collect();
        let grid = tile_images(&images).unwrap();
        assert_eq!(grid.dimensions(), (4, 6));

        for k in 0..5u32 {
            let (row, col) = (k / 2, k % 2);
            assert_eq!(
                grid.get_pixel(col * 2, row * 2).0[0],
                10 * (k as u8 + 1),
                "image {k} misplaced"
            );
        }
    }

    #[test]
    fn tile_leaves_unfilled_cells_black() {
        let images = vec![solid(2, 2, 255); 5];
        let grid = tile_images(&images).unwrap();
        // cell (2, 1) has no source image
        assert_eq!(grid.get_pixel(2, 4).0[0], 0);
        assert_eq!(grid.get_pixel(3, 5).0[0], 0);
    }

    #[test]
    fn tile_rejects_mixed_shapes() {
        let images = vec![solid(2, 2, 0), solid(3, 2, 0)];
        assert!(matches!(
            tile_images(&images),
            Err(TileError::ShapeMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn tile_rejects_empty_batch() {
        assert!(matches!(tile_images(&[]), Err(TileError::Empty)));
    }

    #[test]
    fn denormalize_covers_pixel_range() {
        assert_eq!(denormalize(-1.0), 0.0);
        assert_eq!(denormalize(1.0), 255.0);
    }

    #[test]
    fn normalize_round_trips() {
        for p in 0..=255 {
            let p = p as f32;
            assert!((denormalize(normalize(p)) - p).abs() < 1e-4);
        }
    }
}
