use std::path::Path;

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3};

use crate::array::ImageArray;
use crate::error::{LenslessError, Result};

/// Load a preview image (PNG/JPEG/TIFF) as an `(H,W,C)` array.
///
/// 8-bit sources stay `u8`, anything deeper is widened to `u16`.
/// Grayscale images get a trailing channel axis of 1.
pub fn load_image_array(path: &Path) -> Result<ImageArray> {
    let img = image::open(path)?;
    let (w, h) = (img.width() as usize, img.height() as usize);

    let array = match img {
        DynamicImage::ImageLuma8(gray) => {
            ImageArray::U8(to_hwc(gray.into_raw(), h, w, 1)?.into_dyn())
        }
        DynamicImage::ImageRgb8(rgb) => ImageArray::U8(to_hwc(rgb.into_raw(), h, w, 3)?.into_dyn()),
        DynamicImage::ImageLuma16(gray) => {
            ImageArray::U16(to_hwc(gray.into_raw(), h, w, 1)?.into_dyn())
        }
        DynamicImage::ImageRgb16(rgb) => {
            ImageArray::U16(to_hwc(rgb.into_raw(), h, w, 3)?.into_dyn())
        }
        other => {
            let color = other.color();
            let deep = color.bytes_per_pixel() > color.channel_count();
            match (color.has_color(), deep) {
                (true, true) => {
                    ImageArray::U16(to_hwc(other.to_rgb16().into_raw(), h, w, 3)?.into_dyn())
                }
                (true, false) => {
                    ImageArray::U8(to_hwc(other.to_rgb8().into_raw(), h, w, 3)?.into_dyn())
                }
                (false, true) => {
                    ImageArray::U16(to_hwc(other.to_luma16().into_raw(), h, w, 1)?.into_dyn())
                }
                (false, false) => {
                    ImageArray::U8(to_hwc(other.to_luma8().into_raw(), h, w, 1)?.into_dyn())
                }
            }
        }
    };
    Ok(array)
}

fn to_hwc<T>(raw: Vec<T>, h: usize, w: usize, c: usize) -> Result<Array3<T>> {
    Array3::from_shape_vec((h, w, c), raw)
        .map_err(|e| LenslessError::InvalidArgument(format!("image buffer mismatch: {e}")))
}

/// Save a single plane as 8-bit grayscale PNG. Values are clamped to [0, 1].
pub fn save_gray_png(data: ArrayView2<f32>, path: &Path) -> Result<()> {
    let (h, w) = data.dim();
    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), &v) in data.indexed_iter() {
        let val = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        img.put_pixel(col as u32, row as u32, Luma([val]));
    }
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save an `(H,W,3)` array as 8-bit RGB PNG. Values are clamped to [0, 1].
pub fn save_rgb_png(data: ArrayView3<f32>, path: &Path) -> Result<()> {
    let (h, w, c) = data.dim();
    if c != 3 {
        return Err(LenslessError::unexpected_shape(data.shape(), "(H, W, 3)"));
    }
    let mut img = image::RgbImage::new(w as u32, h as u32);
    for row in 0..h {
        for col in 0..w {
            let px = |ch: usize| (data[[row, col, ch]].clamp(0.0, 1.0) * 255.0).round() as u8;
            img.put_pixel(col as u32, row as u32, Rgb([px(0), px(1), px(2)]));
        }
    }
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Scale a plane into [0, 1] by its maximum; all-zero planes stay zero.
pub fn normalize_unit(data: ArrayView2<f32>) -> Array2<f32> {
    let max = data.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        data.mapv(|v| v / max)
    } else {
        data.to_owned()
    }
}
