use ndarray::{Array2, Array3, ArrayD, ArrayView2, ArrayView3, Axis, IxDyn};

use crate::array::ImageArray;
use crate::consts::{COLOR_CHANNEL_COUNT, LUMINANCE_B, LUMINANCE_G, LUMINANCE_R};
use crate::error::{LenslessError, Result};

/// Largest bit depth a histogram is built for.
pub const MAX_HISTOGRAM_BITS: u32 = 16;

/// View any capture as `(H, W, C)` f32 with raw values.
///
/// Axes of length 1 are squeezed away and a 2-D result gets a channel axis,
/// so `(1, H, W, 1)`, `(H, W, 1)` and `(H, W)` all become `(H, W, 1)`.
pub fn to_hwc_f32(array: &ImageArray) -> Result<Array3<f32>> {
    let raw = array.to_f32();
    let squeezed: Vec<usize> = raw.shape().iter().copied().filter(|&d| d != 1).collect();
    let hwc = match squeezed.len() {
        2 => vec![squeezed[0], squeezed[1], 1],
        3 => squeezed,
        _ => {
            return Err(LenslessError::unexpected_shape(
                array.shape(),
                "(H, W), (H, W, C) or (1, H, W, C)",
            ))
        }
    };
    let values: Vec<f32> = raw.iter().copied().collect();
    let frame = ArrayD::from_shape_vec(IxDyn(&hwc), values)
        .map_err(|e| LenslessError::InvalidArgument(format!("reshape failed: {e}")))?;
    frame
        .into_dimensionality()
        .map_err(|_| LenslessError::unexpected_shape(array.shape(), "(H, W, C)"))
}

/// BT.601 luminance of an `(H, W, 3)` frame. Single-channel frames pass through.
pub fn rgb_to_gray(rgb: ArrayView3<f32>) -> Result<Array2<f32>> {
    match rgb.dim().2 {
        1 => Ok(rgb.index_axis(Axis(2), 0).to_owned()),
        COLOR_CHANNEL_COUNT => {
            let r = rgb.index_axis(Axis(2), 0);
            let g = rgb.index_axis(Axis(2), 1);
            let b = rgb.index_axis(Axis(2), 2);
            Ok(&r * LUMINANCE_R + &g * LUMINANCE_G + &b * LUMINANCE_B)
        }
        _ => Err(LenslessError::unexpected_shape(
            rgb.shape(),
            "(H, W, 3) or (H, W, 1)",
        )),
    }
}

/// Bit depth that holds `max`: `ceil(log2(max))`, at least 1.
pub fn infer_nbits(max: f32) -> u32 {
    if max <= 2.0 {
        return 1;
    }
    max.log2().ceil() as u32
}

/// Counts per integer value in `[0, 2^nbits)`. Values are rounded and clamped.
pub fn pixel_histogram<'a>(values: impl IntoIterator<Item = &'a f32>, nbits: u32) -> Result<Vec<u64>> {
    if nbits == 0 || nbits > MAX_HISTOGRAM_BITS {
        return Err(LenslessError::InvalidArgument(format!(
            "histogram bit depth must be 1..={MAX_HISTOGRAM_BITS}, got {nbits}"
        )));
    }
    let bins = 1usize << nbits;
    let top = (bins - 1) as f32;
    let mut counts = vec![0u64; bins];
    for &v in values {
        if v.is_nan() {
            continue;
        }
        counts[v.round().clamp(0.0, top) as usize] += 1;
    }
    Ok(counts)
}

/// Horizontal profile through the brightest pixel.
#[derive(Clone, Debug)]
pub struct CrossSection {
    pub row: usize,
    pub peak_col: usize,
    /// `10·log10(v / reference)`; non-positive samples are `-inf`.
    pub profile_db: Vec<f32>,
    /// Contiguous samples around the peak at or above `-db_drop`.
    pub width: usize,
}

/// Cross-section through the maximum of `img`.
///
/// Values are expressed in dB relative to `reference`, or to the image
/// maximum when `reference` is `None`.
pub fn cross_section(img: ArrayView2<f32>, db_drop: f32, reference: Option<f32>) -> Result<CrossSection> {
    let (row, peak_col, max) = img
        .indexed_iter()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, usize, f32)>, ((r, c), &v)| match best {
            Some((_, _, m)) if m >= v => best,
            _ => Some((r, c, v)),
        })
        .ok_or_else(|| LenslessError::InvalidArgument("cross-section of an empty image".into()))?;

    let reference = reference.unwrap_or(max);
    if reference <= 0.0 {
        return Err(LenslessError::InvalidArgument(
            "cross-section needs a positive maximum".into(),
        ));
    }

    let profile_db: Vec<f32> = img
        .row(row)
        .iter()
        .map(|&v| {
            if v > 0.0 {
                10.0 * (v / reference).log10()
            } else {
                f32::NEG_INFINITY
            }
        })
        .collect();

    let above = |i: usize| profile_db[i] >= -db_drop;
    let mut width = 0;
    if above(peak_col) {
        let left = (0..peak_col).rev().take_while(|&i| above(i)).count();
        let right = (peak_col + 1..profile_db.len()).take_while(|&i| above(i)).count();
        width = left + right + 1;
    }

    Ok(CrossSection {
        row,
        peak_col,
        profile_db,
        width,
    })
}
