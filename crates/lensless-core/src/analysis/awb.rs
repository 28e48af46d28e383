//! Auto white balance and display corrections for colour PSF frames.

use ndarray::{Array3, ArrayView3, Axis, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::frame::rgb_to_gray;
use crate::consts::{
    COLOR_CHANNEL_COUNT, DEFAULT_AWB_GAIN_CLIP, DEFAULT_AWB_MASK_PERCENTILES,
    DEFAULT_AWB_PERCENTILE, DEFAULT_AWB_TARGET_RATIO, EPSILON,
};
use crate::error::{LenslessError, Result};

/// Parameters of the percentile-based white balance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwbParams {
    /// Luminance percentiles bounding the pixels used for statistics (exclusive).
    pub mask_percentiles: (f64, f64),
    /// Per-channel statistic percentile.
    pub percentile: f64,
    /// Gains are clipped to this range.
    pub gain_clip: (f64, f64),
    /// Desired red/green ratio after correction.
    pub target_ratio: f64,
}

impl Default for AwbParams {
    fn default() -> Self {
        Self {
            mask_percentiles: DEFAULT_AWB_MASK_PERCENTILES,
            percentile: DEFAULT_AWB_PERCENTILE,
            gain_clip: DEFAULT_AWB_GAIN_CLIP,
            target_ratio: DEFAULT_AWB_TARGET_RATIO,
        }
    }
}

/// Red and blue gains relative to green.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AwbGains {
    pub red: f64,
    pub blue: f64,
}

impl Default for AwbGains {
    fn default() -> Self {
        Self { red: 1.0, blue: 1.0 }
    }
}

/// Percentile `q` (0..=100) of `values` with linear interpolation between
/// closest ranks. NaN values are ignored; `None` when nothing is left.
pub fn percentile(values: &[f32], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values
        .iter()
        .filter(|v| !v.is_nan())
        .map(|&v| v as f64)
        .collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let pos = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Estimate red/blue gains from an `(H, W, 3)` frame.
///
/// Only pixels whose luminance lies strictly between the mask percentiles
/// contribute. The per-channel statistic is a high percentile, which stays
/// robust on sparse PSF frames where the median is mostly background.
pub fn compute_awb_gains(rgb: ArrayView3<f32>, params: &AwbParams) -> Result<AwbGains> {
    if rgb.dim().2 != COLOR_CHANNEL_COUNT {
        return Err(LenslessError::unexpected_shape(rgb.shape(), "(H, W, 3)"));
    }
    let lum = rgb_to_gray(rgb)?;
    let lum_values: Vec<f32> = lum.iter().copied().collect();
    let empty = || LenslessError::InvalidArgument("no pixels left for white balance".into());

    let lo = percentile(&lum_values, params.mask_percentiles.0).ok_or_else(empty)?;
    let hi = percentile(&lum_values, params.mask_percentiles.1).ok_or_else(empty)?;
    let mask: Vec<bool> = lum
        .iter()
        .map(|&v| (v as f64) > lo && (v as f64) < hi)
        .collect();

    let stat = |channel: usize| -> Result<f64> {
        let plane = rgb.index_axis(Axis(2), channel);
        let masked: Vec<f32> = plane
            .iter()
            .zip(&mask)
            .filter(|(_, &keep)| keep)
            .map(|(&v, _)| v)
            .collect();
        percentile(&masked, params.percentile).ok_or_else(empty)
    };
    let (r, g, b) = (stat(0)?, stat(1)?, stat(2)?);

    let (min, max) = params.gain_clip;
    let gains = AwbGains {
        red: (params.target_ratio * g / (r + EPSILON)).clamp(min, max),
        blue: (g / (b + EPSILON)).clamp(min, max),
    };
    debug!(r, g, b, red_gain = gains.red, blue_gain = gains.blue, "white balance");
    Ok(gains)
}

/// Scale red and blue planes, clamping to `[0, max_value]`.
pub fn apply_gains(rgb: ArrayView3<f32>, gains: AwbGains, max_value: f32) -> Result<Array3<f32>> {
    if rgb.dim().2 != COLOR_CHANNEL_COUNT {
        return Err(LenslessError::unexpected_shape(rgb.shape(), "(H, W, 3)"));
    }
    let mut out = rgb.to_owned();
    for (channel, gain) in [(0, gains.red as f32), (2, gains.blue as f32)] {
        out.index_axis_mut(Axis(2), channel)
            .mapv_inplace(|v| (v * gain).clamp(0.0, max_value));
    }
    Ok(out)
}

/// Apply gamma correction: output = input^(1/gamma), input clamped to `[0, 1]`.
pub fn gamma_correct(data: &mut Array3<f32>, gamma: f32) {
    let inv_gamma = 1.0 / gamma;
    data.mapv_inplace(|v| v.clamp(0.0, 1.0).powf(inv_gamma));
}

/// Subtract a background frame, clamping at zero.
pub fn subtract_background(data: &mut Array3<f32>, background: ArrayView3<f32>) -> Result<()> {
    if data.dim() != background.dim() {
        return Err(LenslessError::InvalidArgument(format!(
            "background shape {:?} does not match frame shape {:?}",
            background.shape(),
            data.shape()
        )));
    }
    Zip::from(data)
        .and(&background)
        .for_each(|v, &bg| *v = (*v - bg).max(0.0));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_percentile_interpolates() {
        let v = [1.0f32, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(percentile(&v, 50.0).unwrap(), 2.5);
        assert_abs_diff_eq!(percentile(&v, 0.0).unwrap(), 1.0);
        assert_abs_diff_eq!(percentile(&v, 100.0).unwrap(), 4.0);
        assert_abs_diff_eq!(percentile(&v, 80.0).unwrap(), 3.4, epsilon = 1e-12);
        assert!(percentile(&[], 50.0).is_none());
    }

    #[test]
    fn test_gains_balance_weak_red() {
        // Gradient frame with red at a quarter of green, blue equal to green.
        let rgb = Array3::from_shape_fn((10, 10, 3), |(r, c, ch)| {
            let g = (r * 10 + c + 1) as f32;
            match ch {
                0 => g / 4.0,
                _ => g,
            }
        });
        let gains = compute_awb_gains(rgb.view(), &AwbParams::default()).unwrap();
        assert_abs_diff_eq!(gains.red, 3.6, epsilon = 1e-3);
        assert_abs_diff_eq!(gains.blue, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_gains_are_clipped() {
        let rgb = Array3::from_shape_fn((8, 8, 3), |(r, c, ch)| {
            let g = (r * 8 + c + 1) as f32;
            if ch == 1 { g } else { g / 100.0 }
        });
        let gains = compute_awb_gains(rgb.view(), &AwbParams::default()).unwrap();
        assert_eq!(gains.red, 4.0);
        assert_eq!(gains.blue, 4.0);
    }

    #[test]
    fn test_apply_gains_clamps() {
        let rgb = Array3::<f32>::from_elem((2, 2, 3), 200.0);
        let out = apply_gains(rgb.view(), AwbGains { red: 2.0, blue: 0.5 }, 255.0).unwrap();
        assert_eq!(out[[0, 0, 0]], 255.0);
        assert_eq!(out[[0, 0, 1]], 200.0);
        assert_eq!(out[[0, 0, 2]], 100.0);
    }

    #[test]
    fn test_gamma_brightens_midtones() {
        let mut data = Array3::<f32>::from_elem((1, 1, 1), 0.25);
        gamma_correct(&mut data, 2.0);
        assert_abs_diff_eq!(data[[0, 0, 0]], 0.5, epsilon = 1e-6);
    }
}
