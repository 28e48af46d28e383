use ndarray::ArrayD;
use num_traits::{Float, NumCast};
use tracing::{debug, warn};

use crate::array::ImageArray;
use crate::consts::U16_FULL_SCALE;
use crate::error::{LenslessError, Result};

/// Which branch of the range normalization produced the output.
#[derive(Clone, Debug, PartialEq)]
pub enum RangeNote {
    /// Input was already `u16` and is returned untouched.
    AlreadyCanonical,
    /// Input maximum was zero; output is all zeros.
    AllZero,
    /// Input was rescaled so that `max` maps to 65535.
    Rescaled { max: f64 },
}

/// A canonical `u16` array together with how it was obtained.
#[derive(Clone, Debug)]
pub struct RangeNormalized {
    pub array: ArrayD<u16>,
    pub note: RangeNote,
}

/// Convert any supported array to `u16` spanning `[0, 65535]`.
///
/// `u16` input passes through bit-for-bit. Integer inputs are widened to
/// `f32` before scaling; `f64` input is scaled in `f64`. The output is
/// `round(clip(x / max * 65535, 0, 65535))`.
pub fn normalize_range(array: ImageArray) -> Result<RangeNormalized> {
    let source = array.dtype();
    let (array, note) = match array {
        ImageArray::U16(a) => {
            debug!("range: already uint16");
            return Ok(RangeNormalized {
                array: a,
                note: RangeNote::AlreadyCanonical,
            });
        }
        ImageArray::Bool(_) => {
            return Err(LenslessError::UnsupportedDtype(source.name().to_string()));
        }
        ImageArray::F64(a) => rescale(&a),
        ImageArray::F32(a) => rescale(&a),
        other => rescale(&other.to_f32()),
    };

    match &note {
        RangeNote::AllZero => warn!(dtype = %source, "max value is zero; leaving array zeros"),
        RangeNote::Rescaled { max } => debug!(dtype = %source, max, "range: rescaled to uint16"),
        RangeNote::AlreadyCanonical => {}
    }
    Ok(RangeNormalized { array, note })
}

fn rescale<T: Float>(a: &ArrayD<T>) -> (ArrayD<u16>, RangeNote) {
    // NaN never wins a comparison, so it is skipped by the fold.
    let max = a
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc: Option<T>, v| match acc {
            Some(m) if m >= v => Some(m),
            _ => Some(v),
        });

    let max = match max {
        Some(m) if m != T::zero() => m,
        _ => return (ArrayD::zeros(a.raw_dim()), RangeNote::AllZero),
    };

    let full = <T as NumCast>::from(U16_FULL_SCALE).unwrap_or_else(T::max_value);
    let scaled = a.mapv(|v| {
        // Float::max drops NaN, so NaN elements clamp to 0.
        let x = (v / max * full).max(T::zero()).min(full).round();
        <u16 as NumCast>::from(x).unwrap_or(0)
    });
    let max = max.to_f64().unwrap_or(f64::NAN);
    (scaled, RangeNote::Rescaled { max })
}
