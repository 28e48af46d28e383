use ndarray::Dimension;

use crate::array::{Dtype, ImageArray};
use crate::error::{LenslessError, Result};

/// Summary statistics of a loaded array.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayStats {
    pub shape: Vec<usize>,
    pub dtype: Dtype,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// N-d index of the first maximum, in row-major order.
    pub argmax: Vec<usize>,
}

/// Compute min/max/mean and the location of the maximum. NaN elements are ignored.
pub fn inspect(array: &ImageArray) -> Result<ArrayStats> {
    let values = array.to_f64();

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    let mut count = 0usize;
    let mut argmax = None;

    for (idx, &v) in values.indexed_iter() {
        if v.is_nan() {
            continue;
        }
        if v > max {
            max = v;
            argmax = Some(idx.slice().to_vec());
        }
        min = min.min(v);
        sum += v;
        count += 1;
    }

    let argmax = argmax.ok_or_else(|| {
        LenslessError::InvalidArgument("array has no finite elements to inspect".into())
    })?;

    Ok(ArrayStats {
        shape: array.shape().to_vec(),
        dtype: array.dtype(),
        min,
        max,
        mean: sum / count as f64,
        argmax,
    })
}
