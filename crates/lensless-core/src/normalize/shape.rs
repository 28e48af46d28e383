use ndarray::{ArrayD, Axis, Slice};
use tracing::debug;

use crate::array::{map_array, ImageArray};
use crate::consts::GREEN_CHANNEL;
use crate::error::{LenslessError, Result};
use crate::normalize::range::{normalize_range, RangeNormalized};

const PSF_SHAPES: &str = "(H, W, 3), (H, W, 1) or (1, H, W, 1)";
const DATA_SHAPES: &str = "(H, W, 3), (H, W, 1), (1, H, W, 3) or (1, H, W, 1)";
const GENERIC_SHAPES: &str = "(H, W, 3)";
const DEPTH_SHAPES: &str = "leading depth axis of length 1";

/// Result of a shape normalization: either the input untouched or a new array.
#[derive(Clone, Debug)]
pub enum Shaped {
    Unchanged(ImageArray),
    Converted(ImageArray),
}

impl Shaped {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Shaped::Unchanged(_))
    }

    pub fn array(&self) -> &ImageArray {
        match self {
            Shaped::Unchanged(a) | Shaped::Converted(a) => a,
        }
    }

    pub fn into_inner(self) -> ImageArray {
        match self {
            Shaped::Unchanged(a) | Shaped::Converted(a) => a,
        }
    }
}

/// Keep only the green plane of the trailing channel axis (`(..., 3)` → `(..., 1)`).
pub fn select_green<T: Clone>(a: ArrayD<T>) -> ArrayD<T> {
    let last = Axis(a.ndim() - 1);
    a.slice_axis(last, Slice::from(GREEN_CHANNEL..GREEN_CHANNEL + 1))
        .to_owned()
}

/// Add the leading depth axis of length 1.
pub fn prepend_depth<T>(a: ArrayD<T>) -> ArrayD<T> {
    a.insert_axis(Axis(0))
}

/// Remove a leading axis of length 1.
pub fn drop_depth<T: Clone>(a: ArrayD<T>) -> ArrayD<T> {
    a.index_axis_move(Axis(0), 0)
}

/// Bring a PSF capture to `(1, H, W, 1)`.
///
/// Any shape other than `(H, W, 3)`, `(H, W, 1)` or `(1, H, W, 1)` is an
/// [`LenslessError::UnexpectedShape`], which callers treat as fatal.
pub fn normalize_shape_psf(array: ImageArray) -> Result<Shaped> {
    let shape = array.shape().to_vec();
    match shape.as_slice() {
        [1, _, _, 1] => {
            debug!(?shape, "psf: already (1, H, W, 1)");
            Ok(Shaped::Unchanged(array))
        }
        [_, _, 3] => Ok(Shaped::Converted(
            map_array!(array, a => prepend_depth(select_green(a))),
        )),
        [_, _, 1] => Ok(Shaped::Converted(map_array!(array, a => prepend_depth(a)))),
        _ => Err(LenslessError::unexpected_shape(&shape, PSF_SHAPES)),
    }
}

/// Bring a measurement capture to `(H, W, 1)`.
pub fn normalize_shape_data(array: ImageArray) -> Result<Shaped> {
    let shape = array.shape().to_vec();
    if let [_, _, 1] = shape.as_slice() {
        debug!(?shape, "data: already (H, W, 1)");
        return Ok(Shaped::Unchanged(array));
    }

    let array = match shape.as_slice() {
        [1, _, _, _] => map_array!(array, a => drop_depth(a)),
        _ => array,
    };
    let array = if array.shape().len() == 3 && array.shape()[2] == 3 {
        map_array!(array, a => select_green(a))
    } else {
        array
    };

    if array.shape().len() == 3 && array.shape()[2] == 1 {
        Ok(Shaped::Converted(array))
    } else {
        Err(LenslessError::unexpected_shape(&shape, DATA_SHAPES))
    }
}

/// Exploratory converter: `(H, W, 3)` → `(1, H, W, 1)` `u16`.
///
/// The green plane is used as-is rather than a luminance mix, since
/// reconstruction code downstream expects green.
pub fn normalize_dims_generic(array: ImageArray) -> Result<RangeNormalized> {
    let shape = array.shape().to_vec();
    match shape.as_slice() {
        [_, _, 3] => normalize_range(map_array!(array, a => prepend_depth(select_green(a)))),
        _ => Err(LenslessError::unexpected_shape(&shape, GENERIC_SHAPES)),
    }
}

/// Drop a leading depth axis of length 1 and bring the result to `u16`.
pub fn squeeze_depth(array: ImageArray) -> Result<RangeNormalized> {
    if array.shape().first() == Some(&1) {
        normalize_range(map_array!(array, a => drop_depth(a)))
    } else {
        Err(LenslessError::unexpected_shape(array.shape(), DEPTH_SHAPES))
    }
}
