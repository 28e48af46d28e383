//! Shape and dtype normalization for captures headed to ADMM reconstruction.
//!
//! Two independent axes are handled here:
//! - dtype/range: any supported element type → `u16` spanning `[0, 65535]`
//! - shape/channel: PSF → `(1, H, W, 1)`, measurement → `(H, W, 1)`
//!
//! Both axes are idempotent on input that is already canonical.

pub mod range;
pub mod shape;

pub use range::{normalize_range, RangeNormalized, RangeNote};
pub use shape::{
    normalize_dims_generic, normalize_shape_data, normalize_shape_psf, squeeze_depth, Shaped,
};
