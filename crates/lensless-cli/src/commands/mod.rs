pub mod analyze;
pub mod config;
pub mod convert;
pub mod inspect;
pub mod pixel_angle;
pub mod prep;
pub mod stokes;
pub mod sweep;
