use std::path::PathBuf;

use thiserror::Error;

use crate::hardware::DeviceError;

#[derive(Error, Debug)]
pub enum LenslessError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{} not found", .0.display())]
    FileNotFound(PathBuf),

    #[error("unsupported dtype {0}")]
    UnsupportedDtype(String),

    #[error("unexpected shape {shape:?} (expected {expected})")]
    UnexpectedShape {
        shape: Vec<usize>,
        expected: &'static str,
    },

    #[error("Invalid NPY file: {0}")]
    InvalidNpy(String),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No input files matched in {}", .0.display())]
    EmptyInput(PathBuf),
}

impl LenslessError {
    pub fn unexpected_shape(shape: &[usize], expected: &'static str) -> Self {
        LenslessError::UnexpectedShape {
            shape: shape.to_vec(),
            expected,
        }
    }
}

pub type Result<T> = std::result::Result<T, LenslessError>;
