pub mod image_io;
pub mod npy;

use std::path::Path;

use crate::array::ImageArray;
use crate::error::{LenslessError, Result};

/// Capture file formats the toolkit can read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrayFormat {
    Npy,
    Image,
}

impl ArrayFormat {
    /// Classify a path by extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<ArrayFormat> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "npy" => Some(ArrayFormat::Npy),
            "png" | "jpg" | "jpeg" | "tif" | "tiff" => Some(ArrayFormat::Image),
            _ => None,
        }
    }
}

/// Read any supported capture file into an [`ImageArray`].
pub fn read_array(path: &Path) -> Result<ImageArray> {
    if !path.is_file() {
        return Err(LenslessError::FileNotFound(path.to_path_buf()));
    }
    match ArrayFormat::from_path(path) {
        Some(ArrayFormat::Npy) => npy::read_npy(path),
        Some(ArrayFormat::Image) => image_io::load_image_array(path),
        None => Err(LenslessError::InvalidArgument(format!(
            "unsupported file type: {}",
            path.display()
        ))),
    }
}
