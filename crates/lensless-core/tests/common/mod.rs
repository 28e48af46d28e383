#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lensless_core::array::ImageArray;
use lensless_core::io::npy::write_npy;

/// Build a version 1.0 NPY file by hand, the way NumPy lays it out:
/// magic, version, little-endian header length, dict padded with spaces to a
/// multiple of 64 bytes and ending in a newline, then the raw payload.
pub fn build_npy(descr: &str, fortran_order: bool, shape: &[usize], payload: &[u8]) -> Vec<u8> {
    let shape_text = match shape {
        [single] => format!("({single},)"),
        dims => format!(
            "({})",
            dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
        ),
    };
    let order = if fortran_order { "True" } else { "False" };
    let mut dict = format!("{{'descr': '{descr}', 'fortran_order': {order}, 'shape': {shape_text}, }}");

    let unpadded = 10 + dict.len() + 1;
    let padding = (64 - unpadded % 64) % 64;
    dict.push_str(&" ".repeat(padding));
    dict.push('\n');

    let mut buf = Vec::new();
    buf.extend_from_slice(b"\x93NUMPY");
    buf.extend_from_slice(&[1, 0]);
    buf.extend_from_slice(&(dict.len() as u16).to_le_bytes());
    buf.extend_from_slice(dict.as_bytes());
    buf.extend_from_slice(payload);
    buf
}

pub fn f32_le_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn u16_le_bytes(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Write raw bytes to `dir/name` and return the path.
pub fn write_bytes(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Write `array` as `dir/name` using the crate's own encoder.
pub fn write_array(dir: &Path, name: &str, array: impl Into<ImageArray>) -> PathBuf {
    let path = dir.join(name);
    write_npy(&path, &array.into()).unwrap();
    path
}
