//! Per-angle pixel extraction for wave-plate sweeps.
//!
//! Sweep captures are named `angle_<deg>_<timestamp>.<ext>`. Every frame in a
//! folder is sampled at one pixel and the values are tabulated by angle.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use ndarray::Array3;
use regex::Regex;
use tracing::{debug, info};

use crate::analysis::frame::to_hwc_f32;
use crate::error::{LenslessError, Result};
use crate::io::{image_io, npy, ArrayFormat};

static ANGLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)angle_([+-]?\d+)").unwrap());

/// Parse the sweep angle in degrees from a file stem.
pub fn extract_angle(path: &Path) -> Option<f64> {
    let stem = path.file_stem()?.to_str()?;
    ANGLE_RE.captures(stem)?[1].parse().ok()
}

/// Collect angle-tagged captures in `folder`, sorted by angle then name.
///
/// When any `.npy` captures exist only those are used; otherwise image files.
pub fn collect_angle_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut npy_files = Vec::new();
    let mut image_files = Vec::new();

    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if !path.is_file() || extract_angle(&path).is_none() {
            continue;
        }
        match ArrayFormat::from_path(&path) {
            Some(ArrayFormat::Npy) => npy_files.push(path),
            Some(ArrayFormat::Image) => image_files.push(path),
            None => debug!(path = %path.display(), "skipping unsupported capture"),
        }
    }

    let mut files = if npy_files.is_empty() {
        info!(count = image_files.len(), "using image captures");
        image_files
    } else {
        info!(count = npy_files.len(), "using .npy captures");
        npy_files
    };
    if files.is_empty() {
        return Err(LenslessError::EmptyInput(folder.to_path_buf()));
    }
    files.sort_by(|a, b| {
        let (ka, kb) = (extract_angle(a), extract_angle(b));
        ka.partial_cmp(&kb)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.cmp(b))
    });
    Ok(files)
}

/// Load a capture as `(H, W, C)` f32.
///
/// `.npy` arrays are squeezed and keep their raw values. Images are divided
/// by their own maximum.
pub fn read_frame(path: &Path) -> Result<Array3<f32>> {
    match ArrayFormat::from_path(path) {
        Some(ArrayFormat::Npy) => to_hwc_f32(&npy::read_npy(path)?),
        Some(ArrayFormat::Image) => {
            let mut frame = to_hwc_f32(&image_io::load_image_array(path)?)?;
            let max = frame.iter().copied().fold(0.0f32, f32::max);
            if max > 0.0 {
                frame.mapv_inplace(|v| v / max);
            }
            Ok(frame)
        }
        None => Err(LenslessError::InvalidArgument(format!(
            "unsupported file type: {}",
            path.display()
        ))),
    }
}

/// One sampled frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelSample {
    pub angle_deg: f64,
    pub channels: Vec<f32>,
}

/// All samples of one pixel across a sweep.
#[derive(Clone, Debug)]
pub struct PixelSweep {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    pub samples: Vec<PixelSample>,
}

/// Sample pixel `(x, y)` (default: frame centre) from every file.
pub fn sample_pixel(files: &[PathBuf], xy: Option<(usize, usize)>) -> Result<PixelSweep> {
    let first = files
        .first()
        .ok_or_else(|| LenslessError::InvalidArgument("no capture files given".into()))?;
    let sample = read_frame(first)?;
    let (height, width, _) = sample.dim();
    let (x, y) = xy.unwrap_or((width / 2, height / 2));
    if x >= width || y >= height {
        return Err(LenslessError::InvalidArgument(format!(
            "Pixel ({x},{y}) outside image bounds ({width}x{height})"
        )));
    }
    info!(x, y, width, height, "sampling pixel");

    let mut samples = Vec::with_capacity(files.len());
    for path in files {
        let angle_deg = extract_angle(path).ok_or_else(|| {
            LenslessError::InvalidArgument(format!("no angle in file name {}", path.display()))
        })?;
        let frame = if path == first { sample.clone() } else { read_frame(path)? };
        let (h, w, _) = frame.dim();
        if x >= w || y >= h {
            return Err(LenslessError::InvalidArgument(format!(
                "Pixel ({x},{y}) outside bounds of {} ({w}x{h})",
                path.display()
            )));
        }
        let channels = frame.slice(ndarray::s![y, x, ..]).to_vec();
        samples.push(PixelSample {
            angle_deg,
            channels,
        });
    }

    Ok(PixelSweep {
        x,
        y,
        width,
        height,
        samples,
    })
}

/// Write `angle_deg,ch0,ch1,...` rows.
pub fn write_pixel_csv(sweep: &PixelSweep, path: &Path) -> Result<()> {
    let channels = sweep.samples.first().map_or(0, |s| s.channels.len());
    let mut w = BufWriter::new(fs::File::create(path)?);

    let header: Vec<String> = std::iter::once("angle_deg".to_string())
        .chain((0..channels).map(|i| format!("ch{i}")))
        .collect();
    writeln!(w, "{}", header.join(","))?;

    for s in &sweep.samples {
        let row: Vec<String> = std::iter::once(format!("{:.1}", s.angle_deg))
            .chain(s.channels.iter().map(|v| v.to_string()))
            .collect();
        writeln!(w, "{}", row.join(","))?;
    }
    w.flush()?;
    Ok(())
}
