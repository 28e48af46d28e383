//! File-level conversions: read → normalize → write, one file at a time.

pub mod report;

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::array::{format_shape, ImageArray};
use crate::error::{LenslessError, Result};
use crate::io::npy::{read_npy, write_npy};
use crate::normalize::{
    normalize_dims_generic, normalize_range, normalize_shape_data, normalize_shape_psf,
    squeeze_depth, RangeNormalized, RangeNote, Shaped,
};

pub use report::{BatchSummary, FileReport, Tag};

/// Which conversion a batch applies to its files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionKind {
    /// dtype/range only: any supported dtype → `u16`.
    Uint16,
    /// PSF for ADMM: `(1, H, W, 1)` `u16`.
    Psf,
    /// Measurement for ADMM: `(H, W, 1)` `u16`.
    Data,
    /// Exploratory `(H, W, 3)` → `(1, H, W, 1)` converter.
    Generic,
    /// Drop a leading depth axis of length 1.
    SqueezeDepth,
}

impl ConversionKind {
    /// Whether `err` must abort the whole invocation rather than skip the file.
    pub fn is_fatal(self, err: &LenslessError) -> bool {
        matches!(
            (self, err),
            (ConversionKind::Psf, LenslessError::UnexpectedShape { .. })
        )
    }
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionKind::Uint16 => write!(f, "uint16"),
            ConversionKind::Psf => write!(f, "psf"),
            ConversionKind::Data => write!(f, "data"),
            ConversionKind::Generic => write!(f, "1hw1"),
            ConversionKind::SqueezeDepth => write!(f, "squeeze"),
        }
    }
}

/// `path` itself when `suffix` is empty, else `<stem><suffix>.<ext>` next to it.
pub fn output_path(path: &Path, suffix: &str) -> PathBuf {
    if suffix.is_empty() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{stem}{suffix}");
    if let Some(ext) = path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    path.with_file_name(name)
}

/// Convert a single file. Recoverable conditions that leave the file alone
/// come back as `Skip` reports; everything else is an `Err`.
pub fn convert_file(kind: ConversionKind, path: &Path, suffix: &str) -> Result<FileReport> {
    if !path.is_file() {
        return Err(LenslessError::FileNotFound(path.to_path_buf()));
    }
    let array = read_npy(path)?;
    let out = output_path(path, suffix);
    debug!(
        kind = %kind,
        input = %path.display(),
        shape = %format_shape(array.shape()),
        dtype = %array.dtype(),
        "converting"
    );

    match kind {
        ConversionKind::Uint16 => {
            let normalized = normalize_range(array)?;
            if normalized.note == RangeNote::AlreadyCanonical {
                return Ok(FileReport::skip(path, "already uint16"));
            }
            write_normalized(&out, normalized)
        }
        ConversionKind::Psf => {
            let shaped = normalize_shape_psf(array)?;
            finish_shaped(path, &out, shaped, "(1, H, W, 1)")
        }
        ConversionKind::Data => {
            let shaped = normalize_shape_data(array)?;
            finish_shaped(path, &out, shaped, "(H, W, 1)")
        }
        ConversionKind::Generic => match normalize_dims_generic(array) {
            Ok(normalized) => write_normalized(&out, normalized),
            Err(LenslessError::UnexpectedShape { shape, .. }) => Ok(FileReport::skip(
                path,
                format!("expected (H, W, 3), got {}", format_shape(&shape)),
            )),
            Err(e) => Err(e),
        },
        ConversionKind::SqueezeDepth => match squeeze_depth(array) {
            Ok(normalized) => write_normalized(&out, normalized),
            Err(LenslessError::UnexpectedShape { shape, .. }) => Ok(FileReport::skip(
                path,
                format!(
                    "depth axis length is {} (expected 1)",
                    shape.first().map_or_else(|| "none".to_string(), |d| d.to_string())
                ),
            )),
            Err(e) => Err(e),
        },
    }
}

/// Range-normalize a shape-normalized array and write it, unless both axes
/// were already canonical.
fn finish_shaped(path: &Path, out: &Path, shaped: Shaped, canonical: &str) -> Result<FileReport> {
    let unchanged = shaped.is_unchanged();
    let normalized = normalize_range(shaped.into_inner())?;
    if unchanged && normalized.note == RangeNote::AlreadyCanonical {
        return Ok(FileReport::skip(path, format!("already {canonical}")));
    }
    write_normalized(out, normalized)
}

fn write_normalized(out: &Path, normalized: RangeNormalized) -> Result<FileReport> {
    let RangeNormalized { array, note } = normalized;
    let shape = format_shape(array.shape());
    write_npy(out, &ImageArray::U16(array))?;
    debug!(output = %out.display(), %shape, "wrote uint16 array");

    Ok(match note {
        RangeNote::AllZero => FileReport::warn(
            out,
            format!("max value is zero; wrote zeros, shape {shape}, dtype uint16"),
        ),
        _ => FileReport::ok(out, format!("shape {shape}, dtype uint16")),
    })
}

/// Run one conversion over `paths` in order.
///
/// Recoverable failures are reported as `[err]` and the batch continues.
/// A fatal failure (PSF shape) is returned immediately.
pub fn run_batch(
    kind: ConversionKind,
    paths: &[PathBuf],
    suffix: &str,
    mut on_report: impl FnMut(&FileReport),
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    for path in paths {
        let report = convert_one(kind, path, suffix)?;
        summary.record(report.tag);
        on_report(&report);
    }
    Ok(summary)
}

/// Prepare a PSF and a measurement for ADMM, PSF first.
pub fn prepare_for_admm(
    psf: &Path,
    data: &Path,
    suffix: &str,
    mut on_report: impl FnMut(&FileReport),
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    for (kind, path) in [(ConversionKind::Psf, psf), (ConversionKind::Data, data)] {
        let report = convert_one(kind, path, suffix)?;
        summary.record(report.tag);
        on_report(&report);
    }
    Ok(summary)
}

fn convert_one(kind: ConversionKind, path: &Path, suffix: &str) -> Result<FileReport> {
    match convert_file(kind, path, suffix) {
        Ok(report) => Ok(report),
        Err(e) if kind.is_fatal(&e) => {
            error!(kind = %kind, input = %path.display(), "fatal: {e}");
            Err(e)
        }
        Err(e) => Ok(FileReport::err(path, e.to_string())),
    }
}
