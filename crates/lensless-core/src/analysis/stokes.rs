//! Polarization mapping: wave-plate angles to normalized Stokes parameters.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::LazyLock;

use ndarray::{Array2, ArrayView1};
use regex::Regex;
use tracing::debug;

use crate::error::{LenslessError, Result};

static EXP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"exp\s*=\s*([0-9.]+)").unwrap());

const ANGLE_COLUMN: &str = "angle_deg";
const INTENSITY_COLUMN: &str = "ch1";

/// Normalized Stokes vectors `[S1/S0, S2/S0, S3/S0]` for half-wave plate
/// angles `alpha` and quarter-wave plate angles `beta`, both in radians.
///
/// Both plates are assumed to have a vertical fast axis. Returns `(n, 3)`.
pub fn stokes_from_alphabeta(alpha: ArrayView1<f64>, beta: ArrayView1<f64>) -> Result<Array2<f64>> {
    if alpha.len() != beta.len() {
        return Err(LenslessError::InvalidArgument(format!(
            "alpha has {} angles but beta has {}",
            alpha.len(),
            beta.len()
        )));
    }

    let mut out = Array2::zeros((alpha.len(), 3));
    for (i, (&a, &b)) in alpha.iter().zip(beta.iter()).enumerate() {
        out[[i, 0]] = 0.5 * ((4.0 * a - 4.0 * b).cos() + (4.0 * a).cos());
        out[[i, 1]] = 0.5 * ((4.0 * a).sin() - (4.0 * a - 4.0 * b).sin());
        out[[i, 2]] = -(4.0 * a - 2.0 * b).sin();
    }
    Ok(out)
}

/// One `(S3, intensity)` point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct S3Point {
    pub s3: f64,
    pub intensity: f64,
}

/// A pixel-vs-angle table mapped onto S3.
#[derive(Clone, Debug)]
pub struct S3Curve {
    /// Exposure from an `exp=<value>` header token, if any.
    pub exposure: Option<String>,
    /// Sorted by ascending S3.
    pub points: Vec<S3Point>,
}

/// Read an `angle_deg,...,ch1,...` CSV and map each row onto S3.
///
/// The angle is taken as the quarter-wave plate angle with the half-wave
/// plate held at zero.
pub fn s3_curve_from_csv(path: &Path) -> Result<S3Curve> {
    let text = fs::read_to_string(path)?;
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| LenslessError::EmptyInput(path.to_path_buf()))?;

    let exposure = EXP_RE.captures(header).map(|c| c[1].to_string());
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let column = |name: &str| {
        columns.iter().position(|c| *c == name).ok_or_else(|| {
            LenslessError::InvalidArgument(format!("{}: missing column '{name}'", path.display()))
        })
    };
    let angle_col = column(ANGLE_COLUMN)?;
    let value_col = column(INTENSITY_COLUMN)?;

    let mut angles = Vec::new();
    let mut intensities = Vec::new();
    for (lineno, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let field = |col: usize| -> Result<f64> {
            fields
                .get(col)
                .and_then(|f| f.parse().ok())
                .ok_or_else(|| {
                    LenslessError::InvalidArgument(format!(
                        "{}: bad value in row {}",
                        path.display(),
                        lineno + 2
                    ))
                })
        };
        angles.push(field(angle_col)?.to_radians());
        intensities.push(field(value_col)?);
    }
    if angles.is_empty() {
        return Err(LenslessError::EmptyInput(path.to_path_buf()));
    }
    debug!(rows = angles.len(), ?exposure, "read pixel table");

    let beta = ndarray::Array1::from(angles);
    let alpha = ndarray::Array1::zeros(beta.len());
    let stokes = stokes_from_alphabeta(alpha.view(), beta.view())?;

    let mut points: Vec<S3Point> = stokes
        .column(2)
        .iter()
        .zip(intensities)
        .map(|(&s3, intensity)| S3Point { s3, intensity })
        .collect();
    points.sort_by(|a, b| a.s3.total_cmp(&b.s3));

    Ok(S3Curve { exposure, points })
}

/// Write `s3,intensity` rows.
pub fn write_s3_csv(curve: &S3Curve, path: &Path) -> Result<()> {
    let mut w = BufWriter::new(fs::File::create(path)?);
    writeln!(w, "s3,intensity")?;
    for p in &curve.points {
        writeln!(w, "{:.6},{}", p.s3, p.intensity)?;
    }
    w.flush()?;
    Ok(())
}
