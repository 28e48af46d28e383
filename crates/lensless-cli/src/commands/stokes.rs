use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use lensless_core::analysis::stokes::{s3_curve_from_csv, write_s3_csv};

#[derive(Args)]
pub struct StokesArgs {
    /// Pixel-vs-angle CSV (angle_deg, ch0, ch1, ...)
    pub csv: PathBuf,

    /// Output CSV path (default: <input>_s3.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &StokesArgs) -> Result<()> {
    let curve = s3_curve_from_csv(&args.csv)
        .with_context(|| format!("Failed to read {}", args.csv.display()))?;

    let output = args.output.clone().unwrap_or_else(|| {
        let stem = args
            .csv
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        args.csv.with_file_name(format!("{stem}_s3.csv"))
    });

    if let Some(exp) = &curve.exposure {
        println!("Exposure: {exp} s");
    }
    write_s3_csv(&curve, &output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("{} points saved to {}", curve.points.len(), output.display());
    Ok(())
}
