use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use lensless_core::analysis::pixel_angle::{collect_angle_files, sample_pixel, write_pixel_csv};

#[derive(Args)]
pub struct PixelAngleArgs {
    /// Folder holding angle_<deg>_*.npy (or image) captures
    pub folder: PathBuf,

    /// Pixel to sample; defaults to the frame centre
    #[arg(long, num_args = 2, value_names = ["X", "Y"])]
    pub xy: Option<Vec<usize>>,

    /// Output CSV path
    #[arg(long, default_value = "pixel_vs_angle.csv")]
    pub outfile: PathBuf,
}

pub fn run(args: &PixelAngleArgs) -> Result<()> {
    let files = collect_angle_files(&args.folder)
        .with_context(|| format!("No captures in {}", args.folder.display()))?;
    let xy = args.xy.as_deref().map(|v| (v[0], v[1]));

    let sweep = sample_pixel(&files, xy)?;
    for sample in &sweep.samples {
        let values: Vec<String> = sample.channels.iter().map(|v| v.to_string()).collect();
        println!("{:+6.1}  {}", sample.angle_deg, values.join("  "));
    }

    write_pixel_csv(&sweep, &args.outfile)
        .with_context(|| format!("Failed to write {}", args.outfile.display()))?;
    println!(
        "Pixel ({}, {}) over {} frames saved to {}",
        sweep.x,
        sweep.y,
        sweep.samples.len(),
        args.outfile.display()
    );
    Ok(())
}
