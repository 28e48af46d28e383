use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use lensless_core::analysis::inspect;
use lensless_core::array::format_shape;
use lensless_core::io::read_array;

#[derive(Args)]
pub struct InspectArgs {
    /// Input array (.npy) or image file
    pub file: PathBuf,
}

pub fn run(args: &InspectArgs) -> Result<()> {
    let array = read_array(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    let stats = inspect(&array)?;

    println!("File:     {}", args.file.display());
    println!("Shape:    {}", format_shape(&stats.shape));
    println!("Dtype:    {}", stats.dtype);
    println!("Min:      {}", stats.min);
    println!("Max:      {}", stats.max);
    println!("Mean:     {:.4}", stats.mean);
    println!("Argmax:   {}", format_shape(&stats.argmax));

    Ok(())
}
