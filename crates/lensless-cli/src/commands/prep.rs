use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use lensless_core::convert::prepare_for_admm;

use crate::report::print_report;

#[derive(Args)]
pub struct PrepArgs {
    /// PSF capture (.npy), written as (1, H, W, 1) uint16
    pub psf: PathBuf,

    /// Measurement capture (.npy), written as (H, W, 1) uint16
    pub data: PathBuf,

    /// Write `<stem><suffix>.npy` next to each input instead of overwriting it
    #[arg(short, long, default_value = "")]
    pub suffix: String,
}

pub fn run(args: &PrepArgs) -> Result<()> {
    prepare_for_admm(&args.psf, &args.data, &args.suffix, print_report)
        .with_context(|| format!("cannot prepare PSF {}", args.psf.display()))?;
    Ok(())
}
