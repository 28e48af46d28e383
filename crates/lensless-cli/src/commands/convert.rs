use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use lensless_core::convert::{run_batch, ConversionKind};

use crate::report::{print_report, print_summary};

#[derive(Args)]
pub struct BatchArgs {
    /// Input .npy files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Write `<stem><suffix>.npy` next to each input instead of overwriting it
    #[arg(short, long, default_value = "")]
    pub suffix: String,
}

pub fn run(kind: ConversionKind, args: &BatchArgs) -> Result<()> {
    let summary = run_batch(kind, &args.files, &args.suffix, print_report)
        .with_context(|| format!("{kind} conversion aborted"))?;
    print_summary(&summary);
    Ok(())
}
