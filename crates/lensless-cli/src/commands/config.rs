use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use lensless_core::analysis::AnalyzeConfig;
use lensless_core::hardware::SweepConfig;

#[derive(Clone, Copy, ValueEnum)]
pub enum ConfigKind {
    Sweep,
    Analyze,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Which config to print
    #[arg(value_enum, default_value_t = ConfigKind::Sweep)]
    pub kind: ConfigKind,

    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save a default config as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let toml_str = match args.kind {
        ConfigKind::Sweep => toml::to_string_pretty(&SweepConfig::default())?,
        ConfigKind::Analyze => toml::to_string_pretty(&AnalyzeConfig::default())?,
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
