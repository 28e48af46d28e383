use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use lensless_core::hardware::{plan_angles, run_sweep, CommandCapture, SimulatedStage, SweepConfig};
use tracing::info;

#[derive(Args)]
pub struct SweepArgs {
    /// Sweep config file (TOML); flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Capture command, e.g. "python scripts/on_device_capture.py"
    #[arg(long)]
    pub capture_cmd: String,

    /// First angle in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub start: Option<f64>,

    /// Last angle in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub stop: Option<f64>,

    /// Angle increment in degrees
    #[arg(long)]
    pub step: Option<f64>,

    /// Directory receiving the captures
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Sensor name passed to the capture command
    #[arg(long)]
    pub sensor: Option<String>,

    /// Exposure in seconds
    #[arg(long)]
    pub exp: Option<f64>,

    /// Ask the capture command for raw Bayer data
    #[arg(long)]
    pub bayer: bool,

    /// Extra key=value arguments appended to every capture command
    #[arg(last = true)]
    pub extra: Vec<String>,
}

fn build_config(args: &SweepArgs) -> Result<SweepConfig> {
    let mut config = match &args.config {
        Some(path) => SweepConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SweepConfig::default(),
    };

    if let Some(start) = args.start {
        config.start = start;
    }
    if let Some(stop) = args.stop {
        config.stop = stop;
    }
    if let Some(step) = args.step {
        config.step = step;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(sensor) = &args.sensor {
        config.sensor = sensor.clone();
    }
    if let Some(exp) = args.exp {
        config.exposure = exp;
    }
    if args.bayer {
        config.bayer = true;
    }
    if !args.extra.is_empty() {
        config.extra = args.extra.clone();
    }
    config.validate()?;
    Ok(config)
}

pub fn run(args: &SweepArgs) -> Result<()> {
    let config = build_config(args)?;
    let total = plan_angles(&config)?.len();

    let mut camera = CommandCapture::from_command_line(&args.capture_cmd)?.with_settings(
        &config.sensor,
        config.exposure,
        config.bayer,
        &config.extra,
    );
    // No stage driver is linked in; the sweep runs against the simulated mount.
    let mut stage = SimulatedStage::new();
    info!(capture_cmd = %args.capture_cmd, total, "sweep planned");

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:12} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );

    let captures = run_sweep(
        &mut stage,
        &mut camera,
        &config,
        chrono::Local::now,
        |step| {
            pb.set_message(format!("{:+.1} deg", step.angle));
            pb.set_position((step.index + 1) as u64);
        },
    );
    match captures {
        Ok(captures) => {
            pb.finish_with_message("Done");
            println!(
                "{} captures saved to {}",
                captures.len(),
                config.output_dir.display()
            );
            Ok(())
        }
        Err(e) => {
            pb.abandon();
            Err(e).context("Sweep aborted")
        }
    }
}
