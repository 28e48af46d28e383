mod commands;
mod report;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lensless_core::convert::ConversionKind;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lensless", about = "Lensless camera lab toolkit")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert .npy arrays of any dtype to uint16 spanning [0, 65535]
    ToU16(commands::convert::BatchArgs),
    /// Prepare a PSF and a measurement for ADMM reconstruction
    Prep(commands::prep::PrepArgs),
    /// Bring PSF files to (1, H, W, 1) uint16
    PrepPsf(commands::convert::BatchArgs),
    /// Bring measurement files to (H, W, 1) uint16
    PrepData(commands::convert::BatchArgs),
    /// Convert (H, W, 3) arrays to (1, H, W, 1) uint16 using the green channel
    #[command(name = "to-1hw1")]
    To1hw1(commands::convert::BatchArgs),
    /// Drop a leading depth axis of length 1
    Squeeze(commands::convert::BatchArgs),
    /// Show shape, dtype and value statistics of an array file
    Inspect(commands::inspect::InspectArgs),
    /// Tabulate one pixel across an angle sweep
    PixelAngle(commands::pixel_angle::PixelAngleArgs),
    /// Map a pixel-vs-angle table onto the S3 Stokes parameter
    Stokes(commands::stokes::StokesArgs),
    /// Histograms, widths, autocorrelations and white balance of one frame
    Analyze(commands::analyze::AnalyzeArgs),
    /// Rotate the wave plate through a range of angles, capturing at each
    Sweep(commands::sweep::SweepArgs),
    /// Print a default configuration file
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::ToU16(args) => commands::convert::run(ConversionKind::Uint16, args),
        Commands::Prep(args) => commands::prep::run(args),
        Commands::PrepPsf(args) => commands::convert::run(ConversionKind::Psf, args),
        Commands::PrepData(args) => commands::convert::run(ConversionKind::Data, args),
        Commands::To1hw1(args) => commands::convert::run(ConversionKind::Generic, args),
        Commands::Squeeze(args) => commands::convert::run(ConversionKind::SqueezeDepth, args),
        Commands::Inspect(args) => commands::inspect::run(args),
        Commands::PixelAngle(args) => commands::pixel_angle::run(args),
        Commands::Stokes(args) => commands::stokes::run(args),
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::Sweep(args) => commands::sweep::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
