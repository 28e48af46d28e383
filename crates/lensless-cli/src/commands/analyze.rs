use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::Style;
use lensless_core::analysis::{analyze_frame, write_analysis, AnalyzeConfig, PsfKind};
use tracing::debug;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Capture to analyze (.npy or image)
    pub file: PathBuf,

    /// Analysis config file (TOML); flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Treat the frame as the PSF of a lens
    #[arg(long, conflicts_with = "lensless")]
    pub lens: bool,

    /// Treat the frame as the PSF of a lensless camera
    #[arg(long)]
    pub lensless: bool,

    /// Gamma applied to PNG previews
    #[arg(long)]
    pub gamma: Option<f32>,

    /// dB drop used to estimate widths
    #[arg(long)]
    pub width: Option<f32>,

    /// Histogram bit depth (inferred from the frame maximum by default)
    #[arg(long)]
    pub nbits: Option<u32>,

    /// Red gain
    #[arg(long)]
    pub rg: Option<f64>,

    /// Blue gain
    #[arg(long)]
    pub bg: Option<f64>,

    /// Estimate red and blue gains from the frame
    #[arg(long)]
    pub auto_gain: bool,

    /// Downsampling factor
    #[arg(long)]
    pub down: Option<usize>,

    /// Background capture subtracted before analysis
    #[arg(long)]
    pub back: Option<PathBuf>,

    /// Output directory (default: <input stem>_analysis next to the input)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

fn build_config(args: &AnalyzeArgs) -> Result<AnalyzeConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => AnalyzeConfig::default(),
    };

    if args.lens {
        config.kind = PsfKind::Lens;
    } else if args.lensless {
        config.kind = PsfKind::Lensless;
    }
    if let Some(gamma) = args.gamma {
        config.gamma = gamma;
    }
    if let Some(width) = args.width {
        config.db_drop = width;
    }
    if args.nbits.is_some() {
        config.nbits = args.nbits;
    }
    if args.rg.is_some() {
        config.red_gain = args.rg;
    }
    if args.bg.is_some() {
        config.blue_gain = args.bg;
    }
    if args.auto_gain {
        config.auto_gain = true;
    }
    if let Some(down) = args.down {
        config.downsample = down;
    }
    if args.back.is_some() {
        config.background = args.back.clone();
    }
    debug!(?config, "analysis config");
    Ok(config)
}

pub fn run(args: &AnalyzeArgs) -> Result<()> {
    let config = build_config(args)?;
    let analysis = analyze_frame(&args.file, &config)
        .with_context(|| format!("Failed to analyze {}", args.file.display()))?;

    let heading = Style::new().cyan().bold();
    let dim = Style::new().dim();

    println!("{}", heading.apply_to(args.file.display()));
    let (h, w, c) = analysis.frame.dim();
    println!("  {:<14}{h} x {w} x {c}", dim.apply_to("Frame"));
    println!("  {:<14}{}", dim.apply_to("Bit depth"), analysis.nbits);
    if analysis.is_color() {
        println!(
            "  {:<14}red {:.3}, blue {:.3}",
            dim.apply_to("Gains"),
            analysis.gains.red,
            analysis.gains.blue
        );
    }
    for (label, cs) in &analysis.cross_sections {
        println!(
            "  {:<14}{} samples at -{} dB (row {}, col {})",
            dim.apply_to(format!("Width {label}")),
            cs.width,
            config.db_drop,
            cs.row,
            cs.peak_col
        );
    }

    let output_dir = args.output_dir.clone().unwrap_or_else(|| {
        let stem = args
            .file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        args.file.with_file_name(format!("{stem}_analysis"))
    });
    let written = write_analysis(&analysis, &output_dir, config.gamma)
        .with_context(|| format!("Failed to write results to {}", output_dir.display()))?;
    for path in &written {
        println!("  {:<14}{}", dim.apply_to("Saved"), path.display());
    }
    Ok(())
}
