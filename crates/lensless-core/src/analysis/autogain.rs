//! Single-frame PSF analysis: white balance, histograms, widths and
//! autocorrelations, written out as CSV tables and PNG previews.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::{s, Array2, Array3, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analysis::autocorr::autocorr2d;
use crate::analysis::awb::{
    apply_gains, compute_awb_gains, gamma_correct, subtract_background, AwbGains, AwbParams,
};
use crate::analysis::frame::{
    cross_section, infer_nbits, pixel_histogram, rgb_to_gray, to_hwc_f32, CrossSection,
    MAX_HISTOGRAM_BITS,
};
use crate::array::Dtype;
use crate::consts::{COLOR_CHANNEL_COUNT, DEFAULT_DB_DROP, DEFAULT_GAMMA};
use crate::error::{LenslessError, Result};
use crate::io::{image_io, read_array};

const CHANNEL_LABELS: [&str; 3] = ["r", "g", "b"];
const GRAY_LABEL: &str = "gray";

/// What kind of optical system produced the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PsfKind {
    /// Histograms and previews only.
    #[default]
    Plain,
    /// Focused PSF: width of the spot in each channel.
    Lens,
    /// Lensless PSF: width of the autocorrelation peak in each channel.
    Lensless,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeConfig {
    pub kind: PsfKind,
    /// Gamma applied to PNG previews.
    pub gamma: f32,
    /// dB drop used for width estimates.
    pub db_drop: f32,
    /// Histogram bit depth; inferred from the frame maximum when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub red_gain: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blue_gain: Option<f64>,
    /// Estimate gains from the frame; explicit gains are ignored when set.
    pub auto_gain: bool,
    pub awb: AwbParams,
    /// Keep every n-th row and column.
    pub downsample: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<PathBuf>,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            kind: PsfKind::Plain,
            gamma: DEFAULT_GAMMA,
            db_drop: DEFAULT_DB_DROP,
            nbits: None,
            red_gain: None,
            blue_gain: None,
            auto_gain: false,
            awb: AwbParams::default(),
            downsample: 1,
            background: None,
        }
    }
}

/// Everything computed for one frame.
#[derive(Clone, Debug)]
pub struct FrameAnalysis {
    /// Frame after downsampling, background removal and gains, raw scale.
    pub frame: Array3<f32>,
    pub gray: Array2<f32>,
    pub nbits: u32,
    pub gains: AwbGains,
    /// `(label, counts)` per channel, followed by gray for colour frames.
    pub histograms: Vec<(String, Vec<u64>)>,
    pub cross_sections: Vec<(String, CrossSection)>,
    pub autocorrelations: Vec<(String, Array2<f32>)>,
}

impl FrameAnalysis {
    pub fn is_color(&self) -> bool {
        self.frame.dim().2 == COLOR_CHANNEL_COUNT
    }
}

fn full_scale(dtype: Dtype) -> f32 {
    match dtype {
        Dtype::U8 => u8::MAX as f32,
        Dtype::U16 => u16::MAX as f32,
        _ => f32::MAX,
    }
}

fn load_frame(path: &Path, downsample: usize) -> Result<(Array3<f32>, Dtype)> {
    let array = read_array(path)?;
    let frame = to_hwc_f32(&array)?;
    let frame = if downsample > 1 {
        frame
            .slice(s![..;downsample, ..;downsample, ..])
            .to_owned()
    } else {
        frame
    };
    Ok((frame, array.dtype()))
}

/// Analyze a capture from disk.
pub fn analyze_frame(path: &Path, config: &AnalyzeConfig) -> Result<FrameAnalysis> {
    if config.downsample == 0 {
        return Err(LenslessError::InvalidArgument(
            "downsample factor must be at least 1".into(),
        ));
    }
    let (mut frame, dtype) = load_frame(path, config.downsample)?;
    debug!(path = %path.display(), shape = ?frame.shape(), %dtype, "loaded frame");

    if let Some(bg_path) = &config.background {
        let (background, _) = load_frame(bg_path, config.downsample)?;
        subtract_background(&mut frame, background.view())?;
    }

    let color = frame.dim().2 == COLOR_CHANNEL_COUNT;
    let gains = if !color {
        AwbGains::default()
    } else if config.auto_gain {
        let gains = compute_awb_gains(frame.view(), &config.awb)?;
        info!(red = gains.red, blue = gains.blue, "auto gain");
        gains
    } else {
        AwbGains {
            red: config.red_gain.unwrap_or(1.0),
            blue: config.blue_gain.unwrap_or(1.0),
        }
    };
    if color {
        frame = apply_gains(frame.view(), gains, full_scale(dtype))?;
    }

    analyze_array(frame, gains, config)
}

/// Analyze an in-memory `(H, W, C)` frame with gains already applied.
pub fn analyze_array(frame: Array3<f32>, gains: AwbGains, config: &AnalyzeConfig) -> Result<FrameAnalysis> {
    let gray = rgb_to_gray(frame.view())?;
    let max = frame.iter().copied().fold(0.0f32, f32::max);
    let nbits = config
        .nbits
        .unwrap_or_else(|| infer_nbits(max).min(MAX_HISTOGRAM_BITS));
    debug!(nbits, max, "histogram depth");

    let color = frame.dim().2 == COLOR_CHANNEL_COUNT;
    let planes: Vec<(String, Array2<f32>)> = if color {
        CHANNEL_LABELS
            .iter()
            .zip(frame.axis_iter(Axis(2)))
            .map(|(label, plane)| (label.to_string(), plane.to_owned()))
            .collect()
    } else {
        Vec::new()
    };

    let mut histograms = Vec::new();
    for (label, plane) in &planes {
        histograms.push((label.clone(), pixel_histogram(plane.iter(), nbits)?));
    }
    histograms.push((GRAY_LABEL.to_string(), pixel_histogram(gray.iter(), nbits)?));

    let mut cross_sections = Vec::new();
    let mut autocorrelations = Vec::new();
    match config.kind {
        PsfKind::Plain => {}
        PsfKind::Lens => {
            cross_sections.push((
                GRAY_LABEL.to_string(),
                cross_section(gray.view(), config.db_drop, None)?,
            ));
            let reference = ((1u64 << nbits) - 1) as f32;
            for (label, plane) in &planes {
                let cs = cross_section(plane.view(), config.db_drop, Some(reference))?;
                cross_sections.push((label.clone(), cs));
            }
        }
        PsfKind::Lensless => {
            let gray_ac = autocorr2d(&gray);
            cross_sections.push((
                GRAY_LABEL.to_string(),
                cross_section(gray_ac.view(), config.db_drop, None)?,
            ));
            autocorrelations.push((GRAY_LABEL.to_string(), gray_ac));
            for (label, plane) in &planes {
                let ac = autocorr2d(plane);
                cross_sections.push((label.clone(), cross_section(ac.view(), config.db_drop, None)?));
                autocorrelations.push((label.clone(), ac));
            }
        }
    }
    for (label, cs) in &cross_sections {
        info!(channel = %label, width = cs.width, db_drop = config.db_drop, "peak width");
    }

    Ok(FrameAnalysis {
        frame,
        gray,
        nbits,
        gains,
        histograms,
        cross_sections,
        autocorrelations,
    })
}

/// Write previews and tables into `dir`. Returns the files written.
pub fn write_analysis(analysis: &FrameAnalysis, dir: &Path, gamma: f32) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    if analysis.is_color() {
        let path = dir.join("rgb_analysis.png");
        let mut preview = scaled_to_unit(&analysis.frame);
        gamma_correct(&mut preview, gamma);
        image_io::save_rgb_png(preview.view(), &path)?;
        written.push(path);
    }

    let path = dir.join("grey_analysis.png");
    let mut gray = image_io::normalize_unit(analysis.gray.view()).insert_axis(Axis(2));
    gamma_correct(&mut gray, gamma);
    image_io::save_gray_png(gray.index_axis(Axis(2), 0), &path)?;
    written.push(path);

    let path = dir.join("histogram.csv");
    write_histograms(&analysis.histograms, &path)?;
    written.push(path);

    if !analysis.cross_sections.is_empty() {
        let path = dir.join("cross_sections.csv");
        write_cross_sections(&analysis.cross_sections, &path)?;
        written.push(path);
    }

    for (label, ac) in &analysis.autocorrelations {
        let path = dir.join(format!("autocorrelation_{label}.png"));
        image_io::save_gray_png(image_io::normalize_unit(ac.view()).view(), &path)?;
        written.push(path);
    }

    Ok(written)
}

fn scaled_to_unit(frame: &Array3<f32>) -> Array3<f32> {
    let max = frame.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        frame.mapv(|v| v / max)
    } else {
        frame.clone()
    }
}

fn write_histograms(histograms: &[(String, Vec<u64>)], path: &Path) -> Result<()> {
    let mut w = BufWriter::new(fs::File::create(path)?);
    let labels: Vec<&str> = histograms.iter().map(|(l, _)| l.as_str()).collect();
    writeln!(w, "value,{}", labels.join(","))?;

    let bins = histograms.first().map_or(0, |(_, h)| h.len());
    for bin in 0..bins {
        let counts: Vec<String> = histograms.iter().map(|(_, h)| h[bin].to_string()).collect();
        writeln!(w, "{bin},{}", counts.join(","))?;
    }
    w.flush()?;
    Ok(())
}

fn write_cross_sections(sections: &[(String, CrossSection)], path: &Path) -> Result<()> {
    let mut w = BufWriter::new(fs::File::create(path)?);
    let labels: Vec<String> = sections
        .iter()
        .map(|(l, cs)| format!("{l}_db (width {})", cs.width))
        .collect();
    writeln!(w, "col,{}", labels.join(","))?;

    let len = sections.iter().map(|(_, cs)| cs.profile_db.len()).max().unwrap_or(0);
    for col in 0..len {
        let values: Vec<String> = sections
            .iter()
            .map(|(_, cs)| cs.profile_db.get(col).map_or_else(String::new, |v| format!("{v:.3}")))
            .collect();
        writeln!(w, "{col},{}", values.join(","))?;
    }
    w.flush()?;
    Ok(())
}
