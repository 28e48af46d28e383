use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{CaptureDevice, RotationStage};
use crate::consts::{
    CAPTURE_TIMESTAMP_FORMAT, DEFAULT_EXPOSURE, DEFAULT_SWEEP_START, DEFAULT_SWEEP_STEP,
    DEFAULT_SWEEP_STOP,
};
use crate::error::{LenslessError, Result};

const ANGLE_TOLERANCE: f64 = 1e-9;
/// Upper bound on planned angles.
const MAX_SWEEP_ANGLES: usize = 36_001;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// First angle in degrees.
    pub start: f64,
    /// Last angle in degrees (inclusive when reached exactly).
    pub stop: f64,
    pub step: f64,
    pub output_dir: PathBuf,
    pub sensor: String,
    /// Exposure in seconds.
    pub exposure: f64,
    pub bayer: bool,
    /// Angle the stage returns to after the sweep.
    pub park_angle: f64,
    /// Extra arguments appended to every capture command.
    pub extra: Vec<String>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            start: DEFAULT_SWEEP_START,
            stop: DEFAULT_SWEEP_STOP,
            step: DEFAULT_SWEEP_STEP,
            output_dir: PathBuf::from("./captures"),
            sensor: "rpi_gs".to_string(),
            exposure: DEFAULT_EXPOSURE,
            bayer: false,
            park_angle: 0.0,
            extra: Vec::new(),
        }
    }
}

impl SweepConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: SweepConfig = toml::from_str(&text)
            .map_err(|e| LenslessError::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("start", self.start), ("stop", self.stop), ("step", self.step)] {
            if !value.is_finite() {
                return Err(LenslessError::InvalidConfig(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        if self.step <= 0.0 {
            return Err(LenslessError::InvalidConfig(format!(
                "step must be positive, got {}",
                self.step
            )));
        }
        if self.start > self.stop {
            return Err(LenslessError::InvalidConfig(format!(
                "start {} is past stop {}",
                self.start, self.stop
            )));
        }
        if self.exposure.is_nan() || self.exposure <= 0.0 {
            return Err(LenslessError::InvalidConfig(format!(
                "exposure must be positive, got {}",
                self.exposure
            )));
        }
        Ok(())
    }
}

/// Angles visited by a sweep: `start, start + step, ...` up to `stop`.
pub fn plan_angles(config: &SweepConfig) -> Result<Vec<f64>> {
    config.validate()?;
    let span = ((config.stop - config.start) / config.step + ANGLE_TOLERANCE).floor();
    if span >= MAX_SWEEP_ANGLES as f64 {
        return Err(LenslessError::InvalidConfig(format!(
            "sweep from {} to {} in steps of {} exceeds {MAX_SWEEP_ANGLES} angles",
            config.start, config.stop, config.step
        )));
    }
    let count = span as usize + 1;
    // `+ 0.0` turns a computed -0.0 into 0.0 so stems never read "-00".
    Ok((0..count)
        .map(|i| config.start + i as f64 * config.step + 0.0)
        .collect())
}

/// File stem for a capture at `angle`, e.g. `angle_-05_20250721_101500`.
pub fn capture_stem(angle: f64, timestamp: &DateTime<Local>) -> String {
    format!(
        "angle_{:+03.0}_{}",
        angle,
        timestamp.format(CAPTURE_TIMESTAMP_FORMAT)
    )
}

/// Progress of a running sweep, reported after each capture.
#[derive(Clone, Debug)]
pub struct SweepStep {
    pub index: usize,
    pub total: usize,
    pub angle: f64,
    pub path: PathBuf,
}

/// Drive `stage` through the planned angles, capturing one frame at each,
/// then park it. The stage is closed on every exit path.
///
/// `clock` supplies the timestamp for each capture stem.
pub fn run_sweep(
    stage: &mut dyn RotationStage,
    camera: &mut dyn CaptureDevice,
    config: &SweepConfig,
    mut clock: impl FnMut() -> DateTime<Local>,
    mut on_step: impl FnMut(&SweepStep),
) -> Result<Vec<PathBuf>> {
    let result = plan_angles(config).and_then(|angles| {
        fs::create_dir_all(&config.output_dir)?;
        info!(
            count = angles.len(),
            start = config.start,
            stop = config.stop,
            step = config.step,
            "starting sweep"
        );
        sweep_angles(stage, camera, config, &angles, &mut clock, &mut on_step)
    });

    let closed = stage.close();
    let captures = result?;
    if let Err(e) = closed {
        warn!("failed to close stage: {e}");
        return Err(e.into());
    }
    info!(captures = captures.len(), "sweep complete");
    Ok(captures)
}

fn sweep_angles(
    stage: &mut dyn RotationStage,
    camera: &mut dyn CaptureDevice,
    config: &SweepConfig,
    angles: &[f64],
    clock: &mut impl FnMut() -> DateTime<Local>,
    on_step: &mut impl FnMut(&SweepStep),
) -> Result<Vec<PathBuf>> {
    stage.home()?;
    stage.wait_move()?;
    if let Some(&first) = angles.first() {
        stage.move_to(first)?;
        stage.wait_move()?;
    }

    let mut captures = Vec::with_capacity(angles.len());
    for (index, &angle) in angles.iter().enumerate() {
        let stem = config.output_dir.join(capture_stem(angle, &clock()));
        let path = camera.capture_still(&stem)?;
        on_step(&SweepStep {
            index,
            total: angles.len(),
            angle,
            path: path.clone(),
        });
        captures.push(path);

        if let Some(&next) = angles.get(index + 1) {
            stage.move_to(next)?;
            stage.wait_move()?;
        }
    }

    stage.move_to(config.park_angle)?;
    stage.wait_move()?;
    Ok(captures)
}
