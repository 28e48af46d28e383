use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use tempfile::tempdir;

use lensless_core::error::LenslessError;
use lensless_core::hardware::simulated::StageEvent;
use lensless_core::hardware::{
    plan_angles, run_sweep, CaptureDevice, DeviceError, DeviceResult, RotationStage, SimulatedStage,
    SweepConfig,
};

/// Writes an empty `.npy` per capture and can be told to fail.
struct FakeCamera {
    stems: Vec<PathBuf>,
    fail_on: Option<usize>,
}

impl FakeCamera {
    fn new() -> Self {
        Self {
            stems: Vec::new(),
            fail_on: None,
        }
    }
}

impl CaptureDevice for FakeCamera {
    fn capture_still(&mut self, stem: &Path) -> DeviceResult<PathBuf> {
        self.stems.push(stem.to_path_buf());
        if self.fail_on == Some(self.stems.len()) {
            return Err(DeviceError::Capture {
                command: "fake".into(),
                reason: "sensor timeout".into(),
            });
        }
        let path = stem.with_extension("npy");
        fs::write(&path, b"")?;
        Ok(path)
    }
}

fn fixed_clock() -> chrono::DateTime<Local> {
    Local.with_ymd_and_hms(2025, 7, 21, 10, 15, 0).unwrap()
}

fn small_config(dir: &Path) -> SweepConfig {
    SweepConfig {
        start: -10.0,
        stop: 10.0,
        step: 10.0,
        output_dir: dir.join("captures"),
        park_angle: 0.0,
        ..SweepConfig::default()
    }
}

#[test]
fn test_sweep_visits_every_angle_and_parks() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path());
    let mut stage = SimulatedStage::new();
    let mut camera = FakeCamera::new();
    let mut steps = Vec::new();

    let captures = run_sweep(&mut stage, &mut camera, &config, fixed_clock, |s| {
        steps.push((s.index, s.angle))
    })
    .unwrap();

    assert_eq!(captures.len(), 3);
    assert!(captures.iter().all(|p| p.is_file()));
    assert_eq!(steps, vec![(0, -10.0), (1, 0.0), (2, 10.0)]);

    let names: Vec<String> = camera
        .stems
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "angle_-10_20250721_101500",
            "angle_+00_20250721_101500",
            "angle_+10_20250721_101500",
        ]
    );

    use StageEvent::*;
    assert_eq!(
        stage.events(),
        &[
            Home,
            Wait,
            MoveTo(-10.0),
            Wait,
            MoveTo(0.0),
            Wait,
            MoveTo(10.0),
            Wait,
            MoveTo(0.0),
            Wait,
            Close,
        ]
    );
    assert!(stage.is_closed());
}

#[test]
fn test_stage_fault_aborts_and_closes() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path());
    // Move 1 goes to the start angle, move 2 to the second angle.
    let mut stage = SimulatedStage::new().failing_on_move(2);
    let mut camera = FakeCamera::new();

    let err = run_sweep(&mut stage, &mut camera, &config, fixed_clock, |_| {}).unwrap_err();
    assert!(matches!(err, LenslessError::Device(DeviceError::Stage(_))));
    assert_eq!(camera.stems.len(), 1);
    assert!(stage.is_closed());
}

#[test]
fn test_capture_fault_aborts_and_closes() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path());
    let mut stage = SimulatedStage::new();
    let mut camera = FakeCamera {
        fail_on: Some(2),
        ..FakeCamera::new()
    };

    let err = run_sweep(&mut stage, &mut camera, &config, fixed_clock, |_| {}).unwrap_err();
    assert!(matches!(err, LenslessError::Device(DeviceError::Capture { .. })));
    assert!(stage.is_closed());
    assert_eq!(stage.position().ok(), None);
}

#[test]
fn test_invalid_config_still_closes_stage() {
    let dir = tempdir().unwrap();
    let config = SweepConfig {
        step: -5.0,
        ..small_config(dir.path())
    };
    let mut stage = SimulatedStage::new();
    let err = run_sweep(&mut stage, &mut FakeCamera::new(), &config, fixed_clock, |_| {})
        .unwrap_err();
    assert!(matches!(err, LenslessError::InvalidConfig(_)));
    assert!(stage.is_closed());
    assert_eq!(stage.events(), &[StageEvent::Close]);
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sweep.toml");
    fs::write(&path, "start = -20.0\nstop = 20.0\nsensor = \"rpi_hq\"\nextra = [\"res=[1456,1088]\"]\n")
        .unwrap();

    let config = SweepConfig::from_toml_file(&path).unwrap();
    assert_eq!(config.start, -20.0);
    assert_eq!(config.step, 5.0);
    assert_eq!(config.sensor, "rpi_hq");
    assert_eq!(config.extra, vec!["res=[1456,1088]".to_string()]);

    let text = toml::to_string_pretty(&SweepConfig::default()).unwrap();
    let back: SweepConfig = toml::from_str(&text).unwrap();
    assert_eq!(back, SweepConfig::default());
}

#[test]
fn test_config_file_rejects_bad_step() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sweep.toml");
    fs::write(&path, "step = 0.0\n").unwrap();
    assert!(matches!(
        SweepConfig::from_toml_file(&path),
        Err(LenslessError::InvalidConfig(_))
    ));
}

#[test]
fn test_config_rejects_non_finite_angles() {
    let config: SweepConfig = toml::from_str("stop = inf\n").unwrap();
    assert!(matches!(config.validate(), Err(LenslessError::InvalidConfig(_))));
    assert!(matches!(plan_angles(&config), Err(LenslessError::InvalidConfig(_))));

    let config: SweepConfig = toml::from_str("start = nan\n").unwrap();
    assert!(matches!(plan_angles(&config), Err(LenslessError::InvalidConfig(_))));
}

#[test]
fn test_plan_rejects_oversized_sweep() {
    let config = SweepConfig {
        start: -1.0e12,
        stop: 1.0e12,
        step: 1.0e-3,
        ..SweepConfig::default()
    };
    assert!(config.validate().is_ok());
    assert!(matches!(plan_angles(&config), Err(LenslessError::InvalidConfig(_))));
}
