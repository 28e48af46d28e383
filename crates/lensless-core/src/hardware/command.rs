use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use super::{CaptureDevice, DeviceError, DeviceResult};

/// Captures by running an external on-device capture program.
///
/// The program is called as
/// `<program> [args..] fn=<stem> sensor=<sensor> legacy=False exp=<exposure> bayer=<bool> [extra..]`.
#[derive(Clone, Debug)]
pub struct CommandCapture {
    program: String,
    args: Vec<String>,
    pub sensor: String,
    pub exposure: f64,
    pub bayer: bool,
    pub extra: Vec<String>,
}

impl CommandCapture {
    /// Build from a whitespace-separated command line such as
    /// `python scripts/on_device_capture.py`.
    pub fn from_command_line(cmd: &str) -> DeviceResult<Self> {
        let mut parts = cmd.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| DeviceError::Capture {
            command: cmd.to_string(),
            reason: "empty capture command".into(),
        })?;
        Ok(Self {
            program,
            args: parts.collect(),
            sensor: String::new(),
            exposure: 0.0,
            bayer: false,
            extra: Vec::new(),
        })
    }

    pub fn with_settings(mut self, sensor: &str, exposure: f64, bayer: bool, extra: &[String]) -> Self {
        self.sensor = sensor.to_string();
        self.exposure = exposure;
        self.bayer = bayer;
        self.extra = extra.to_vec();
        self
    }

    /// Full argument list passed to the program for `stem`.
    pub fn arguments(&self, stem: &Path) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(format!("fn={}", stem.display()));
        args.push(format!("sensor={}", self.sensor));
        args.push("legacy=False".to_string());
        args.push(format!("exp={}", self.exposure));
        args.push(format!("bayer={}", self.bayer));
        args.extend(self.extra.iter().cloned());
        args
    }

    fn command_line(&self, args: &[String]) -> String {
        std::iter::once(self.program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl CaptureDevice for CommandCapture {
    fn capture_still(&mut self, stem: &Path) -> DeviceResult<PathBuf> {
        let args = self.arguments(stem);
        let line = self.command_line(&args);
        info!(command = %line, "capturing");

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|e| DeviceError::Capture {
                command: line.clone(),
                reason: e.to_string(),
            })?;
        if !status.success() {
            return Err(DeviceError::Capture {
                command: line,
                reason: format!("exited with {status}"),
            });
        }

        match find_capture(stem)? {
            Some(path) => {
                debug!(path = %path.display(), "capture complete");
                Ok(path)
            }
            None => {
                warn!(stem = %stem.display(), "capture command wrote no file named after the stem");
                Ok(stem.to_path_buf())
            }
        }
    }
}

/// First file next to `stem` whose name starts with the stem's file name.
fn find_capture(stem: &Path) -> DeviceResult<Option<PathBuf>> {
    let Some(name) = stem.file_name().and_then(|n| n.to_str()) else {
        return Ok(None);
    };
    let dir = match stem.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut matches: Vec<PathBuf> = fs::read_dir(&dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(name))
        })
        .collect();
    matches.sort();
    Ok(matches.into_iter().next())
}
