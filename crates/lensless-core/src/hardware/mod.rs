//! Hardware abstraction for polarization sweeps.
//!
//! A sweep drives a rotation stage through a list of angles and captures one
//! frame at each. Both devices sit behind traits so the sweep logic runs the
//! same against a simulated stage in tests and real hardware on the bench.

pub mod command;
pub mod simulated;
pub mod sweep;

use std::path::PathBuf;

use thiserror::Error;

pub use command::CommandCapture;
pub use simulated::SimulatedStage;
pub use sweep::{plan_angles, run_sweep, SweepConfig, SweepStep};

/// Failure reported by a stage or camera. Not retried.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("stage error: {0}")]
    Stage(String),

    #[error("capture command `{command}` failed: {reason}")]
    Capture { command: String, reason: String },

    #[error("device already closed")]
    Closed,

    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// Motorized rotation mount. Angles are in degrees.
///
/// `move_to`/`move_by` start a motion; `wait_move` blocks until it settles.
pub trait RotationStage {
    fn home(&mut self) -> DeviceResult<()>;
    fn move_to(&mut self, angle: f64) -> DeviceResult<()>;
    fn move_by(&mut self, delta: f64) -> DeviceResult<()>;
    fn wait_move(&mut self) -> DeviceResult<()>;
    fn position(&self) -> DeviceResult<f64>;
    /// Release the device. Later calls fail with [`DeviceError::Closed`].
    fn close(&mut self) -> DeviceResult<()>;
}

/// Blocking still capture.
pub trait CaptureDevice {
    /// Capture one frame named after `stem` and return the written file.
    fn capture_still(&mut self, stem: &std::path::Path) -> DeviceResult<PathBuf>;
}
