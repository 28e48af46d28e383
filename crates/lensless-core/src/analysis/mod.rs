pub mod autocorr;
pub mod autogain;
pub mod awb;
pub mod frame;
pub mod inspect;
pub mod pixel_angle;
pub mod stokes;

pub use autogain::{analyze_frame, write_analysis, AnalyzeConfig, FrameAnalysis, PsfKind};
pub use inspect::{inspect, ArrayStats};
