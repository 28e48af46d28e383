/// Largest value of the canonical u16 dtype, as f64 for rescaling.
pub const U16_FULL_SCALE: f64 = 65_535.0;

/// Channel kept when collapsing RGB captures to a single plane.
pub const GREEN_CHANNEL: usize = 1;

/// Number of channels in a color capture (R, G, B).
pub const COLOR_CHANNEL_COUNT: usize = 3;

/// NPY magic prefix.
pub const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Payload alignment used when writing NPY headers.
pub const NPY_HEADER_ALIGN: usize = 64;

/// Small epsilon to avoid division by zero in gain ratios.
pub const EPSILON: f64 = 1e-6;

/// ITU-R BT.601 luminance coefficient for the red channel.
pub const LUMINANCE_R: f32 = 0.299;

/// ITU-R BT.601 luminance coefficient for the green channel.
pub const LUMINANCE_G: f32 = 0.587;

/// ITU-R BT.601 luminance coefficient for the blue channel.
pub const LUMINANCE_B: f32 = 0.114;

/// Default luminance percentile window for the AWB pixel mask.
pub const DEFAULT_AWB_MASK_PERCENTILES: (f64, f64) = (5.0, 99.0);

/// Default clamp range for AWB red/blue gains.
pub const DEFAULT_AWB_GAIN_CLIP: (f64, f64) = (0.5, 4.0);

/// Default per-channel percentile used as the AWB statistic.
pub const DEFAULT_AWB_PERCENTILE: f64 = 80.0;

/// Default red-to-green target ratio for lensless PSF frames.
pub const DEFAULT_AWB_TARGET_RATIO: f64 = 0.9;

/// Default dB drop used to estimate peak width in cross-sections.
pub const DEFAULT_DB_DROP: f32 = 3.0;

/// Default gamma for preview rendering.
pub const DEFAULT_GAMMA: f32 = 2.2;

/// Default sweep start angle in degrees.
pub const DEFAULT_SWEEP_START: f64 = -45.0;

/// Default sweep stop angle in degrees.
pub const DEFAULT_SWEEP_STOP: f64 = 45.0;

/// Default sweep step in degrees.
pub const DEFAULT_SWEEP_STEP: f64 = 5.0;

/// Default exposure passed to the capture command, in seconds.
pub const DEFAULT_EXPOSURE: f64 = 0.02;

/// Timestamp format embedded in capture stems.
pub const CAPTURE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
