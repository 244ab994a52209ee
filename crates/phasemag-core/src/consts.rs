/// Upper bound of the display range; reconstructed luminance is clipped to [0, DISPLAY_MAX].
pub const DISPLAY_MAX: f64 = 255.0;

/// Minimum coefficient count to use Rayon parallelism for per-coefficient work.
pub const PARALLEL_COEFFICIENT_THRESHOLD: usize = 65_536;

/// ITU-R BT.601 luminance coefficient for the red channel.
pub const LUMINANCE_R: f32 = 0.299;

/// ITU-R BT.601 luminance coefficient for the green channel.
pub const LUMINANCE_G: f32 = 0.587;

/// ITU-R BT.601 luminance coefficient for the blue channel.
pub const LUMINANCE_B: f32 = 0.114;

/// Number of channels in a color frame (R, G, B).
pub const COLOR_CHANNEL_COUNT: usize = 3;

/// Default number of band scales in the steerable pyramid.
pub const DEFAULT_PYRAMID_SCALES: usize = 2;

/// Default number of orientations per scale.
pub const DEFAULT_PYRAMID_ORIENTATIONS: usize = 4;

/// Default sliding window length in frames.
pub const DEFAULT_WINDOW_SIZE: usize = 30;

/// Default phase magnification factor.
pub const DEFAULT_FACTOR: f64 = 30.0;

/// Default sampling rate (Hz) used to design the temporal bandpass.
pub const DEFAULT_SAMPLING_RATE: f64 = 600.0;

/// Default lower pass-band edge (Hz).
pub const DEFAULT_LOW_FREQ: f64 = 72.0;

/// Default upper pass-band edge (Hz).
pub const DEFAULT_HIGH_FREQ: f64 = 92.0;

/// Default cap on frames read from the source.
pub const DEFAULT_MAX_FRAMES: usize = 60_000;

/// Sampling rate assumed when neither the config nor the source provides one.
pub const FALLBACK_FRAME_RATE: f64 = 30.0;

/// Zero-padding multiple applied to the window before the ideal filter's FFT.
pub const DEFAULT_ZERO_PAD_FACTOR: usize = 4;

/// Default Butterworth prototype order.
pub const DEFAULT_BUTTERWORTH_ORDER: usize = 3;

/// SER timestamps are 100 ns ticks.
pub const SER_TICKS_PER_SECOND: f64 = 10_000_000.0;
