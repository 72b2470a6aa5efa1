//! Tunable parameters for the fingerprinting pipeline.
//!
//! Every knob here corresponds to one row of the configuration table in the
//! system specification: sample rate, window size, peak density, and target
//! zone geometry. Defaults match the reference implementation's defaults.

use thiserror::Error;

/// Canonical analysis sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
/// Spectrogram window length in seconds.
pub const DEFAULT_FFT_WINDOW_SIZE: f32 = 0.2;
/// Peak neighborhood side length, in spectrogram bins.
pub const DEFAULT_PEAK_BOX_SIZE: usize = 30;
/// Fraction of theoretical peak capacity kept.
pub const DEFAULT_POINT_EFFICIENCY: f32 = 0.5;
/// Target-zone start offset from the anchor, in seconds.
pub const DEFAULT_TARGET_START: f32 = 0.05;
/// Target-zone width, in seconds.
pub const DEFAULT_TARGET_T: f32 = 1.8;
/// Target-zone height, in Hz.
pub const DEFAULT_TARGET_F: f32 = 4000.0;

/// Errors raised by [`FingerprintConfig::validate`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("sample_rate must be > 0")]
    InvalidSampleRate,
    #[error("fft_window_size must be > 0")]
    InvalidFftWindowSize,
    #[error("peak_box_size must be >= 3")]
    InvalidPeakBoxSize,
    #[error("point_efficiency must be in (0, 1]")]
    InvalidPointEfficiency,
    #[error("target_start must be >= 0")]
    InvalidTargetStart,
    #[error("target_t must be > 0")]
    InvalidTargetT,
    #[error("target_f must be > 0 and <= sample_rate / 2")]
    InvalidTargetF,
}

/// Parameters governing spectrogram, peak-finding, and hashing behavior.
///
/// Construct with [`FingerprintConfig::default`] and adjust with the `with_*`
/// builders; call [`validate`](Self::validate) before use (the pipeline does
/// this for you).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerprintConfig {
    pub sample_rate: u32,
    pub fft_window_size: f32,
    pub peak_box_size: usize,
    pub point_efficiency: f32,
    pub target_start: f32,
    pub target_t: f32,
    pub target_f: f32,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            fft_window_size: DEFAULT_FFT_WINDOW_SIZE,
            peak_box_size: DEFAULT_PEAK_BOX_SIZE,
            point_efficiency: DEFAULT_POINT_EFFICIENCY,
            target_start: DEFAULT_TARGET_START,
            target_t: DEFAULT_TARGET_T,
            target_f: DEFAULT_TARGET_F,
        }
    }
}

impl FingerprintConfig {
    pub fn with_sample_rate(mut self, v: u32) -> Self {
        self.sample_rate = v;
        self
    }

    pub fn with_fft_window_size(mut self, v: f32) -> Self {
        self.fft_window_size = v;
        self
    }

    pub fn with_peak_box_size(mut self, v: usize) -> Self {
        self.peak_box_size = v;
        self
    }

    pub fn with_point_efficiency(mut self, v: f32) -> Self {
        self.point_efficiency = v;
        self
    }

    pub fn with_target_start(mut self, v: f32) -> Self {
        self.target_start = v;
        self
    }

    pub fn with_target_t(mut self, v: f32) -> Self {
        self.target_t = v;
        self
    }

    pub fn with_target_f(mut self, v: f32) -> Self {
        self.target_f = v;
        self
    }

    /// Window length in samples: `round(sample_rate * fft_window_size)`.
    pub fn nperseg(&self) -> usize {
        (self.sample_rate as f32 * self.fft_window_size).round() as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate);
        }
        if self.fft_window_size <= 0.0 {
            return Err(ConfigError::InvalidFftWindowSize);
        }
        if self.peak_box_size < 3 {
            return Err(ConfigError::InvalidPeakBoxSize);
        }
        if self.point_efficiency <= 0.0 || self.point_efficiency > 1.0 {
            return Err(ConfigError::InvalidPointEfficiency);
        }
        if self.target_start < 0.0 {
            return Err(ConfigError::InvalidTargetStart);
        }
        if self.target_t <= 0.0 {
            return Err(ConfigError::InvalidTargetT);
        }
        if self.target_f <= 0.0 || self.target_f > self.sample_rate as f32 / 2.0 {
            return Err(ConfigError::InvalidTargetF);
        }
        Ok(())
    }
}
