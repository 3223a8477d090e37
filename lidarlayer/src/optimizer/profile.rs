//! Resource limits for overlay images.

use std::time::Duration;

use super::error::OptimizeError;

/// Default pixel ceiling (4096×4096).
pub const DEFAULT_MAX_PIXELS: u64 = 4096 * 4096;

/// Default pixel count above which images are recompressed (2048×2048).
pub const DEFAULT_COMPRESSION_PIXEL_THRESHOLD: u64 = 2048 * 2048;

/// Default encoded size ceiling (20 MiB).
pub const DEFAULT_MAX_ENCODED_BYTE_SIZE: usize = 20 * 1024 * 1024;

/// Default number of overlay construction attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default per-attempt construction timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default longest edge for optimized output.
pub const DEFAULT_FALLBACK_MAX_DIMENSION: u32 = 4096;

/// Default JPEG quality when PNG encoding fails.
pub const DEFAULT_FALLBACK_QUALITY: u8 = 85;

/// Default backoff increment between construction attempts.
pub const DEFAULT_RETRY_BACKOFF_STEP_MS: u64 = 1000;

/// Default allocation ceiling for decoding a source image (8 GiB).
///
/// Large enough for a 40,000×30,000 RGBA raster.
pub const DEFAULT_MAX_DECODE_BYTES: u64 = 8 * 1024 * 1024 * 1024;

/// Limits bounding the memory and time spent on a single overlay.
///
/// Built once from configuration and shared read-only by the optimizer and
/// the rendering engine.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationProfile {
    /// Images with more pixels than this are always downscaled.
    pub max_pixels: u64,

    /// Images with more pixels than this are downscaled toward this count.
    pub compression_pixel_threshold: u64,

    /// Encoded payloads larger than this (or a third of it) are optimized.
    pub max_encoded_byte_size: usize,

    /// Overlay construction attempts before giving up.
    pub max_retries: u32,

    /// Time allowed for one construction attempt.
    pub timeout: Duration,

    /// Output width cap.
    pub fallback_max_width: u32,

    /// Output height cap.
    pub fallback_max_height: u32,

    /// JPEG quality (1-100) used when lossless encoding fails.
    pub fallback_quality: u8,

    /// Backoff after attempt `n` is `n * retry_backoff_step`.
    pub retry_backoff_step: Duration,

    /// Most memory the decoder may allocate for one source image.
    pub max_decode_bytes: u64,
}

impl Default for OptimizationProfile {
    fn default() -> Self {
        Self {
            max_pixels: DEFAULT_MAX_PIXELS,
            compression_pixel_threshold: DEFAULT_COMPRESSION_PIXEL_THRESHOLD,
            max_encoded_byte_size: DEFAULT_MAX_ENCODED_BYTE_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            fallback_max_width: DEFAULT_FALLBACK_MAX_DIMENSION,
            fallback_max_height: DEFAULT_FALLBACK_MAX_DIMENSION,
            fallback_quality: DEFAULT_FALLBACK_QUALITY,
            retry_backoff_step: Duration::from_millis(DEFAULT_RETRY_BACKOFF_STEP_MS),
            max_decode_bytes: DEFAULT_MAX_DECODE_BYTES,
        }
    }
}

impl OptimizationProfile {
    /// Set the pixel ceiling.
    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    /// Set the recompression threshold.
    pub fn with_compression_pixel_threshold(mut self, threshold: u64) -> Self {
        self.compression_pixel_threshold = threshold;
        self
    }

    /// Set the encoded size ceiling.
    pub fn with_max_encoded_byte_size(mut self, bytes: usize) -> Self {
        self.max_encoded_byte_size = bytes;
        self
    }

    /// Set the number of construction attempts.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the output dimension caps.
    pub fn with_fallback_max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.fallback_max_width = width;
        self.fallback_max_height = height;
        self
    }

    /// Set the lossy fallback quality.
    pub fn with_fallback_quality(mut self, quality: u8) -> Self {
        self.fallback_quality = quality;
        self
    }

    /// Set the backoff increment.
    pub fn with_retry_backoff_step(mut self, step: Duration) -> Self {
        self.retry_backoff_step = step;
        self
    }

    /// Set the decoder allocation ceiling.
    pub fn with_max_decode_bytes(mut self, bytes: u64) -> Self {
        self.max_decode_bytes = bytes;
        self
    }

    /// Delay to wait after a failed attempt (1-based).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        self.retry_backoff_step * attempt
    }

    /// Rejects limits that would make every image degenerate.
    pub fn validate(&self) -> Result<(), OptimizeError> {
        let zero = [
            ("max_pixels", self.max_pixels == 0),
            (
                "compression_pixel_threshold",
                self.compression_pixel_threshold == 0,
            ),
            ("max_encoded_byte_size", self.max_encoded_byte_size == 0),
            ("max_retries", self.max_retries == 0),
            ("fallback_max_width", self.fallback_max_width == 0),
            ("fallback_max_height", self.fallback_max_height == 0),
            ("max_decode_bytes", self.max_decode_bytes == 0),
        ];
        if let Some((name, _)) = zero.iter().find(|(_, is_zero)| *is_zero) {
            return Err(OptimizeError::InvalidProfile(format!(
                "{} must be greater than zero",
                name
            )));
        }
        if !(1..=100).contains(&self.fallback_quality) {
            return Err(OptimizeError::InvalidProfile(format!(
                "fallback_quality {} outside 1..=100",
                self.fallback_quality
            )));
        }
        Ok(())
    }
}
