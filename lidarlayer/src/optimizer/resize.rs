//! Downscaling and recompression of oversized overlay images.

use std::io::Cursor;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, Limits};
use tracing::{debug, info, warn};

use super::error::OptimizeError;
use super::profile::OptimizationProfile;
use crate::validation::ImageFormat;

/// A single pass never shrinks an edge below this fraction.
pub const MIN_SCALE: f64 = 0.25;

/// Output edges are never shorter than this, unless the source already is.
pub const MIN_DIMENSION: u32 = 256;

/// Why an image was selected for optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizeTrigger {
    /// Encoded size above `max_encoded_byte_size`.
    EncodedSizeExceeded,
    /// Encoded size above a third of `max_encoded_byte_size`.
    EncodedSizeElevated,
    /// Pixel count above `max_pixels`.
    PixelsExceeded,
    /// Pixel count above `compression_pixel_threshold`.
    PixelsAboveCompressionThreshold,
}

/// Sizing decision for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizePlan {
    pub original: (u32, u32),
    pub target: (u32, u32),
    /// Linear scale before the dimension caps were applied.
    pub scale: f64,
    pub triggers: Vec<OptimizeTrigger>,
}

impl ResizePlan {
    /// True if any threshold was crossed.
    pub fn is_needed(&self) -> bool {
        !self.triggers.is_empty()
    }
}

/// Result of a successful optimization.
#[derive(Debug, Clone)]
pub struct OptimizedImage {
    /// Base64 payload: the re-encoded image, or the input when nothing was done.
    pub payload: String,
    pub format: ImageFormat,
    pub original_dims: (u32, u32),
    pub new_dims: (u32, u32),
    /// New encoded length divided by original encoded length.
    pub compression_ratio: f64,
    pub elapsed: Duration,
    /// False when the input was already within limits.
    pub changed: bool,
}

/// Produces downscaled, recompressed versions of oversized images.
#[derive(Debug, Clone, Default)]
pub struct ImageOptimizer {
    profile: OptimizationProfile,
}

impl ImageOptimizer {
    /// Creates an optimizer bound to a profile.
    pub fn new(profile: OptimizationProfile) -> Self {
        Self { profile }
    }

    /// The profile limits in effect.
    pub fn profile(&self) -> &OptimizationProfile {
        &self.profile
    }

    /// Which thresholds an image crosses.
    ///
    /// `dims` may be unknown when the caller could not read the header; in
    /// that case only the encoded size is considered.
    pub fn triggers(&self, encoded_len: usize, dims: Option<(u32, u32)>) -> Vec<OptimizeTrigger> {
        let p = &self.profile;
        let mut triggers = Vec::new();
        if encoded_len > p.max_encoded_byte_size {
            triggers.push(OptimizeTrigger::EncodedSizeExceeded);
        } else if encoded_len > p.max_encoded_byte_size / 3 {
            triggers.push(OptimizeTrigger::EncodedSizeElevated);
        }
        if let Some((width, height)) = dims {
            let pixels = width as u64 * height as u64;
            if pixels > p.max_pixels {
                triggers.push(OptimizeTrigger::PixelsExceeded);
            } else if pixels > p.compression_pixel_threshold {
                triggers.push(OptimizeTrigger::PixelsAboveCompressionThreshold);
            }
        }
        triggers
    }

    /// Convenience wrapper over [`Self::triggers`].
    pub fn needs_optimization(&self, encoded_len: usize, dims: Option<(u32, u32)>) -> bool {
        !self.triggers(encoded_len, dims).is_empty()
    }

    /// Computes target dimensions for an image without touching pixels.
    pub fn plan(&self, width: u32, height: u32, encoded_len: usize) -> ResizePlan {
        let p = &self.profile;
        let triggers = self.triggers(encoded_len, Some((width, height)));
        if triggers.is_empty() || width == 0 || height == 0 {
            return ResizePlan {
                original: (width, height),
                target: (width, height),
                scale: 1.0,
                triggers,
            };
        }

        let pixels = width as u64 * height as u64;
        let budget = if pixels > p.max_pixels {
            p.max_pixels
        } else {
            p.compression_pixel_threshold
        };
        // Byte-size triggers alone recompress at full size.
        let scale = (budget as f64 / pixels as f64).sqrt().clamp(MIN_SCALE, 1.0);

        let mut target_w = ((width as f64 * scale).floor() as u64).max(1);
        let mut target_h = ((height as f64 * scale).floor() as u64).max(1);

        let cap_w = p.fallback_max_width as u64;
        let cap_h = p.fallback_max_height as u64;
        if target_w > cap_w || target_h > cap_h {
            if target_w * cap_h >= target_h * cap_w {
                target_h = target_h * cap_w / target_w;
                target_w = cap_w;
            } else {
                target_w = target_w * cap_h / target_h;
                target_h = cap_h;
            }
        }

        let target_w = (target_w as u32).max(MIN_DIMENSION.min(width));
        let target_h = (target_h as u32).max(MIN_DIMENSION.min(height));

        ResizePlan {
            original: (width, height),
            target: (target_w, target_h),
            scale,
            triggers,
        }
    }

    /// Optimizes a base64 payload, returning it unchanged if within limits.
    ///
    /// Decoding, resampling and encoding run on a blocking worker.
    pub async fn optimize(&self, payload: &str) -> Result<OptimizedImage, OptimizeError> {
        self.profile.validate()?;
        let encoded = crate::validation::strip_data_url(payload).trim().to_string();
        let optimizer = self.clone();
        tokio::task::spawn_blocking(move || optimizer.optimize_blocking(&encoded))
            .await
            .map_err(|e| OptimizeError::Worker(e.to_string()))?
    }

    fn optimize_blocking(&self, encoded: &str) -> Result<OptimizedImage, OptimizeError> {
        let start = Instant::now();
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| OptimizeError::InvalidEncoding(e.to_string()))?;

        let (width, height) = read_dimensions(&bytes)?;
        let plan = self.plan(width, height, encoded.len());

        if !plan.is_needed() {
            debug!(width, height, "Image within limits, skipping optimization");
            return Ok(OptimizedImage {
                payload: encoded.to_string(),
                format: ImageFormat::sniff(encoded),
                original_dims: (width, height),
                new_dims: (width, height),
                compression_ratio: 1.0,
                elapsed: start.elapsed(),
                changed: false,
            });
        }

        debug!(
            width,
            height,
            target_width = plan.target.0,
            target_height = plan.target.1,
            scale = plan.scale,
            triggers = ?plan.triggers,
            "Optimizing overlay image"
        );

        let image = self.decode(&bytes)?;
        drop(bytes);

        let (target_w, target_h) = plan.target;
        let resized = resample(image, target_w, target_h);

        let (out, format) = self.encode(&resized)?;
        let payload = STANDARD.encode(out);
        let compression_ratio = payload.len() as f64 / encoded.len().max(1) as f64;
        let elapsed = start.elapsed();

        info!(
            from = %format!("{}x{}", width, height),
            to = %format!("{}x{}", target_w, target_h),
            ratio = %format!("{:.3}", compression_ratio),
            elapsed_ms = elapsed.as_millis() as u64,
            "Overlay image optimized"
        );

        Ok(OptimizedImage {
            payload,
            format,
            original_dims: (width, height),
            new_dims: (target_w, target_h),
            compression_ratio,
            elapsed,
            changed: true,
        })
    }

    /// Decodes under the profile's allocation ceiling instead of the
    /// decoder's default, which is far below a full-resolution scene.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, OptimizeError> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| OptimizeError::DecodeFailed(e.to_string()))?;
        let mut limits = Limits::default();
        limits.max_alloc = Some(self.profile.max_decode_bytes);
        reader.limits(limits);
        reader
            .decode()
            .map_err(|e| OptimizeError::DecodeFailed(e.to_string()))
    }

    /// Encodes as PNG, falling back to JPEG at the profile's quality.
    fn encode(&self, image: &DynamicImage) -> Result<(Vec<u8>, ImageFormat), OptimizeError> {
        let mut png = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut png, CompressionType::Best, PngFilter::Adaptive);
        match image.write_with_encoder(encoder) {
            Ok(()) => return Ok((png, ImageFormat::Png)),
            Err(e) => warn!(error = %e, "PNG encoding failed, falling back to JPEG"),
        }

        let mut jpeg = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut jpeg, self.profile.fallback_quality);
        DynamicImage::ImageRgb8(image.to_rgb8())
            .write_with_encoder(encoder)
            .map_err(|e| OptimizeError::EncodeFailed(e.to_string()))?;
        Ok((jpeg, ImageFormat::Jpeg))
    }
}

/// Resamples to the target with Lanczos3.
///
/// Sources more than twice the target on both axes are box-filtered down to
/// twice the target first, so the Lanczos3 pass never buffers the full
/// source as floats.
fn resample(image: DynamicImage, target_w: u32, target_h: u32) -> DynamicImage {
    if (image.width(), image.height()) == (target_w, target_h) {
        return image;
    }
    let (stage_w, stage_h) = (target_w.saturating_mul(2), target_h.saturating_mul(2));
    let image = if image.width() > stage_w && image.height() > stage_h {
        let staged = image.thumbnail_exact(stage_w, stage_h);
        drop(image);
        staged
    } else {
        image
    };
    image.resize_exact(target_w, target_h, FilterType::Lanczos3)
}

/// Reads image dimensions from the header without decoding pixels.
pub fn read_dimensions(bytes: &[u8]) -> Result<(u32, u32), OptimizeError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| OptimizeError::DecodeFailed(e.to_string()))?
        .into_dimensions()
        .map_err(|e| OptimizeError::DecodeFailed(e.to_string()))
}
