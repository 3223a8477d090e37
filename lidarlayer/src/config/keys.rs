//! Addressable configuration keys.
//!
//! Every setting is reachable as `section.key`, which is what the
//! `config get|set|list` commands and the INI reader use.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use crate::backend::RasterProduct;

use super::error::ConfigError;
use super::file::ConfigFile;

/// A single configuration setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    BackendUrl,
    BackendTimeoutSecs,

    ProcessingQualityMode,
    ProcessingResolution,
    ProcessingMaskThreshold,
    ProcessingProducts,
    ProcessingHillshadeAzimuth,
    ProcessingHillshadeAltitude,
    ProcessingZFactor,

    OverlayMaxPixels,
    OverlayCompressionPixelThreshold,
    OverlayMaxEncodedBytes,
    OverlayMaxRetries,
    OverlayTimeoutMs,
    OverlayRetryBackoffMs,
    OverlayFallbackMaxWidth,
    OverlayFallbackMaxHeight,
    OverlayFallbackQuality,
    OverlayDefaultOpacity,
    OverlayFitBounds,

    LoggingLevel,
    LoggingFile,
}

const ALL_KEYS: &[ConfigKey] = &[
    ConfigKey::BackendUrl,
    ConfigKey::BackendTimeoutSecs,
    ConfigKey::ProcessingQualityMode,
    ConfigKey::ProcessingResolution,
    ConfigKey::ProcessingMaskThreshold,
    ConfigKey::ProcessingProducts,
    ConfigKey::ProcessingHillshadeAzimuth,
    ConfigKey::ProcessingHillshadeAltitude,
    ConfigKey::ProcessingZFactor,
    ConfigKey::OverlayMaxPixels,
    ConfigKey::OverlayCompressionPixelThreshold,
    ConfigKey::OverlayMaxEncodedBytes,
    ConfigKey::OverlayMaxRetries,
    ConfigKey::OverlayTimeoutMs,
    ConfigKey::OverlayRetryBackoffMs,
    ConfigKey::OverlayFallbackMaxWidth,
    ConfigKey::OverlayFallbackMaxHeight,
    ConfigKey::OverlayFallbackQuality,
    ConfigKey::OverlayDefaultOpacity,
    ConfigKey::OverlayFitBounds,
    ConfigKey::LoggingLevel,
    ConfigKey::LoggingFile,
];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl ConfigKey {
    /// Every key, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        ALL_KEYS
    }

    pub fn section(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            BackendUrl | BackendTimeoutSecs => "backend",
            ProcessingQualityMode
            | ProcessingResolution
            | ProcessingMaskThreshold
            | ProcessingProducts
            | ProcessingHillshadeAzimuth
            | ProcessingHillshadeAltitude
            | ProcessingZFactor => "processing",
            LoggingLevel | LoggingFile => "logging",
            _ => "overlay",
        }
    }

    pub fn key_name(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            BackendUrl => "url",
            BackendTimeoutSecs => "timeout_secs",
            ProcessingQualityMode => "quality_mode",
            ProcessingResolution => "resolution",
            ProcessingMaskThreshold => "mask_threshold",
            ProcessingProducts => "products",
            ProcessingHillshadeAzimuth => "hillshade_azimuth",
            ProcessingHillshadeAltitude => "hillshade_altitude",
            ProcessingZFactor => "z_factor",
            OverlayMaxPixels => "max_pixels",
            OverlayCompressionPixelThreshold => "compression_pixel_threshold",
            OverlayMaxEncodedBytes => "max_encoded_bytes",
            OverlayMaxRetries => "max_retries",
            OverlayTimeoutMs => "timeout_ms",
            OverlayRetryBackoffMs => "retry_backoff_ms",
            OverlayFallbackMaxWidth => "fallback_max_width",
            OverlayFallbackMaxHeight => "fallback_max_height",
            OverlayFallbackQuality => "fallback_quality",
            OverlayDefaultOpacity => "default_opacity",
            OverlayFitBounds => "fit_bounds",
            LoggingLevel => "level",
            LoggingFile => "file",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as text; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        use ConfigKey::*;
        match self {
            BackendUrl => config.backend.url.clone(),
            BackendTimeoutSecs => config.backend.timeout_secs.to_string(),
            ProcessingQualityMode => config.processing.quality_mode.to_string(),
            ProcessingResolution => config.processing.resolution.to_string(),
            ProcessingMaskThreshold => config.processing.mask_threshold.to_string(),
            ProcessingProducts => config
                .processing
                .products
                .iter()
                .map(|p| p.id())
                .collect::<Vec<_>>()
                .join(","),
            ProcessingHillshadeAzimuth => config.processing.hillshade_azimuth.to_string(),
            ProcessingHillshadeAltitude => config.processing.hillshade_altitude.to_string(),
            ProcessingZFactor => config.processing.z_factor.to_string(),
            OverlayMaxPixels => config.overlay.max_pixels.to_string(),
            OverlayCompressionPixelThreshold => {
                config.overlay.compression_pixel_threshold.to_string()
            }
            OverlayMaxEncodedBytes => config.overlay.max_encoded_bytes.to_string(),
            OverlayMaxRetries => config.overlay.max_retries.to_string(),
            OverlayTimeoutMs => config.overlay.timeout_ms.to_string(),
            OverlayRetryBackoffMs => config.overlay.retry_backoff_ms.to_string(),
            OverlayFallbackMaxWidth => config.overlay.fallback_max_width.to_string(),
            OverlayFallbackMaxHeight => config.overlay.fallback_max_height.to_string(),
            OverlayFallbackQuality => config.overlay.fallback_quality.to_string(),
            OverlayDefaultOpacity => config.overlay.default_opacity.to_string(),
            OverlayFitBounds => config.overlay.fit_bounds.to_string(),
            LoggingLevel => config.logging.level.clone(),
            LoggingFile => config
                .logging
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Parses and stores a value.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        use ConfigKey::*;
        let value = value.trim();
        match self {
            BackendUrl => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(self.invalid(value, "expected an http(s) URL"));
                }
                config.backend.url = value.trim_end_matches('/').to_string();
            }
            BackendTimeoutSecs => config.backend.timeout_secs = self.positive(value)?,
            ProcessingQualityMode => config.processing.quality_mode = self.parse_bool(value)?,
            ProcessingResolution => config.processing.resolution = self.positive_f64(value)?,
            ProcessingMaskThreshold => {
                config.processing.mask_threshold = self.ranged_f64(value, 0.0, 1.0)?
            }
            ProcessingProducts => config.processing.products = self.parse_products(value)?,
            ProcessingHillshadeAzimuth => {
                config.processing.hillshade_azimuth = self.ranged_f64(value, 0.0, 360.0)?
            }
            ProcessingHillshadeAltitude => {
                config.processing.hillshade_altitude = self.ranged_f64(value, 0.0, 90.0)?
            }
            ProcessingZFactor => config.processing.z_factor = self.positive_f64(value)?,
            OverlayMaxPixels => config.overlay.max_pixels = self.positive(value)?,
            OverlayCompressionPixelThreshold => {
                config.overlay.compression_pixel_threshold = self.positive(value)?
            }
            OverlayMaxEncodedBytes => config.overlay.max_encoded_bytes = self.positive(value)?,
            OverlayMaxRetries => config.overlay.max_retries = self.positive(value)?,
            OverlayTimeoutMs => config.overlay.timeout_ms = self.positive(value)?,
            OverlayRetryBackoffMs => config.overlay.retry_backoff_ms = self.parse(value)?,
            OverlayFallbackMaxWidth => config.overlay.fallback_max_width = self.positive(value)?,
            OverlayFallbackMaxHeight => {
                config.overlay.fallback_max_height = self.positive(value)?
            }
            OverlayFallbackQuality => {
                let quality: u8 = self.parse(value)?;
                if !(1..=100).contains(&quality) {
                    return Err(self.invalid(value, "expected 1-100"));
                }
                config.overlay.fallback_quality = quality;
            }
            OverlayDefaultOpacity => {
                config.overlay.default_opacity = self.ranged_f64(value, 0.0, 1.0)?
            }
            OverlayFitBounds => config.overlay.fit_bounds = self.parse_bool(value)?,
            LoggingLevel => {
                let level = value.to_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(self.invalid(value, "expected trace, debug, info, warn or error"));
                }
                config.logging.level = level;
            }
            LoggingFile => {
                config.logging.file = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                }
            }
        }
        Ok(())
    }

    fn invalid(&self, value: &str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    fn parse<T>(&self, value: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        value
            .parse()
            .map_err(|e: T::Err| self.invalid(value, e.to_string()))
    }

    fn positive<T>(&self, value: &str) -> Result<T, ConfigError>
    where
        T: FromStr + PartialOrd + Default,
        T::Err: Display,
    {
        let parsed: T = self.parse(value)?;
        if parsed <= T::default() {
            return Err(self.invalid(value, "must be greater than zero"));
        }
        Ok(parsed)
    }

    fn positive_f64(&self, value: &str) -> Result<f64, ConfigError> {
        let parsed: f64 = self.parse(value)?;
        if !parsed.is_finite() || parsed <= 0.0 {
            return Err(self.invalid(value, "must be a positive number"));
        }
        Ok(parsed)
    }

    fn ranged_f64(&self, value: &str, min: f64, max: f64) -> Result<f64, ConfigError> {
        let parsed: f64 = self.parse(value)?;
        if !(min..=max).contains(&parsed) {
            return Err(self.invalid(value, format!("expected {} to {}", min, max)));
        }
        Ok(parsed)
    }

    fn parse_bool(&self, value: &str) -> Result<bool, ConfigError> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(self.invalid(value, "expected true or false")),
        }
    }

    fn parse_products(&self, value: &str) -> Result<Vec<RasterProduct>, ConfigError> {
        let mut products = Vec::new();
        for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let product: RasterProduct = part.parse().map_err(|e: String| self.invalid(value, e))?;
            if !products.contains(&product) {
                products.push(product);
            }
        }
        Ok(products)
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ALL_KEYS
            .iter()
            .copied()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}
