//! The INI configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use tracing::debug;

use crate::backend::{BackendConfig, HillshadeParams, RasterProduct};
use crate::backend::{DEFAULT_BACKEND_TIMEOUT_SECS, DEFAULT_BACKEND_URL};
use crate::logging::LoggingConfig;
use crate::optimizer::OptimizationProfile;
use crate::overlay::PresentOptions;
use crate::processing::{ProcessingOptions, DEFAULT_MASK_THRESHOLD, DEFAULT_RESOLUTION};

use super::error::ConfigError;
use super::keys::ConfigKey;

/// `[backend]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSettings {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
            timeout_secs: DEFAULT_BACKEND_TIMEOUT_SECS,
        }
    }
}

/// `[processing]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingSettings {
    pub quality_mode: bool,
    pub resolution: f64,
    pub mask_threshold: f64,
    pub products: Vec<RasterProduct>,
    pub hillshade_azimuth: f64,
    pub hillshade_altitude: f64,
    pub z_factor: f64,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        let hillshade = HillshadeParams::default();
        Self {
            quality_mode: true,
            resolution: DEFAULT_RESOLUTION,
            mask_threshold: DEFAULT_MASK_THRESHOLD,
            products: RasterProduct::all().to_vec(),
            hillshade_azimuth: hillshade.azimuth,
            hillshade_altitude: hillshade.altitude,
            z_factor: hillshade.z_factor,
        }
    }
}

/// `[overlay]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySettings {
    pub max_pixels: u64,
    pub compression_pixel_threshold: u64,
    pub max_encoded_bytes: usize,
    pub max_retries: u32,
    pub timeout_ms: u64,
    pub retry_backoff_ms: u64,
    pub fallback_max_width: u32,
    pub fallback_max_height: u32,
    pub fallback_quality: u8,
    pub default_opacity: f64,
    pub fit_bounds: bool,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        let profile = OptimizationProfile::default();
        let present = PresentOptions::default();
        Self {
            max_pixels: profile.max_pixels,
            compression_pixel_threshold: profile.compression_pixel_threshold,
            max_encoded_bytes: profile.max_encoded_byte_size,
            max_retries: profile.max_retries,
            timeout_ms: profile.timeout.as_millis() as u64,
            retry_backoff_ms: profile.retry_backoff_step.as_millis() as u64,
            fallback_max_width: profile.fallback_max_width,
            fallback_max_height: profile.fallback_max_height,
            fallback_quality: profile.fallback_quality,
            default_opacity: present.opacity,
            fit_bounds: present.fit_bounds,
        }
    }
}

/// Typed view of `config.ini`.
///
/// Missing files and missing keys fall back to defaults; present but
/// unparseable values are errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub backend: BackendSettings,
    pub processing: ProcessingSettings,
    pub overlay: OverlaySettings,
    pub logging: LoggingConfig,
}

/// Default location of the configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lidarlayer")
        .join("config.ini")
}

impl ConfigFile {
    /// Loads from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut config = Self::default();
        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|props| props.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Saves to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |reason: String| ConfigError::Write {
            path: path.display().to_string(),
            reason,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }
        ini.write_to_file(path)
            .map_err(|e| write_error(e.to_string()))
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig::new(self.backend.url.clone())
            .with_timeout(Duration::from_secs(self.backend.timeout_secs))
    }

    pub fn optimization_profile(&self) -> OptimizationProfile {
        let overlay = &self.overlay;
        OptimizationProfile::default()
            .with_max_pixels(overlay.max_pixels)
            .with_compression_pixel_threshold(overlay.compression_pixel_threshold)
            .with_max_encoded_byte_size(overlay.max_encoded_bytes)
            .with_max_retries(overlay.max_retries)
            .with_timeout(Duration::from_millis(overlay.timeout_ms))
            .with_retry_backoff_step(Duration::from_millis(overlay.retry_backoff_ms))
            .with_fallback_max_dimensions(overlay.fallback_max_width, overlay.fallback_max_height)
            .with_fallback_quality(overlay.fallback_quality)
    }

    pub fn processing_options(&self) -> ProcessingOptions {
        let processing = &self.processing;
        ProcessingOptions::default()
            .with_quality_mode(processing.quality_mode)
            .with_products(processing.products.clone())
            .with_resolution(processing.resolution)
            .with_mask_threshold(processing.mask_threshold)
            .with_hillshade(HillshadeParams {
                azimuth: processing.hillshade_azimuth,
                altitude: processing.hillshade_altitude,
                z_factor: processing.z_factor,
            })
    }

    pub fn present_options(&self) -> PresentOptions {
        PresentOptions::default()
            .with_opacity(self.overlay.default_opacity)
            .with_fit_bounds(self.overlay.fit_bounds)
    }
}
