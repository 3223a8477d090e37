//! Memory-safe overlay presentation.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::descriptor::{clamp_opacity, ImageSource, OverlayDescriptor, PresentOptions};
use super::error::OverlayError;
use super::store::{ActiveOverlay, OverlayStore};
use super::surface::{process_memory_bytes, LayerId, MapSurface};
use crate::geo::GeoBounds;
use crate::notify::{NotificationLevel, Notifier};
use crate::optimizer::{read_dimensions, ImageOptimizer, OptimizationProfile};
use crate::validation::{
    spawn_decode_probe, strip_data_url, BoundsValidator, ImagePayloadValidator,
    MAX_PLAUSIBLE_ENCODED_BYTES,
};

/// Base64 characters decoded when sniffing dimensions from a payload header.
const HEADER_PROBE_CHARS: usize = 64 * 1024;

/// Presents raster overlays on a [`MapSurface`].
///
/// The engine is the only writer of its [`OverlayStore`]. Presenting a key
/// tears down whatever was shown under it first, and installing a result
/// replaces (and removes from the surface) anything a concurrent call for
/// the same key installed meanwhile, so a key never has two live layers.
pub struct OverlayRenderingEngine {
    store: Arc<OverlayStore>,
    surface: Arc<dyn MapSurface>,
    notifier: Arc<dyn Notifier>,
    optimizer: ImageOptimizer,
}

impl OverlayRenderingEngine {
    pub fn new(
        store: Arc<OverlayStore>,
        surface: Arc<dyn MapSurface>,
        notifier: Arc<dyn Notifier>,
        profile: OptimizationProfile,
    ) -> Self {
        Self {
            store,
            surface,
            notifier,
            optimizer: ImageOptimizer::new(profile),
        }
    }

    pub fn store(&self) -> &Arc<OverlayStore> {
        &self.store
    }

    pub fn profile(&self) -> &OptimizationProfile {
        self.optimizer.profile()
    }

    /// Forwards a message to the engine's notifier.
    pub fn notify(&self, level: NotificationLevel, message: &str) {
        self.notifier.notify(level, message);
    }

    /// Presents an overlay, notifying the user on failure.
    ///
    /// Returns `true` once the overlay is live on the surface.
    pub async fn present(
        &self,
        key: &str,
        image: ImageSource,
        bounds: &GeoBounds,
        options: &PresentOptions,
    ) -> bool {
        match self.try_present(key, image, bounds, options).await {
            Ok(_) => true,
            Err(e) => {
                error!(overlay = key, error = %e, "Overlay presentation failed");
                self.notifier.notify(NotificationLevel::Error, &e.to_string());
                false
            }
        }
    }

    /// Presents an overlay whose bounds arrive as backend JSON.
    ///
    /// Structurally malformed bounds are a caller error and are returned
    /// rather than notified.
    pub async fn present_json(
        &self,
        key: &str,
        image: ImageSource,
        bounds: &Value,
        options: &PresentOptions,
    ) -> Result<bool, OverlayError> {
        let bounds = BoundsValidator::parse_json(bounds).map_err(OverlayError::MalformedBounds)?;
        Ok(self.present(key, image, &bounds, options).await)
    }

    /// Presents an overlay, returning the surface layer or the reason it failed.
    pub async fn try_present(
        &self,
        key: &str,
        image: ImageSource,
        bounds: &GeoBounds,
        options: &PresentOptions,
    ) -> Result<LayerId, OverlayError> {
        let label = options.label.clone().unwrap_or_else(|| key.to_string());

        self.remove(key);

        let report = BoundsValidator::validate(bounds);
        if !report.valid {
            return Err(OverlayError::InvalidBounds {
                label,
                reason: report.errors.join("; "),
            });
        }
        for warning in &report.warnings {
            warn!(overlay = key, "{}", warning);
        }

        let image = match image {
            ImageSource::Embedded(payload) => {
                ImageSource::Embedded(self.prepare_payload(key, &label, payload, options).await?)
            }
            url => url,
        };

        let descriptor = OverlayDescriptor {
            key: key.to_string(),
            bounds: *bounds,
            image,
            opacity: clamp_opacity(options.opacity),
            visible: options.visible,
        };

        let layer = self.construct(&descriptor, &label).await?;

        if let Some(superseded) = self.store.insert(ActiveOverlay { descriptor, layer }) {
            debug!(overlay = key, "Replacing overlay installed concurrently");
            self.surface.remove_overlay(superseded.layer);
        }

        if options.fit_bounds {
            self.surface.fit_bounds(bounds);
        }

        info!(overlay = key, layer = layer.0, "Overlay displayed");
        Ok(layer)
    }

    /// Validates and, when over budget, optimizes an embedded payload.
    async fn prepare_payload(
        &self,
        key: &str,
        label: &str,
        payload: String,
        options: &PresentOptions,
    ) -> Result<String, OverlayError> {
        let report = ImagePayloadValidator::validate(&payload);
        if !report.valid {
            return Err(OverlayError::InvalidPayload {
                label: label.to_string(),
                reason: report.errors.join("; "),
            });
        }
        for warning in &report.warnings {
            warn!(overlay = key, "{}", warning);
        }

        if options.probe_decode && report.info.encoded_len <= MAX_PLAUSIBLE_ENCODED_BYTES {
            spawn_decode_probe(key.to_string(), payload.clone());
        }

        let dims = probe_dimensions(&payload);
        if !self
            .optimizer
            .needs_optimization(report.info.encoded_len, dims)
        {
            return Ok(payload);
        }

        debug!(
            overlay = key,
            encoded_len = report.info.encoded_len,
            dims = ?dims,
            "Overlay image exceeds limits, optimizing"
        );
        match self.optimizer.optimize(&payload).await {
            Ok(optimized) => Ok(optimized.payload),
            Err(e) => {
                warn!(overlay = key, error = %e, "Optimization failed, using original image");
                self.notifier.notify(
                    NotificationLevel::Warning,
                    &format!(
                        "{} image could not be optimized and may load slowly",
                        label
                    ),
                );
                Ok(payload)
            }
        }
    }

    /// Adds the layer with a per-attempt timeout and linear backoff.
    async fn construct(
        &self,
        descriptor: &OverlayDescriptor,
        label: &str,
    ) -> Result<LayerId, OverlayError> {
        let profile = self.optimizer.profile();
        let attempts = profile.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let memory_before = self.memory_bytes();

            match tokio::time::timeout(profile.timeout, self.surface.add_image_overlay(descriptor))
                .await
            {
                Ok(Ok(layer)) => {
                    if let (Some(before), Some(after)) = (memory_before, self.memory_bytes()) {
                        debug!(
                            overlay = %descriptor.key,
                            memory_before = before,
                            memory_after = after,
                            delta = after as i64 - before as i64,
                            "Overlay memory"
                        );
                    }
                    return Ok(layer);
                }
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => {
                    last_error = format!("timed out after {}ms", profile.timeout.as_millis())
                }
            }

            warn!(
                overlay = %descriptor.key,
                attempt,
                max_attempts = attempts,
                error = %last_error,
                "Overlay construction attempt failed"
            );

            if attempt < attempts {
                tokio::time::sleep(profile.backoff_for_attempt(attempt)).await;
            }
        }

        Err(OverlayError::ConstructionFailed {
            label: label.to_string(),
            attempts,
            reason: last_error,
        })
    }

    fn memory_bytes(&self) -> Option<u64> {
        self.surface
            .memory_usage_bytes()
            .or_else(process_memory_bytes)
    }

    /// Removes an overlay. Returns whether one was present.
    pub fn remove(&self, key: &str) -> bool {
        match self.store.remove(key) {
            Some(active) => {
                self.surface.remove_overlay(active.layer);
                debug!(overlay = key, "Overlay removed");
                true
            }
            None => false,
        }
    }

    /// Sets an overlay's opacity, clamped to [0, 1].
    pub fn set_opacity(&self, key: &str, opacity: f64) -> bool {
        let opacity = clamp_opacity(opacity);
        match self.store.update(key, |d| d.opacity = opacity) {
            Some(layer) => {
                self.surface.set_opacity(layer, opacity);
                true
            }
            None => false,
        }
    }

    pub fn set_visible(&self, key: &str, visible: bool) -> bool {
        match self.store.update(key, |d| d.visible = visible) {
            Some(layer) => {
                self.surface.set_visible(layer, visible);
                true
            }
            None => false,
        }
    }

    /// Removes every overlay.
    pub fn clear(&self) {
        for active in self.store.drain() {
            self.surface.remove_overlay(active.layer);
        }
    }

    pub fn active_keys(&self) -> Vec<String> {
        self.store.keys()
    }
}

/// Reads pixel dimensions from the start of a base64 payload.
///
/// Only a bounded prefix is decoded; formats whose header lies deeper
/// yield `None`.
fn probe_dimensions(payload: &str) -> Option<(u32, u32)> {
    let encoded = strip_data_url(payload).trim();
    let take = encoded.len().min(HEADER_PROBE_CHARS) / 4 * 4;
    let prefix = encoded.get(..take)?;
    let bytes = STANDARD.decode(prefix).ok()?;
    read_dimensions(&bytes).ok()
}
