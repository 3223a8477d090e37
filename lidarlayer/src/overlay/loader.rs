//! Fetching finished raster products and presenting them.

use std::sync::Arc;

use tracing::{info, warn};

use super::descriptor::{ImageSource, PresentOptions};
use super::engine::OverlayRenderingEngine;
use super::error::OverlayError;
use crate::backend::{AsyncHttpClient, BackendClient, RasterProduct};
use crate::notify::NotificationLevel;

/// Loads backend raster products onto the map.
pub struct OverlayLoader<C> {
    client: Arc<BackendClient<C>>,
    engine: Arc<OverlayRenderingEngine>,
    options: PresentOptions,
}

impl<C: AsyncHttpClient> OverlayLoader<C> {
    pub fn new(client: Arc<BackendClient<C>>, engine: Arc<OverlayRenderingEngine>) -> Self {
        Self {
            client,
            engine,
            options: PresentOptions::default(),
        }
    }

    /// Sets the presentation options used for every product.
    pub fn with_options(mut self, options: PresentOptions) -> Self {
        self.options = options;
        self
    }

    pub fn engine(&self) -> &Arc<OverlayRenderingEngine> {
        &self.engine
    }

    /// Fetches one product and presents it under its overlay key.
    ///
    /// Returns `Ok(false)` when the engine rejected or failed to display the
    /// overlay (the user has already been notified).
    pub async fn load(&self, region: &str, product: RasterProduct) -> Result<bool, OverlayError> {
        let key = product.overlay_key(region);
        let data = self.client.overlay_data(region, product).await?;

        let image = data
            .image_data
            .filter(|d| !d.is_empty())
            .ok_or_else(|| OverlayError::MissingImage { key: key.clone() })?;
        let bounds = data
            .bounds
            .ok_or_else(|| OverlayError::MalformedBounds(format!("no bounds for {}", key)))?;

        let options = self.options.clone().with_label(product.display_name());
        self.engine
            .present_json(&key, ImageSource::Embedded(image), &bounds, &options)
            .await
    }

    /// Loads several products one after the other.
    ///
    /// Fetch failures are notified and reported per product; they never stop
    /// the remaining products from loading.
    pub async fn load_all(
        &self,
        region: &str,
        products: &[RasterProduct],
    ) -> Vec<(RasterProduct, Result<bool, OverlayError>)> {
        let mut results = Vec::with_capacity(products.len());
        for &product in products {
            let result = self.load(region, product).await;
            if let Err(e) = &result {
                warn!(region, product = product.id(), error = %e, "Overlay load failed");
                self.engine.notify(
                    NotificationLevel::Error,
                    &format!("{} overlay could not be loaded: {}", product.display_name(), e),
                );
            }
            results.push((product, result));
        }
        let shown = results.iter().filter(|(_, r)| matches!(r, Ok(true))).count();
        info!(region, shown, requested = products.len(), "Overlays loaded");
        results
    }
}
