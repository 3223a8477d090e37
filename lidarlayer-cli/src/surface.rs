//! Export directory map surface.
//!
//! Stands in for an interactive map: every overlay becomes an image file
//! plus a JSON sidecar with its bounds and styling, which GIS tools or a
//! web viewer can pick up.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use lidarlayer::geo::GeoBounds;
use lidarlayer::overlay::{
    process_memory_bytes, BoxFuture, ImageSource, LayerId, MapSurface, OverlayDescriptor,
    SurfaceError,
};
use lidarlayer::validation::{strip_data_url, ImageFormat};
use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct ExportedLayer {
    key: String,
    bounds: GeoBounds,
    opacity: f64,
    visible: bool,
    /// Written image, for embedded sources.
    image_path: Option<PathBuf>,
    url: Option<String>,
}

/// [`MapSurface`] that writes overlays to a directory.
pub struct ExportSurface {
    dir: PathBuf,
    next_id: AtomicU64,
    layers: Mutex<HashMap<LayerId, ExportedLayer>>,
    viewport: Mutex<Option<GeoBounds>>,
}

impl ExportSurface {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next_id: AtomicU64::new(1),
            layers: Mutex::new(HashMap::new()),
            viewport: Mutex::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Bounds of the last `fit_bounds` call.
    pub fn viewport(&self) -> Option<GeoBounds> {
        *self.viewport.lock()
    }

    fn sidecar_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn write_sidecar(&self, layer: &ExportedLayer) -> std::io::Result<()> {
        let image = layer
            .image_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string());
        let sidecar = json!({
            "key": layer.key,
            "bounds": layer.bounds.corners(),
            "opacity": layer.opacity,
            "visible": layer.visible,
            "image": image,
            "url": layer.url,
        });
        let text = serde_json::to_string_pretty(&sidecar).map_err(std::io::Error::other)?;
        std::fs::write(self.sidecar_path(&layer.key), text)
    }

    fn restyle(&self, layer: LayerId, apply: impl FnOnce(&mut ExportedLayer)) {
        let updated = {
            let mut layers = self.layers.lock();
            layers.get_mut(&layer).map(|entry| {
                apply(entry);
                entry.clone()
            })
        };
        if let Some(entry) = updated {
            if let Err(e) = self.write_sidecar(&entry) {
                warn!(key = %entry.key, error = %e, "Failed to update overlay sidecar");
            }
        }
    }

    async fn export(&self, overlay: &OverlayDescriptor) -> Result<LayerId, SurfaceError> {
        let (image_path, url) = match &overlay.image {
            ImageSource::Embedded(payload) => {
                let encoded = strip_data_url(payload).trim();
                let bytes = STANDARD
                    .decode(encoded)
                    .map_err(|e| SurfaceError::LoadFailed(e.to_string()))?;
                let extension = match ImageFormat::sniff(encoded) {
                    ImageFormat::Jpeg => "jpg",
                    _ => "png",
                };
                let path = self.dir.join(format!("{}.{}", overlay.key, extension));
                tokio::fs::write(&path, &bytes)
                    .await
                    .map_err(|e| SurfaceError::Rejected(format!("{}: {}", path.display(), e)))?;
                (Some(path), None)
            }
            ImageSource::Url(url) => (None, Some(url.clone())),
        };

        let layer = ExportedLayer {
            key: overlay.key.clone(),
            bounds: overlay.bounds,
            opacity: overlay.opacity,
            visible: overlay.visible,
            image_path,
            url,
        };
        self.write_sidecar(&layer)
            .map_err(|e| SurfaceError::Rejected(e.to_string()))?;

        let id = LayerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(key = %layer.key, layer = id.0, "Overlay exported");
        self.layers.lock().insert(id, layer);
        Ok(id)
    }
}

impl MapSurface for ExportSurface {
    fn add_image_overlay<'a>(
        &'a self,
        overlay: &'a OverlayDescriptor,
    ) -> BoxFuture<'a, Result<LayerId, SurfaceError>> {
        Box::pin(self.export(overlay))
    }

    fn remove_overlay(&self, layer: LayerId) {
        let (removed, key_still_live) = {
            let mut layers = self.layers.lock();
            let removed = layers.remove(&layer);
            let still_live = removed
                .as_ref()
                .is_some_and(|r| layers.values().any(|l| l.key == r.key));
            (removed, still_live)
        };
        let Some(removed) = removed else {
            return;
        };
        // Files are named by key; another live layer for the key owns them now.
        if key_still_live {
            return;
        }
        if let Some(path) = &removed.image_path {
            let _ = std::fs::remove_file(path);
        }
        let _ = std::fs::remove_file(self.sidecar_path(&removed.key));
        debug!(key = %removed.key, layer = layer.0, "Overlay files removed");
    }

    fn set_opacity(&self, layer: LayerId, opacity: f64) {
        self.restyle(layer, |l| l.opacity = opacity);
    }

    fn set_visible(&self, layer: LayerId, visible: bool) {
        self.restyle(layer, |l| l.visible = visible);
    }

    fn fit_bounds(&self, bounds: &GeoBounds) {
        *self.viewport.lock() = Some(*bounds);
    }

    fn memory_usage_bytes(&self) -> Option<u64> {
        process_memory_bytes()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use tempfile::TempDir;

    use super::*;

    // 1x1 transparent PNG.
    const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn descriptor(key: &str, image: ImageSource) -> OverlayDescriptor {
        OverlayDescriptor {
            key: key.to_string(),
            bounds: GeoBounds::new(42.90, -122.20, 42.96, -122.10),
            image,
            opacity: 0.7,
            visible: true,
        }
    }

    fn read_sidecar(dir: &Path, key: &str) -> Value {
        let text = std::fs::read_to_string(dir.join(format!("{}.json", key))).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_embedded_overlay_writes_image_and_sidecar() {
        let temp = TempDir::new().unwrap();
        let surface = ExportSurface::new(temp.path());
        let overlay = descriptor(
            "hillshade_OR_Wizard",
            ImageSource::Embedded(format!("data:image/png;base64,{}", PIXEL_PNG)),
        );

        surface.add_image_overlay(&overlay).await.unwrap();

        let image = std::fs::read(temp.path().join("hillshade_OR_Wizard.png")).unwrap();
        assert_eq!(&image[1..4], b"PNG");
        let sidecar = read_sidecar(temp.path(), "hillshade_OR_Wizard");
        assert_eq!(sidecar["image"], "hillshade_OR_Wizard.png");
        assert_eq!(sidecar["opacity"], 0.7);
        assert_eq!(sidecar["bounds"][0][0], 42.90);
        assert_eq!(sidecar["bounds"][1][1], -122.10);
    }

    #[tokio::test]
    async fn test_url_overlay_writes_sidecar_only() {
        let temp = TempDir::new().unwrap();
        let surface = ExportSurface::new(temp.path());
        let overlay = descriptor(
            "dtm_OR_Wizard",
            ImageSource::Url("http://localhost:8000/rasters/dtm.png".to_string()),
        );

        surface.add_image_overlay(&overlay).await.unwrap();

        let sidecar = read_sidecar(temp.path(), "dtm_OR_Wizard");
        assert_eq!(sidecar["url"], "http://localhost:8000/rasters/dtm.png");
        assert!(sidecar["image"].is_null());
        assert!(!temp.path().join("dtm_OR_Wizard.png").exists());
    }

    #[tokio::test]
    async fn test_undecodable_payload_fails_to_load() {
        let temp = TempDir::new().unwrap();
        let surface = ExportSurface::new(temp.path());
        let overlay = descriptor("chm_r", ImageSource::Embedded("not base64!".to_string()));

        let result = surface.add_image_overlay(&overlay).await;
        assert!(matches!(result, Err(SurfaceError::LoadFailed(_))));
    }

    #[tokio::test]
    async fn test_restyle_rewrites_sidecar() {
        let temp = TempDir::new().unwrap();
        let surface = ExportSurface::new(temp.path());
        let overlay = descriptor("slope_r", ImageSource::Embedded(PIXEL_PNG.to_string()));
        let layer = surface.add_image_overlay(&overlay).await.unwrap();

        surface.set_opacity(layer, 0.25);
        surface.set_visible(layer, false);

        let sidecar = read_sidecar(temp.path(), "slope_r");
        assert_eq!(sidecar["opacity"], 0.25);
        assert_eq!(sidecar["visible"], false);
    }

    #[tokio::test]
    async fn test_remove_deletes_files() {
        let temp = TempDir::new().unwrap();
        let surface = ExportSurface::new(temp.path());
        let overlay = descriptor("tri_r", ImageSource::Embedded(PIXEL_PNG.to_string()));
        let layer = surface.add_image_overlay(&overlay).await.unwrap();

        surface.remove_overlay(layer);
        surface.remove_overlay(layer);

        assert!(!temp.path().join("tri_r.png").exists());
        assert!(!temp.path().join("tri_r.json").exists());
    }

    #[tokio::test]
    async fn test_remove_keeps_files_of_live_layer_with_same_key() {
        let temp = TempDir::new().unwrap();
        let surface = ExportSurface::new(temp.path());
        let overlay = descriptor("tpi_r", ImageSource::Embedded(PIXEL_PNG.to_string()));
        let old = surface.add_image_overlay(&overlay).await.unwrap();
        let _new = surface.add_image_overlay(&overlay).await.unwrap();

        surface.remove_overlay(old);

        assert!(temp.path().join("tpi_r.png").exists());
        assert!(temp.path().join("tpi_r.json").exists());
    }

    #[test]
    fn test_fit_bounds_moves_viewport() {
        let surface = ExportSurface::new("unused");
        assert!(surface.viewport().is_none());
        let bounds = GeoBounds::new(1.0, 2.0, 3.0, 4.0);
        surface.fit_bounds(&bounds);
        assert_eq!(surface.viewport(), Some(bounds));
        assert_eq!(surface.dir(), Path::new("unused"));
    }
}
