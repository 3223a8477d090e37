//! The map surface overlays are drawn on.
//!
//! The surface is an external collaborator: a browser map, an export
//! directory, or a test double. It is only asked to add and remove image
//! layers, restyle them, and move its viewport.
//!
//! # Dyn Compatibility
//!
//! `add_image_overlay` returns a boxed future so the engine can hold an
//! `Arc<dyn MapSurface>`.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use super::descriptor::OverlayDescriptor;
use crate::geo::GeoBounds;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handle the surface assigns to a live layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

/// Errors a surface can report while constructing a layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SurfaceError {
    /// The image could not be loaded or decoded by the surface.
    #[error("Overlay image failed to load: {0}")]
    LoadFailed(String),

    /// The surface refused the layer (e.g. out of resources).
    #[error("Surface rejected overlay: {0}")]
    Rejected(String),
}

/// A map that can display georeferenced image overlays.
pub trait MapSurface: Send + Sync {
    /// Adds an image layer; resolves once the image has loaded.
    fn add_image_overlay<'a>(
        &'a self,
        overlay: &'a OverlayDescriptor,
    ) -> BoxFuture<'a, Result<LayerId, SurfaceError>>;

    /// Removes a layer. Unknown ids are ignored.
    fn remove_overlay(&self, layer: LayerId);

    fn set_opacity(&self, layer: LayerId, opacity: f64);

    fn set_visible(&self, layer: LayerId, visible: bool);

    /// Moves the viewport to show the given bounds.
    fn fit_bounds(&self, bounds: &GeoBounds);

    /// Approximate memory in use, if the surface can tell.
    fn memory_usage_bytes(&self) -> Option<u64> {
        None
    }
}

/// Resident set size of this process, where the platform exposes it.
///
/// Read from the kernel's own kB figure, so the page size never enters.
pub fn process_memory_bytes() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        parse_vm_rss(&status)
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Extracts `VmRSS` from `/proc/<pid>/status` text, in bytes.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let mut fields = line["VmRSS:".len()..].split_whitespace();
    let value: u64 = fields.next()?.parse().ok()?;
    match fields.next() {
        Some("kB") | None => Some(value * 1024),
        Some(_) => None,
    }
}
