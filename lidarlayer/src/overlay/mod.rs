//! Georeferenced raster overlays.
//!
//! ```text
//! OverlayLoader ──► BackendClient::overlay_data
//!       │
//!       ▼
//! OverlayRenderingEngine ──► validation ──► ImageOptimizer
//!       │
//!       ├──► MapSurface (trait)    add / remove / restyle layers
//!       └──► OverlayStore          key → active overlay
//! ```
//!
//! The store is created once per map session and injected into the
//! engine. A key maps to at most one live layer: presenting a key again
//! replaces the previous layer.

mod descriptor;
mod engine;
mod error;
mod loader;
mod store;
mod surface;

pub use descriptor::{clamp_opacity, ImageSource, OverlayDescriptor, PresentOptions};
pub use engine::OverlayRenderingEngine;
pub use error::OverlayError;
pub use loader::OverlayLoader;
pub use store::{ActiveOverlay, OverlayStore};
pub use surface::{process_memory_bytes, BoxFuture, LayerId, MapSurface, SurfaceError};
