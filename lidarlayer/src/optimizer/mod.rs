//! Client-side raster resizing for overlays.
//!
//! Rendering a multi-gigapixel elevation raster as a single map overlay
//! exhausts memory long before the image appears. The [`ImageOptimizer`]
//! downscales and recompresses such payloads under the limits of an
//! [`OptimizationProfile`].
//!
//! # Sizing rules
//!
//! ```text
//! pixels > max_pixels                   scale = sqrt(max_pixels / pixels)
//! pixels > compression_pixel_threshold  scale = sqrt(threshold / pixels)
//! otherwise (size trigger only)         scale = 1.0
//!
//! scale clamped to [0.25, 1.0]
//! target fitted inside fallback_max_width × fallback_max_height
//! each edge at least 256px (or the source edge, if smaller)
//! ```

mod error;
mod profile;
mod resize;

pub use error::OptimizeError;
pub use resize::{
    read_dimensions, ImageOptimizer, OptimizeTrigger, OptimizedImage, ResizePlan, MIN_DIMENSION,
    MIN_SCALE,
};
pub use profile::OptimizationProfile;
