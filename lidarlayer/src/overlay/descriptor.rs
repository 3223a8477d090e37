//! Overlay descriptors and presentation options.

use crate::geo::GeoBounds;

/// Where an overlay's pixels come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A URL the map fetches itself.
    Url(String),
    /// A base64 payload, optionally with a `data:` prefix.
    Embedded(String),
}

impl ImageSource {
    /// True for inline payloads, which are validated and optimized.
    pub fn is_embedded(&self) -> bool {
        matches!(self, ImageSource::Embedded(_))
    }
}

/// One renderable map layer.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayDescriptor {
    /// Unique per processing type and region.
    pub key: String,
    pub bounds: GeoBounds,
    pub image: ImageSource,
    /// In [0, 1].
    pub opacity: f64,
    pub visible: bool,
}

/// Per-call presentation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentOptions {
    /// Initial opacity, clamped to [0, 1].
    pub opacity: f64,
    pub visible: bool,
    /// Move the viewport to the overlay once it is shown.
    pub fit_bounds: bool,
    /// Name used in user-facing messages (e.g. "Hillshade"); defaults to the key.
    pub label: Option<String>,
    /// Spawn an advisory decode of the payload for diagnostics.
    pub probe_decode: bool,
}

impl Default for PresentOptions {
    fn default() -> Self {
        Self {
            opacity: 0.7,
            visible: true,
            fit_bounds: true,
            label: None,
            probe_decode: true,
        }
    }
}

impl PresentOptions {
    /// Set the initial opacity.
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    /// Set whether the viewport follows the overlay.
    pub fn with_fit_bounds(mut self, fit: bool) -> Self {
        self.fit_bounds = fit;
        self
    }

    /// Set the label used in messages.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Enable or disable the advisory decode probe.
    pub fn with_probe_decode(mut self, probe: bool) -> Self {
        self.probe_decode = probe;
        self
    }
}

/// Clamps an opacity into [0, 1]; NaN becomes fully opaque.
pub fn clamp_opacity(opacity: f64) -> f64 {
    if opacity.is_nan() {
        1.0
    } else {
        opacity.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_opacity() {
        assert_eq!(clamp_opacity(-0.5), 0.0);
        assert_eq!(clamp_opacity(0.4), 0.4);
        assert_eq!(clamp_opacity(3.0), 1.0);
        assert_eq!(clamp_opacity(f64::NAN), 1.0);
    }

    #[test]
    fn test_present_options_builder() {
        let options = PresentOptions::default()
            .with_opacity(0.3)
            .with_fit_bounds(false)
            .with_label("Slope");
        assert_eq!(options.opacity, 0.3);
        assert!(!options.fit_bounds);
        assert_eq!(options.label.as_deref(), Some("Slope"));
        assert!(options.visible);
    }

    #[test]
    fn test_image_source_kind() {
        assert!(ImageSource::Embedded("iVBOR".to_string()).is_embedded());
        assert!(!ImageSource::Url("http://x/y.png".to_string()).is_embedded());
    }
}
