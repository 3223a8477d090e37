use thiserror::Error;

use crate::backend::BackendError;

/// Errors raised while presenting an overlay.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OverlayError {
    /// Bounds were not structurally a bounding box at all.
    #[error("Malformed bounds: {0}")]
    MalformedBounds(String),

    /// Bounds were well-formed but failed validation.
    #[error("Invalid bounds for {label}: {reason}")]
    InvalidBounds { label: String, reason: String },

    /// The embedded image payload failed validation.
    #[error("Invalid image data for {label}: {reason}")]
    InvalidPayload { label: String, reason: String },

    /// Every construction attempt failed or timed out.
    #[error("Failed to display {label} after {attempts} attempts: {reason}")]
    ConstructionFailed {
        label: String,
        attempts: u32,
        reason: String,
    },

    /// The backend returned overlay data without an image.
    #[error("No image data returned for {key}")]
    MissingImage { key: String },

    #[error(transparent)]
    Backend(#[from] BackendError),
}
