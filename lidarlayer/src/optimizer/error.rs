//! Error types for image optimization.

use thiserror::Error;

/// Errors that can occur while optimizing an overlay image.
///
/// Every variant leaves the caller's original payload untouched; the caller
/// decides whether to fall back to it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OptimizeError {
    /// The payload was not valid base64.
    #[error("Payload is not valid base64: {0}")]
    InvalidEncoding(String),

    /// The bytes could not be decoded as an image.
    #[error("Image decode failed: {0}")]
    DecodeFailed(String),

    /// Both lossless and lossy encoding failed.
    #[error("Image encode failed: {0}")]
    EncodeFailed(String),

    /// The optimization profile is unusable.
    #[error("Invalid optimization profile: {0}")]
    InvalidProfile(String),

    /// The blocking worker was cancelled or panicked.
    #[error("Optimization worker failed: {0}")]
    Worker(String),
}
