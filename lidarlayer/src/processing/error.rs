use thiserror::Error;

use crate::backend::BackendError;

/// Errors that prevent a processing job from starting.
///
/// Failures of individual steps are never errors; they are recorded in the
/// job's results.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProcessingError {
    /// The options select no raster product at all.
    #[error("No raster products selected")]
    EmptyQueue,

    #[error("Upload failed: {0}")]
    Upload(#[from] BackendError),

    /// The uploaded file name does not yield a region name.
    #[error("Cannot derive a region name from '{0}'")]
    InvalidRegion(String),
}
