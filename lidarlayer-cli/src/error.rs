//! CLI error type.

use lidarlayer::backend::BackendError;
use lidarlayer::config::ConfigError;
use lidarlayer::optimizer::OptimizeError;
use lidarlayer::overlay::OverlayError;
use lidarlayer::processing::ProcessingError;
use thiserror::Error;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Bad flag combination or unusable setting.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error(transparent)]
    Optimize(#[from] OptimizeError),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),

    /// The job ran but produced nothing usable.
    #[error("{0}")]
    JobFailed(String),

    /// The overlay engine declined to show an overlay; the reason was
    /// already printed by the notifier.
    #[error("Overlay {0} could not be displayed")]
    NotPresented(String),
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}
