//! Configuration file handling.
//!
//! Settings live in `~/.config/lidarlayer/config.ini`:
//!
//! ```ini
//! [backend]
//! url = http://localhost:8000
//! timeout_secs = 300
//!
//! [processing]
//! quality_mode = true
//! products = dtm,chm,hillshade
//!
//! [overlay]
//! max_pixels = 16777216
//! max_retries = 3
//!
//! [logging]
//! level = info
//! ```
//!
//! Each setting is also addressable as a [`ConfigKey`] (`overlay.max_pixels`).

mod error;
mod file;
mod keys;

pub use error::ConfigError;
pub use file::{
    config_file_path, BackendSettings, ConfigFile, OverlaySettings, ProcessingSettings,
};
pub use keys::ConfigKey;
