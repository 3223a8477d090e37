//! Pre-flight validation for overlay inputs.
//!
//! Both validators are pure: they never touch the map or the network and
//! return a report value instead of an error. Errors in a report are fatal
//! for the overlay; warnings are diagnostics only.
//!
//! - [`BoundsValidator`] checks geographic bounding boxes
//! - [`ImagePayloadValidator`] checks base64-encoded raster payloads

mod bounds;
mod payload;

pub use bounds::{BoundsMetrics, BoundsReport, BoundsValidator};
pub use payload::{
    spawn_decode_probe, strip_data_url, ImageFormat, ImagePayloadValidator, PayloadInfo, PayloadReport,
    MAX_PLAUSIBLE_ENCODED_BYTES, MIN_PLAUSIBLE_ENCODED_LEN,
};
