//! Processing backend access.
//!
//! All point-cloud parsing and raster computation happens on a remote
//! backend reached over HTTP. This module is the typed boundary to it:
//!
//! ```text
//! BackendClient<C> ──► AsyncHttpClient (trait)
//!                          ├── ReqwestClient
//!                          └── mock clients in tests
//! ```
//!
//! # Example
//!
//! ```ignore
//! use lidarlayer::backend::{BackendClient, BackendConfig, ProductRequest, RasterProduct};
//!
//! let client = BackendClient::from_config(&BackendConfig::default())?;
//! client
//!     .generate_product(&ProductRequest::new("OR_WizardIsland", RasterProduct::Hillshade, 1.0))
//!     .await?;
//! ```

mod client;
mod error;
mod http;
mod types;

pub use client::{BackendClient, BackendConfig, DEFAULT_BACKEND_TIMEOUT_SECS, DEFAULT_BACKEND_URL};
pub use error::BackendError;
pub use http::{AsyncHttpClient, FormValue, HttpResponse, MultipartForm, ReqwestClient};
pub use types::{
    BackendReply, DensityRequest, GenerationResponse, HillshadeParams, MaskRequest, MaskResults,
    MetadataRequest, MetadataResponse, OverlayDataResponse, ProductRequest, QualityResponse,
    RasterProduct, SatelliteAcquisition, UploadResponse, UploadedFile,
};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
