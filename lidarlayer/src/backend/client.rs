//! Typed client for the raster processing backend.

use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::BackendError;
use super::http::{AsyncHttpClient, HttpResponse, MultipartForm, ReqwestClient};
use super::types::{
    BackendReply, DensityRequest, GenerationResponse, MaskRequest, MetadataRequest,
    MetadataResponse, OverlayDataResponse, ProductRequest, QualityResponse, RasterProduct,
    UploadResponse,
};

/// Default backend base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Default request timeout. Raster generation on large clouds is slow.
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 300;

/// Connection settings for the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
        }
    }
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client exposing one method per backend endpoint.
#[derive(Debug, Clone)]
pub struct BackendClient<C> {
    http: C,
    base_url: String,
}

impl BackendClient<ReqwestClient> {
    /// Creates a client backed by reqwest.
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        Ok(Self::new(
            ReqwestClient::new(config.timeout)?,
            config.base_url.clone(),
        ))
    }
}

impl<C: AsyncHttpClient> BackendClient<C> {
    pub fn new(http: C, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &C {
        &self.http
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Appends percent-encoded path segments to the base URL.
    fn segment_url(&self, segments: &[&str]) -> Result<String, BackendError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| BackendError::Client(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                BackendError::Client(format!("{} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url.to_string())
    }

    /// Uploads a point-cloud file, streaming it from disk.
    pub async fn upload(&self, path: &Path) -> Result<UploadResponse, BackendError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| BackendError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload.laz".to_string());
        debug!(file = %file_name, bytes = metadata.len(), "Uploading point cloud");

        let form = MultipartForm::new().disk_file("files", file_name, path, metadata.len());
        self.post("api/upload", form).await
    }

    /// Requests generation of one raster product.
    pub async fn generate_product(
        &self,
        request: &ProductRequest,
    ) -> Result<GenerationResponse, BackendError> {
        self.post(&request.product.endpoint(), request.to_form())
            .await
    }

    /// Runs point-density analysis.
    pub async fn analyze_density(
        &self,
        request: &DensityRequest,
    ) -> Result<QualityResponse, BackendError> {
        self.post("api/laz/density/analyze", request.to_form()).await
    }

    /// Builds the low-density mask and cleaned point cloud.
    pub async fn generate_mask(
        &self,
        request: &MaskRequest,
    ) -> Result<QualityResponse, BackendError> {
        self.post("api/laz/mask", request.to_form()).await
    }

    /// Writes region metadata, possibly acquiring satellite imagery.
    pub async fn generate_metadata(
        &self,
        request: &MetadataRequest,
    ) -> Result<MetadataResponse, BackendError> {
        self.post("api/laz/metadata", request.to_form()).await
    }

    /// Fetches the rendered raster and bounds for an overlay.
    pub async fn overlay_data(
        &self,
        region: &str,
        product: RasterProduct,
    ) -> Result<OverlayDataResponse, BackendError> {
        let url = self.segment_url(&["api", "overlay", "raster", region, product.id()])?;
        let response = self.http.get(&url).await?;
        decode(&url, response)
    }

    async fn post<T>(&self, path: &str, form: MultipartForm) -> Result<T, BackendError>
    where
        T: DeserializeOwned + BackendReply,
    {
        let url = self.url(path);
        let response = self.http.post_multipart(&url, form).await?;
        decode(&url, response)
    }
}

fn decode<T>(url: &str, response: HttpResponse) -> Result<T, BackendError>
where
    T: DeserializeOwned + BackendReply,
{
    if !response.is_success() {
        warn!(url = %url, status = response.status, "Backend returned error status");
        return Err(BackendError::Status {
            status: response.status,
            url: url.to_string(),
        });
    }
    let reply: T = serde_json::from_slice(&response.body).map_err(|e| BackendError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if !reply.succeeded() {
        let message = reply
            .failure_message()
            .unwrap_or_else(|| format!("{} reported success=false", url));
        return Err(BackendError::Rejected(message));
    }
    Ok(reply)
}
