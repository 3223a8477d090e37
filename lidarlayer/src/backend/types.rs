//! Request and response types for the processing backend.
//!
//! Every request is an explicit struct whose fields map one-to-one onto
//! multipart form fields, so nothing reaches the backend that is not
//! enumerated here.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use super::http::MultipartForm;

/// Raster products the backend can derive from a point cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RasterProduct {
    Dtm,
    Dsm,
    Chm,
    Hillshade,
    Slope,
    Aspect,
    ColorRelief,
    Tri,
    Tpi,
    Roughness,
}

impl RasterProduct {
    /// Every product, in generation order.
    pub fn all() -> &'static [RasterProduct] {
        &[
            RasterProduct::Dtm,
            RasterProduct::Dsm,
            RasterProduct::Chm,
            RasterProduct::Hillshade,
            RasterProduct::Slope,
            RasterProduct::Aspect,
            RasterProduct::ColorRelief,
            RasterProduct::Tri,
            RasterProduct::Tpi,
            RasterProduct::Roughness,
        ]
    }

    /// Stable identifier used in URLs, config and overlay keys.
    pub fn id(&self) -> &'static str {
        match self {
            RasterProduct::Dtm => "dtm",
            RasterProduct::Dsm => "dsm",
            RasterProduct::Chm => "chm",
            RasterProduct::Hillshade => "hillshade",
            RasterProduct::Slope => "slope",
            RasterProduct::Aspect => "aspect",
            RasterProduct::ColorRelief => "color_relief",
            RasterProduct::Tri => "tri",
            RasterProduct::Tpi => "tpi",
            RasterProduct::Roughness => "roughness",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            RasterProduct::Dtm => "DTM",
            RasterProduct::Dsm => "DSM",
            RasterProduct::Chm => "CHM",
            RasterProduct::Hillshade => "Hillshade",
            RasterProduct::Slope => "Slope",
            RasterProduct::Aspect => "Aspect",
            RasterProduct::ColorRelief => "Color Relief",
            RasterProduct::Tri => "TRI",
            RasterProduct::Tpi => "TPI",
            RasterProduct::Roughness => "Roughness",
        }
    }

    /// Generation endpoint, relative to the backend base URL.
    pub fn endpoint(&self) -> String {
        format!("api/laz/{}", self.id())
    }

    /// Overlay key for this product in the given region.
    pub fn overlay_key(&self, region: &str) -> String {
        format!("{}_{}", self.id(), region)
    }
}

impl fmt::Display for RasterProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for RasterProduct {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', ' '], "_");
        RasterProduct::all()
            .iter()
            .copied()
            .find(|p| p.id() == wanted)
            .ok_or_else(|| format!("unknown raster product '{}'", s))
    }
}

/// Hillshade illumination parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HillshadeParams {
    pub azimuth: f64,
    pub altitude: f64,
    pub z_factor: f64,
}

impl Default for HillshadeParams {
    fn default() -> Self {
        Self {
            azimuth: 315.0,
            altitude: 45.0,
            z_factor: 1.0,
        }
    }
}

/// Request to generate one raster product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRequest {
    pub region_name: String,
    pub product: RasterProduct,
    /// Output cell size in metres.
    pub resolution: f64,
    /// Source point-cloud name, for products derived from the upload.
    pub source_file: Option<String>,
    /// Quality-mode DTM: use the cleaned point cloud when one exists.
    pub quality_mode: bool,
    pub clean_file: Option<String>,
    /// Sent only for hillshade.
    pub hillshade: HillshadeParams,
}

impl ProductRequest {
    /// Standard request for a product.
    pub fn new(region_name: impl Into<String>, product: RasterProduct, resolution: f64) -> Self {
        Self {
            region_name: region_name.into(),
            product,
            resolution,
            source_file: None,
            quality_mode: false,
            clean_file: None,
            hillshade: HillshadeParams::default(),
        }
    }

    pub(crate) fn to_form(&self) -> MultipartForm {
        let mut form = MultipartForm::new()
            .text("region_name", &self.region_name)
            .text("resolution", self.resolution)
            .text_opt("file_name", self.source_file.as_ref());
        if self.quality_mode {
            form = form
                .text("quality_mode", true)
                .text_opt("clean_laz_path", self.clean_file.as_ref());
        }
        if self.product == RasterProduct::Hillshade {
            form = form
                .text("azimuth", self.hillshade.azimuth)
                .text("altitude", self.hillshade.altitude)
                .text("z_factor", self.hillshade.z_factor);
        }
        form
    }
}

/// Request for point-density analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityRequest {
    pub laz_file_path: String,
    pub region_name: String,
    pub resolution: f64,
    pub mask_threshold: f64,
    pub generate_mask: bool,
}

impl DensityRequest {
    pub(crate) fn to_form(&self) -> MultipartForm {
        MultipartForm::new()
            .text("laz_file_path", &self.laz_file_path)
            .text("region_name", &self.region_name)
            .text("resolution", self.resolution)
            .text("mask_threshold", self.mask_threshold)
            .text("generate_mask", self.generate_mask)
    }
}

/// Request to build the low-density mask and cleaned point cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskRequest {
    pub laz_file_path: String,
    pub region_name: String,
    pub mask_threshold: f64,
}

impl MaskRequest {
    pub(crate) fn to_form(&self) -> MultipartForm {
        MultipartForm::new()
            .text("laz_file_path", &self.laz_file_path)
            .text("region_name", &self.region_name)
            .text("mask_threshold", self.mask_threshold)
    }
}

/// Request to write region metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRequest {
    pub region_name: String,
    pub file_name: String,
}

impl MetadataRequest {
    pub(crate) fn to_form(&self) -> MultipartForm {
        MultipartForm::new()
            .text("region_name", &self.region_name)
            .text("file_name", &self.file_name)
    }
}

/// Common accessors for responses carrying a `success` flag.
pub trait BackendReply {
    fn succeeded(&self) -> bool;
    fn failure_message(&self) -> Option<String>;
}

/// One uploaded file as named by the backend.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UploadedFile {
    #[serde(rename = "inputFile")]
    pub input_file: String,
}

/// Response of the upload endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UploadResponse {
    pub files: Vec<UploadedFile>,
}

impl BackendReply for UploadResponse {
    fn succeeded(&self) -> bool {
        !self.files.is_empty()
    }

    fn failure_message(&self) -> Option<String> {
        Some("upload response listed no files".to_string())
    }
}

/// Generic `{success, message, error}` response.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationResponse {
    pub success: bool,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl BackendReply for GenerationResponse {
    fn succeeded(&self) -> bool {
        self.success
    }

    fn failure_message(&self) -> Option<String> {
        self.error.clone().or_else(|| self.message.clone())
    }
}

/// Outcome of mask generation as reported by the backend.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct MaskResults {
    pub success: bool,
    /// Path of the cleaned point cloud, when one was written.
    pub clean_file: Option<String>,
}

/// Response of the density-analysis and mask endpoints.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityResponse {
    pub success: bool,
    pub mask_results: Option<MaskResults>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl QualityResponse {
    /// True if a cleaned derivative is available for quality-mode DTM.
    pub fn clean_available(&self) -> bool {
        self.mask_results.as_ref().is_some_and(|m| m.success)
    }
}

impl BackendReply for QualityResponse {
    fn succeeded(&self) -> bool {
        self.success
    }

    fn failure_message(&self) -> Option<String> {
        self.error.clone().or_else(|| self.message.clone())
    }
}

/// Satellite imagery acquisition attempted during metadata generation.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SatelliteAcquisition {
    pub attempted: bool,
    pub success: bool,
}

/// Response of the metadata endpoint.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetadataResponse {
    pub success: bool,
    pub sentinel2_acquisition: Option<SatelliteAcquisition>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl BackendReply for MetadataResponse {
    fn succeeded(&self) -> bool {
        self.success
    }

    fn failure_message(&self) -> Option<String> {
        self.error.clone().or_else(|| self.message.clone())
    }
}

/// Response of the overlay data endpoint.
///
/// `bounds` stays untyped so that structural problems are reported by the
/// bounds validator rather than as a decode error.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct OverlayDataResponse {
    pub success: bool,
    pub bounds: Option<Value>,
    pub image_data: Option<String>,
    pub error: Option<String>,
}

impl BackendReply for OverlayDataResponse {
    fn succeeded(&self) -> bool {
        self.success
    }

    fn failure_message(&self) -> Option<String> {
        self.error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_ids_roundtrip_through_from_str() {
        for product in RasterProduct::all() {
            assert_eq!(product.id().parse::<RasterProduct>().unwrap(), *product);
        }
        assert_eq!(
            "Color Relief".parse::<RasterProduct>().unwrap(),
            RasterProduct::ColorRelief
        );
        assert!("ndvi".parse::<RasterProduct>().is_err());
    }

    #[test]
    fn test_overlay_key_combines_type_and_region() {
        assert_eq!(RasterProduct::Hillshade.overlay_key("OR_WizardIsland"), "hillshade_OR_WizardIsland");
        assert_eq!(RasterProduct::Slope.endpoint(), "api/laz/slope");
    }

    #[test]
    fn test_product_form_fields() {
        let mut request = ProductRequest::new("region_a", RasterProduct::Hillshade, 1.0);
        request.source_file = Some("region_a.laz".to_string());
        let form = request.to_form();
        assert_eq!(form.get_text("region_name"), Some("region_a"));
        assert_eq!(form.get_text("file_name"), Some("region_a.laz"));
        assert_eq!(form.get_text("azimuth"), Some("315"));
        assert_eq!(form.get_text("quality_mode"), None);

        let mut request = ProductRequest::new("region_a", RasterProduct::Dtm, 0.5);
        request.quality_mode = true;
        request.clean_file = Some("clean.laz".to_string());
        let form = request.to_form();
        assert_eq!(form.get_text("quality_mode"), Some("true"));
        assert_eq!(form.get_text("clean_laz_path"), Some("clean.laz"));
        assert_eq!(form.get_text("azimuth"), None);
    }

    #[test]
    fn test_density_form_fields() {
        let form = DensityRequest {
            laz_file_path: "input/a.laz".to_string(),
            region_name: "a".to_string(),
            resolution: 1.0,
            mask_threshold: 0.5,
            generate_mask: true,
        }
        .to_form();
        assert_eq!(form.get_text("generate_mask"), Some("true"));
        assert_eq!(form.get_text("mask_threshold"), Some("0.5"));
    }

    #[test]
    fn test_quality_response_clean_available() {
        let response: QualityResponse =
            serde_json::from_value(json!({"success": true, "mask_results": {"success": true}}))
                .unwrap();
        assert!(response.clean_available());

        let response: QualityResponse = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(!response.clean_available());
    }

    #[test]
    fn test_metadata_response_satellite() {
        let response: MetadataResponse = serde_json::from_value(json!({
            "success": true,
            "sentinel2_acquisition": {"attempted": true, "success": false},
            "extra": [1, 2, 3]
        }))
        .unwrap();
        assert_eq!(
            response.sentinel2_acquisition,
            Some(SatelliteAcquisition {
                attempted: true,
                success: false
            })
        );
    }

    #[test]
    fn test_upload_response_field_name() {
        let response: UploadResponse =
            serde_json::from_value(json!({"files": [{"inputFile": "tile.laz"}]})).unwrap();
        assert_eq!(response.files[0].input_file, "tile.laz");
        assert!(response.succeeded());
    }
}
