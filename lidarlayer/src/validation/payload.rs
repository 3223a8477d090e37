//! Encoded raster payload validation.
//!
//! Payloads arrive from the backend as base64 text. Validation works on the
//! encoded text only; decoding into pixels is left to the advisory
//! [`spawn_decode_probe`], which never influences the verdict.

use base64::engine::general_purpose::STANDARD;
use base64::{DecodeError, DecodeSliceError, Engine};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Payloads shorter than this many characters are almost certainly blank.
pub const MIN_PLAUSIBLE_ENCODED_LEN: usize = 100;

/// Encoded payloads larger than this (50 MB) are flagged as oversized.
pub const MAX_PLAUSIBLE_ENCODED_BYTES: usize = 50 * 1024 * 1024;

/// Characters decoded per syntax-check pass. A multiple of 4, so only the
/// final chunk may carry padding.
const SYNTAX_CHUNK_CHARS: usize = 64 * 1024;

/// Base64 prefix of the PNG signature `89 50 4E 47 0D 0A 1A 0A`.
const PNG_B64_PREFIX: &str = "iVBORw0KGgo";

/// Base64 prefix of the JPEG SOI marker `FF D8 FF`.
const JPEG_B64_PREFIX: &str = "/9j/";

/// Raster format detected from the payload's leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Unknown,
}

impl ImageFormat {
    /// Detects the format from base64 text.
    pub fn sniff(encoded: &str) -> Self {
        if encoded.starts_with(PNG_B64_PREFIX) {
            ImageFormat::Png
        } else if encoded.starts_with(JPEG_B64_PREFIX) {
            ImageFormat::Jpeg
        } else {
            ImageFormat::Unknown
        }
    }

    /// MIME type used when the payload is wrapped in a data URL.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Unknown => "application/octet-stream",
        }
    }
}

/// Facts about the payload gathered during validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadInfo {
    /// Length of the base64 text, excluding any data-URL prefix.
    pub encoded_len: usize,
    /// Size the payload will have once decoded.
    pub decoded_len: usize,
    pub detected_format: ImageFormat,
}

/// Outcome of validating an encoded payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: PayloadInfo,
}

/// Validates base64-encoded raster payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePayloadValidator;

impl ImagePayloadValidator {
    /// Validates a payload. A `data:image/...;base64,` prefix is tolerated.
    pub fn validate(payload: &str) -> PayloadReport {
        let encoded = strip_data_url(payload).trim();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let detected_format = ImageFormat::sniff(encoded);
        let info = PayloadInfo {
            encoded_len: encoded.len(),
            decoded_len: decoded_len(encoded),
            detected_format,
        };

        if encoded.is_empty() {
            errors.push("Image payload is empty".to_string());
            return PayloadReport {
                valid: false,
                errors,
                warnings,
                info,
            };
        }

        if let Err(reason) = check_base64_syntax(encoded) {
            errors.push(format!("Image payload is not valid base64: {}", reason));
        }

        if encoded.len() < MIN_PLAUSIBLE_ENCODED_LEN {
            warnings.push(format!(
                "Image payload is only {} characters and may be blank",
                encoded.len()
            ));
        }
        if encoded.len() > MAX_PLAUSIBLE_ENCODED_BYTES {
            warnings.push(format!(
                "Image payload is {:.1} MB encoded and may exhaust memory",
                encoded.len() as f64 / (1024.0 * 1024.0)
            ));
        }

        match detected_format {
            ImageFormat::Png => {}
            ImageFormat::Jpeg => {
                warnings.push("Image payload is JPEG; PNG was expected".to_string())
            }
            ImageFormat::Unknown => warnings.push(
                "Image payload format not recognised; the browser may still decode it"
                    .to_string(),
            ),
        }

        PayloadReport {
            valid: errors.is_empty(),
            errors,
            warnings,
            info,
        }
    }
}

/// Returns the base64 part of a data URL, or the input unchanged.
pub fn strip_data_url(payload: &str) -> &str {
    if payload.starts_with("data:") {
        if let Some(idx) = payload.find(";base64,") {
            return &payload[idx + ";base64,".len()..];
        }
    }
    payload
}

fn decoded_len(encoded: &str) -> usize {
    let padding = encoded.bytes().rev().take_while(|b| *b == b'=').count().min(2);
    (encoded.len() / 4 * 3).saturating_sub(padding)
}

/// Runs the payload through the decoder in bounded chunks, discarding output.
fn check_base64_syntax(encoded: &str) -> Result<(), String> {
    if encoded.len() % 4 != 0 {
        return Err(format!("length {} is not a multiple of 4", encoded.len()));
    }
    let mut scratch = vec![0u8; SYNTAX_CHUNK_CHARS / 4 * 3];
    let chunks = encoded.as_bytes().chunks(SYNTAX_CHUNK_CHARS);
    let last = chunks.len().saturating_sub(1);
    for (index, chunk) in chunks.enumerate() {
        let base = index * SYNTAX_CHUNK_CHARS;
        if index < last && chunk.last() == Some(&b'=') {
            return Err(format!(
                "padding before the end of the payload at offset {}",
                base + chunk.len() - 1
            ));
        }
        STANDARD
            .decode_slice(chunk, &mut scratch)
            .map_err(|e| describe_decode_error(e, base))?;
    }
    Ok(())
}

fn describe_decode_error(error: DecodeSliceError, base: usize) -> String {
    match error {
        DecodeSliceError::DecodeError(DecodeError::InvalidByte(offset, byte)) => format!(
            "unexpected character {:?} at offset {}",
            byte as char,
            base + offset
        ),
        DecodeSliceError::DecodeError(DecodeError::InvalidLastSymbol(offset, byte)) => format!(
            "final symbol {:?} at offset {} has non-zero trailing bits",
            byte as char,
            base + offset
        ),
        other => other.to_string(),
    }
}

/// Decodes the payload on a blocking task and logs what it finds.
///
/// Purely advisory: nothing waits on the handle for a verdict. Decoding
/// stays within the image crate's default allocation limit, so very large
/// rasters only log a warning here.
pub fn spawn_decode_probe(label: String, payload: String) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let bytes = match STANDARD.decode(strip_data_url(&payload).trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(overlay = %label, error = %e, "Payload probe could not decode base64");
                return;
            }
        };
        match image::load_from_memory(&bytes) {
            Ok(img) => debug!(
                overlay = %label,
                width = img.width(),
                height = img.height(),
                "Payload probe decoded image"
            ),
            Err(e) => warn!(overlay = %label, error = %e, "Payload probe could not decode image"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_payload(width: u32, height: u32) -> String {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        STANDARD.encode(bytes)
    }

    #[test]
    fn test_empty_payload_fails() {
        let report = ImagePayloadValidator::validate("");
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["Image payload is empty".to_string()]);
    }

    #[test]
    fn test_png_payload_is_valid() {
        let payload = png_payload(64, 64);
        let report = ImagePayloadValidator::validate(&payload);
        assert!(report.valid, "{:?}", report.errors);
        assert_eq!(report.info.detected_format, ImageFormat::Png);
        assert_eq!(report.info.encoded_len, payload.len());
        assert_eq!(
            report.info.decoded_len,
            STANDARD.decode(&payload).unwrap().len()
        );
    }

    #[test]
    fn test_data_url_prefix_is_stripped() {
        let payload = format!("data:image/png;base64,{}", png_payload(32, 32));
        let report = ImagePayloadValidator::validate(&payload);
        assert!(report.valid);
        assert_eq!(report.info.detected_format, ImageFormat::Png);
    }

    #[test]
    fn test_invalid_characters_fail() {
        let report = ImagePayloadValidator::validate("iVBORw0KGgo*AAA");
        assert!(!report.valid);
    }

    #[test]
    fn test_bad_length_fails() {
        let report = ImagePayloadValidator::validate("iVBORw0KGgoAA");
        assert!(!report.valid);
        assert!(report.errors[0].contains("multiple of 4"));
    }

    #[test]
    fn test_non_canonical_tail_fails() {
        // "AB==" leaves non-zero bits after the last whole byte.
        let report = ImagePayloadValidator::validate("AB==");
        assert!(!report.valid);
        assert!(report.errors[0].contains("trailing bits"), "{:?}", report.errors);
        assert!(STANDARD.decode("AB==").is_err());

        assert!(ImagePayloadValidator::validate("AA==").valid);
    }

    #[test]
    fn test_invalid_character_offset_reported() {
        let report = ImagePayloadValidator::validate("iVBORw0KGgo*AAAA");
        assert!(!report.valid);
        assert!(report.errors[0].contains("offset 11"), "{:?}", report.errors);
    }

    #[test]
    fn test_padding_inside_payload_fails() {
        let report = ImagePayloadValidator::validate("AA==AAAA");
        assert!(!report.valid);

        // Padding that lands exactly on a chunk boundary.
        let payload = format!("{}AA==AAAA", "A".repeat(SYNTAX_CHUNK_CHARS - 4));
        let report = ImagePayloadValidator::validate(&payload);
        assert!(!report.valid);
        assert!(report.errors[0].contains("padding"), "{:?}", report.errors);
    }

    #[test]
    fn test_multi_chunk_payload_matches_decoder() {
        let payload = STANDARD.encode(vec![7u8; SYNTAX_CHUNK_CHARS * 2 + 5]);
        assert!(ImagePayloadValidator::validate(&payload).valid);
    }

    #[test]
    fn test_small_payload_warns() {
        let report = ImagePayloadValidator::validate("iVBORw0KGgoA");
        assert!(report.valid);
        assert!(report.warnings.iter().any(|w| w.contains("may be blank")));
    }

    #[test]
    fn test_jpeg_payload_warns() {
        let payload = format!("/9j/{}", "A".repeat(200));
        let report = ImagePayloadValidator::validate(&payload);
        assert!(report.valid);
        assert_eq!(report.info.detected_format, ImageFormat::Jpeg);
        assert!(report.warnings.iter().any(|w| w.contains("JPEG")));
    }

    #[test]
    fn test_unknown_format_is_warning_not_error() {
        let payload = "R0lGODlh".repeat(20);
        let report = ImagePayloadValidator::validate(&payload);
        assert!(report.valid);
        assert_eq!(report.info.detected_format, ImageFormat::Unknown);
        assert_eq!(report.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_decode_probe_never_panics_on_garbage() {
        spawn_decode_probe("probe".to_string(), "not base64!!".to_string())
            .await
            .unwrap();
        spawn_decode_probe("probe".to_string(), png_payload(8, 8))
            .await
            .unwrap();
    }
}
