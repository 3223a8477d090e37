//! Optimize command - shrink an image the way overlays are shrunk.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use lidarlayer::config::ConfigFile;
use lidarlayer::optimizer::ImageOptimizer;
use lidarlayer::validation::ImageFormat;
use tracing::warn;

use crate::error::CliError;

/// Arguments for the optimize command.
pub struct OptimizeArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Overrides overlay.max_pixels.
    pub max_pixels: Option<u64>,
}

/// Run the optimize command.
pub async fn run(args: OptimizeArgs, config: &ConfigFile) -> Result<(), CliError> {
    let mut profile = config.optimization_profile();
    if let Some(max_pixels) = args.max_pixels {
        profile = profile
            .with_max_pixels(max_pixels)
            .with_compression_pixel_threshold(max_pixels / 4);
    }

    let bytes = tokio::fs::read(&args.input).await?;
    let payload = STANDARD.encode(&bytes);
    let result = ImageOptimizer::new(profile).optimize(&payload).await?;

    let output = STANDARD
        .decode(&result.payload)
        .map_err(|e| CliError::Io(format!("re-encoded payload: {}", e)))?;
    tokio::fs::write(&args.output, &output).await?;

    if result.changed {
        println!(
            "{}x{} -> {}x{} ({:.0}% of original size) in {:.1}s",
            result.original_dims.0,
            result.original_dims.1,
            result.new_dims.0,
            result.new_dims.1,
            result.compression_ratio * 100.0,
            result.elapsed.as_secs_f64()
        );
    } else {
        println!(
            "{}x{} is within limits; copied unchanged",
            result.original_dims.0, result.original_dims.1
        );
    }

    let extension = args
        .output
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let mismatched = match result.format {
        ImageFormat::Jpeg => extension == "png",
        ImageFormat::Png => extension == "jpg" || extension == "jpeg",
        ImageFormat::Unknown => false,
    };
    if mismatched {
        warn!(
            output = %args.output.display(),
            format = ?result.format,
            "Output extension does not match the encoded format"
        );
    }

    Ok(())
}
