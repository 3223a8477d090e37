//! LidarLayer CLI - Command-line interface
//!
//! Uploads point clouds to the processing backend, runs raster jobs with
//! live progress, and exports the results as georeferenced overlays.

mod commands;
mod error;
mod progress;
mod surface;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use lidarlayer::backend::RasterProduct;
use lidarlayer::config::ConfigFile;
use lidarlayer::logging;

use commands::bounds;
use commands::common::JobArgs;
use commands::config::ConfigCommands;
use commands::generate::{self, GenerateArgs};
use commands::optimize::{self, OptimizeArgs};
use commands::overlay::{self, OverlayArgs};
use commands::process::{self, ProcessArgs};
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "lidarlayer", version, about = "LiDAR terrain rasters and map overlays")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upload a LAS/LAZ file and run the full processing queue
    Process {
        /// Point cloud to upload
        file: PathBuf,

        #[command(flatten)]
        job: JobArgs,
    },

    /// Generate standard rasters for a region already on the backend
    Generate {
        /// Region name (the uploaded file's stem)
        region: String,

        #[command(flatten)]
        job: JobArgs,
    },

    /// Export one finished raster product as an overlay
    Overlay {
        region: String,

        /// Product id (dtm, chm, hillshade, ...)
        product: RasterProduct,

        /// Backend base URL (overrides backend.url)
        #[arg(long)]
        backend_url: Option<String>,

        /// Export directory
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// Overlay opacity in [0, 1] (overrides overlay.default_opacity)
        #[arg(long)]
        opacity: Option<f64>,
    },

    /// Validate a bounding box
    Bounds {
        #[arg(allow_negative_numbers = true)]
        south: f64,
        #[arg(allow_negative_numbers = true)]
        west: f64,
        #[arg(allow_negative_numbers = true)]
        north: f64,
        #[arg(allow_negative_numbers = true)]
        east: f64,
    },

    /// Downscale and recompress an oversized image
    Optimize {
        input: PathBuf,
        output: PathBuf,

        /// Pixel budget (overrides overlay.max_pixels)
        #[arg(long)]
        max_pixels: Option<u64>,
    },

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (config, config_error) = match ConfigFile::load() {
        Ok(config) => (config, None),
        Err(e) => (ConfigFile::default(), Some(e)),
    };

    let mut log_config = config.logging.clone();
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    let guard = logging::init(&log_config);

    if let Some(e) = config_error {
        tracing::warn!(error = %e, "Using default configuration");
    }

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        drop(guard);
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &ConfigFile) -> Result<(), CliError> {
    match command {
        Commands::Process { file, job } => process::run(ProcessArgs { file, job }, config).await,
        Commands::Generate { region, job } => {
            generate::run(GenerateArgs { region, job }, config).await
        }
        Commands::Overlay {
            region,
            product,
            backend_url,
            out,
            opacity,
        } => {
            overlay::run(
                OverlayArgs {
                    region,
                    product,
                    backend_url,
                    out,
                    opacity,
                },
                config,
            )
            .await
        }
        Commands::Bounds {
            south,
            west,
            north,
            east,
        } => bounds::run(south, west, north, east),
        Commands::Optimize {
            input,
            output,
            max_pixels,
        } => {
            optimize::run(
                OptimizeArgs {
                    input,
                    output,
                    max_pixels,
                },
                config,
            )
            .await
        }
        Commands::Config { command } => commands::config::run(command),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_process_flags() {
        let cli = Cli::try_parse_from([
            "lidarlayer",
            "process",
            "OR_WizardIsland.laz",
            "--no-quality",
            "--products",
            "dtm,hillshade",
            "--out",
            "overlays",
        ])
        .unwrap();
        match cli.command {
            Commands::Process { file, job } => {
                assert_eq!(file, PathBuf::from("OR_WizardIsland.laz"));
                assert!(job.no_quality);
                assert_eq!(
                    job.products,
                    Some(vec![RasterProduct::Dtm, RasterProduct::Hillshade])
                );
                assert_eq!(job.out, Some(PathBuf::from("overlays")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_negative_bounds() {
        let cli =
            Cli::try_parse_from(["lidarlayer", "bounds", "42.9", "-122.2", "42.96", "-122.1"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Bounds { west, .. } if west == -122.2
        ));
    }

    #[test]
    fn test_unknown_product_rejected() {
        assert!(Cli::try_parse_from(["lidarlayer", "overlay", "r", "lidar_soup"]).is_err());
    }
}
