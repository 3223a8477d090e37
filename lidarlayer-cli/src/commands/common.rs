//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use lidarlayer::backend::{BackendClient, BackendConfig, RasterProduct, ReqwestClient};
use lidarlayer::config::ConfigFile;
use lidarlayer::notify::Notifier;
use lidarlayer::processing::{JobHandle, JobOutcome, JobSummary, ProcessingOptions};

use super::overlay::export_products;
use crate::error::CliError;

/// Flags shared by the commands that run processing jobs.
#[derive(Debug, Clone, Default, Args)]
pub struct JobArgs {
    /// Backend base URL (overrides backend.url)
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Export overlays of the generated products into this directory
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Skip density analysis, mask generation and quality DTM
    #[arg(long)]
    pub no_quality: bool,

    /// Products to generate, comma separated (e.g. dtm,chm,hillshade)
    #[arg(long, value_delimiter = ',')]
    pub products: Option<Vec<RasterProduct>>,
}

/// Backend settings: CLI flag > config file.
pub fn resolve_backend(url: Option<String>, config: &ConfigFile) -> BackendConfig {
    let mut backend = config.backend_config();
    if let Some(url) = url {
        backend.base_url = url;
    }
    backend
}

/// Processing options: CLI flags > config file.
pub fn resolve_options(args: &JobArgs, config: &ConfigFile) -> Result<ProcessingOptions, CliError> {
    let mut options = config.processing_options();
    if args.no_quality {
        options = options.with_quality_mode(false);
    }
    if let Some(products) = &args.products {
        if products.is_empty() {
            return Err(CliError::Config(
                "--products needs at least one product".to_string(),
            ));
        }
        options = options.with_products(products.clone());
    }
    Ok(options)
}

pub fn build_client(backend: &BackendConfig) -> Result<Arc<BackendClient<ReqwestClient>>, CliError> {
    Ok(Arc::new(BackendClient::from_config(backend)?))
}

/// Cancels `handle` on Ctrl+C.
pub fn install_cancel_handler(handle: JobHandle) -> Result<(), CliError> {
    ctrlc::set_handler(move || {
        println!();
        println!("Received interrupt, stopping after the current step...");
        handle.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))
}

/// Exports overlays when requested and maps the outcome to an exit status.
pub async fn finish_job(
    summary: JobSummary,
    client: Arc<BackendClient<ReqwestClient>>,
    out: Option<PathBuf>,
    config: &ConfigFile,
    notifier: Arc<dyn Notifier>,
) -> Result<(), CliError> {
    if let Some(dir) = out {
        if summary.generated_products.is_empty() {
            println!("No products to export.");
        } else {
            let exported = export_products(
                client,
                &summary.region_id,
                &summary.generated_products,
                &dir,
                config,
                notifier,
            )
            .await?;
            println!(
                "Exported {} of {} overlay(s) to {}",
                exported,
                summary.generated_products.len(),
                dir.display()
            );
        }
    }

    match summary.outcome() {
        JobOutcome::Failure => Err(CliError::JobFailed(summary.message())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_url_override() {
        let config = ConfigFile::default();
        let backend = resolve_backend(Some("http://gpu-box:9000".to_string()), &config);
        assert_eq!(backend.base_url, "http://gpu-box:9000");
        assert_eq!(resolve_backend(None, &config).base_url, config.backend.url);
    }

    #[test]
    fn test_job_flags_override_config() {
        let args = JobArgs {
            no_quality: true,
            products: Some(vec![RasterProduct::Dtm, RasterProduct::Slope]),
            ..Default::default()
        };
        let options = resolve_options(&args, &ConfigFile::default()).unwrap();
        assert!(!options.quality_mode);
        assert_eq!(options.products, vec![RasterProduct::Dtm, RasterProduct::Slope]);
    }

    #[test]
    fn test_empty_product_list_rejected() {
        let args = JobArgs {
            products: Some(Vec::new()),
            ..Default::default()
        };
        assert!(matches!(
            resolve_options(&args, &ConfigFile::default()),
            Err(CliError::Config(_))
        ));
    }
}
