//! Overlay command - export a finished raster product as a map overlay.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lidarlayer::backend::{AsyncHttpClient, BackendClient, RasterProduct};
use lidarlayer::config::ConfigFile;
use lidarlayer::notify::Notifier;
use lidarlayer::overlay::{OverlayLoader, OverlayRenderingEngine, OverlayStore};

use super::common::{build_client, resolve_backend};
use crate::error::CliError;
use crate::progress::ConsoleNotifier;
use crate::surface::ExportSurface;

/// Arguments for the overlay command.
pub struct OverlayArgs {
    pub region: String,
    pub product: RasterProduct,
    pub backend_url: Option<String>,
    pub out: PathBuf,
    pub opacity: Option<f64>,
}

/// Run the overlay command.
pub async fn run(args: OverlayArgs, config: &ConfigFile) -> Result<(), CliError> {
    let backend = resolve_backend(args.backend_url, config);
    let client = build_client(&backend)?;
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);

    let mut config = config.clone();
    if let Some(opacity) = args.opacity {
        config.overlay.default_opacity = opacity;
    }

    let loader = loader(client, &args.out, &config, notifier)?;
    let key = args.product.overlay_key(&args.region);
    if !loader.load(&args.region, args.product).await? {
        return Err(CliError::NotPresented(key));
    }

    println!("Exported {} to {}", key, args.out.display());
    Ok(())
}

/// Exports overlays for `products` into `dir`, returning how many were shown.
///
/// Products that fail to load are reported through `notifier` and skipped.
pub async fn export_products<C: AsyncHttpClient>(
    client: Arc<BackendClient<C>>,
    region: &str,
    products: &[RasterProduct],
    dir: &Path,
    config: &ConfigFile,
    notifier: Arc<dyn Notifier>,
) -> Result<usize, CliError> {
    let loader = loader(client, dir, config, notifier)?;
    let results = loader.load_all(region, products).await;
    Ok(results.iter().filter(|(_, r)| matches!(r, Ok(true))).count())
}

fn loader<C: AsyncHttpClient>(
    client: Arc<BackendClient<C>>,
    dir: &Path,
    config: &ConfigFile,
    notifier: Arc<dyn Notifier>,
) -> Result<OverlayLoader<C>, CliError> {
    std::fs::create_dir_all(dir)?;
    let surface = Arc::new(ExportSurface::new(dir));
    let engine = OverlayRenderingEngine::new(
        Arc::new(OverlayStore::new()),
        surface,
        notifier,
        config.optimization_profile(),
    );
    // The export directory has no viewport worth moving.
    let options = config.present_options().with_fit_bounds(false);
    Ok(OverlayLoader::new(client, Arc::new(engine)).with_options(options))
}
