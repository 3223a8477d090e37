//! Integration tests for the processing pipeline and overlay engine.
//!
//! These tests drive the public API only:
//! - upload → processing queue → summary, against a scripted backend
//! - finished products → overlay loader → map surface
//! - cancellation between steps with a custom step runner
//! - sizing decisions for very large rasters
//!
//! Run with: `cargo test --test pipeline_integration`

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, Rgb, RgbImage};
use parking_lot::Mutex;
use serde_json::{json, Value};

use lidarlayer::backend::{
    AsyncHttpClient, BackendClient, BackendError, FormValue, HttpResponse, MultipartForm,
    RasterProduct,
};
use lidarlayer::geo::GeoBounds;
use lidarlayer::notify::{NotificationLevel, Notifier};
use lidarlayer::optimizer::{ImageOptimizer, OptimizationProfile, OptimizeTrigger};
use lidarlayer::overlay::{
    BoxFuture, LayerId, MapSurface, OverlayDescriptor, OverlayError, OverlayLoader,
    OverlayRenderingEngine, OverlayStore, PresentOptions, SurfaceError,
};
use lidarlayer::processing::{
    JobContext, JobHandle, JobOutcome, JobState, ProcessingJob, ProcessingOptions,
    ProcessingOrchestrator, ProcessingStep, ProcessingStepRunner, QueueDisplay, QueueStatus,
    StepKind, StepOutcome, StepRunner,
};

// ============================================================================
// Test Doubles
// ============================================================================

/// Backend answering from a table of URL suffixes.
#[derive(Default)]
struct ScriptedBackend {
    routes: Mutex<HashMap<String, HttpResponse>>,
    posts: Mutex<Vec<(String, MultipartForm)>>,
}

impl ScriptedBackend {
    fn route(&self, suffix: &str, body: Value) {
        self.routes
            .lock()
            .insert(suffix.to_string(), HttpResponse::json(200, &body));
    }

    fn route_status(&self, suffix: &str, status: u16) {
        self.routes.lock().insert(
            suffix.to_string(),
            HttpResponse {
                status,
                body: Vec::new(),
            },
        );
    }

    fn answer(&self, url: &str) -> HttpResponse {
        let routes = self.routes.lock();
        routes
            .iter()
            .filter(|(suffix, _)| url.ends_with(suffix.as_str()))
            .max_by_key(|(suffix, _)| suffix.len())
            .map(|(_, response)| response.clone())
            .unwrap_or(HttpResponse {
                status: 404,
                body: Vec::new(),
            })
    }

    fn form_text(&self, suffix: &str, field: &str) -> Option<String> {
        self.posts
            .lock()
            .iter()
            .find(|(url, _)| url.ends_with(suffix))
            .and_then(|(_, form)| {
                form.fields().iter().find_map(|(name, value)| match value {
                    FormValue::Text(text) if name == field => Some(text.clone()),
                    _ => None,
                })
            })
    }
}

impl AsyncHttpClient for ScriptedBackend {
    async fn get(&self, url: &str) -> Result<HttpResponse, BackendError> {
        Ok(self.answer(url))
    }

    async fn post_multipart(
        &self,
        url: &str,
        form: MultipartForm,
    ) -> Result<HttpResponse, BackendError> {
        self.posts.lock().push((url.to_string(), form));
        Ok(self.answer(url))
    }
}

/// In-memory map.
#[derive(Default)]
struct MemoryMap {
    next: AtomicU64,
    layers: Mutex<HashMap<LayerId, OverlayDescriptor>>,
    viewport: Mutex<Option<GeoBounds>>,
}

impl MemoryMap {
    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.layers.lock().values().map(|d| d.key.clone()).collect();
        keys.sort();
        keys
    }
}

impl MapSurface for MemoryMap {
    fn add_image_overlay<'a>(
        &'a self,
        overlay: &'a OverlayDescriptor,
    ) -> BoxFuture<'a, Result<LayerId, SurfaceError>> {
        Box::pin(async move {
            let id = LayerId(self.next.fetch_add(1, Ordering::Relaxed));
            self.layers.lock().insert(id, overlay.clone());
            Ok(id)
        })
    }

    fn remove_overlay(&self, layer: LayerId) {
        self.layers.lock().remove(&layer);
    }

    fn set_opacity(&self, layer: LayerId, opacity: f64) {
        if let Some(d) = self.layers.lock().get_mut(&layer) {
            d.opacity = opacity;
        }
    }

    fn set_visible(&self, layer: LayerId, visible: bool) {
        if let Some(d) = self.layers.lock().get_mut(&layer) {
            d.visible = visible;
        }
    }

    fn fit_bounds(&self, bounds: &GeoBounds) {
        *self.viewport.lock() = Some(*bounds);
    }
}

#[derive(Default)]
struct Inbox {
    messages: Mutex<Vec<(NotificationLevel, String)>>,
}

impl Inbox {
    fn has(&self, level: NotificationLevel, needle: &str) -> bool {
        self.messages
            .lock()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl Notifier for Inbox {
    fn notify(&self, level: NotificationLevel, message: &str) {
        self.messages.lock().push((level, message.to_string()));
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

const REGION: &str = "OR_WizardIsland";

fn png_base64(width: u32, height: u32) -> String {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 90]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    STANDARD.encode(bytes)
}

/// Backend that accepts the upload and every processing step.
fn healthy_backend() -> ScriptedBackend {
    let backend = ScriptedBackend::default();
    backend.route(
        "api/upload",
        json!({"files": [{"inputFile": "OR_WizardIsland.laz"}]}),
    );
    backend.route("api/laz/density/analyze", json!({"success": true}));
    backend.route(
        "api/laz/mask",
        json!({
            "success": true,
            "mask_results": {"success": true, "clean_file": "OR_WizardIsland_clean.laz"}
        }),
    );
    for product in RasterProduct::all() {
        backend.route(&product.endpoint(), json!({"success": true}));
    }
    backend.route(
        "api/laz/metadata",
        json!({
            "success": true,
            "sentinel2_acquisition": {"attempted": true, "success": true}
        }),
    );
    backend
}

fn route_overlays(backend: &ScriptedBackend, products: &[RasterProduct]) {
    for product in products {
        backend.route(
            &format!("api/overlay/raster/{}/{}", REGION, product.id()),
            json!({
                "success": true,
                "bounds": [[42.90, -122.20], [42.96, -122.10]],
                "image_data": png_base64(64, 48),
            }),
        );
    }
}

fn options() -> ProcessingOptions {
    ProcessingOptions::default().with_products(vec![
        RasterProduct::Dtm,
        RasterProduct::Chm,
        RasterProduct::Hillshade,
    ])
}

// ============================================================================
// Integration Tests
// ============================================================================

/// A full upload runs the quality phase, products and metadata, and the
/// finished products can be shown on the map.
#[tokio::test]
async fn test_upload_to_overlays_end_to_end() {
    let temp = tempfile::tempdir().unwrap();
    let laz = temp.path().join("OR_WizardIsland.laz");
    std::fs::write(&laz, b"LASF fake point cloud").unwrap();

    let client = Arc::new(BackendClient::new(healthy_backend(), "http://backend"));
    let queue = Arc::new(QueueDisplay::new());
    let inbox = Arc::new(Inbox::default());
    let orchestrator = ProcessingOrchestrator::new(
        ProcessingStepRunner::new(client.clone()),
        queue.clone(),
        inbox.clone(),
    );

    let summary = orchestrator
        .run_upload(&laz, &options(), &JobHandle::new())
        .await
        .unwrap();

    assert_eq!(summary.region_id, REGION);
    assert_eq!(summary.outcome(), JobOutcome::FullSuccess);
    assert_eq!(summary.success_count, 7);
    assert_eq!(
        summary.generated_products,
        vec![RasterProduct::Dtm, RasterProduct::Chm, RasterProduct::Hillshade]
    );
    assert_eq!(queue.status("satellite"), Some(QueueStatus::Success));
    assert!(inbox.has(NotificationLevel::Success, "Processing complete"));

    let backend = client.http();
    assert_eq!(
        backend.form_text("api/laz/dtm", "clean_laz_path").as_deref(),
        Some("OR_WizardIsland_clean.laz")
    );
    assert_eq!(
        backend
            .form_text("api/laz/density/analyze", "generate_mask")
            .as_deref(),
        Some("false")
    );

    route_overlays(backend, &summary.generated_products);
    let map = Arc::new(MemoryMap::default());
    let engine = Arc::new(OverlayRenderingEngine::new(
        Arc::new(OverlayStore::new()),
        map.clone(),
        inbox.clone(),
        OptimizationProfile::default(),
    ));
    let loader = OverlayLoader::new(client.clone(), engine.clone())
        .with_options(PresentOptions::default().with_probe_decode(false));

    let results = loader.load_all(REGION, &summary.generated_products).await;

    assert!(results.iter().all(|(_, r)| matches!(r, Ok(true))));
    let expected = vec![
        "chm_OR_WizardIsland".to_string(),
        "dtm_OR_WizardIsland".to_string(),
        "hillshade_OR_WizardIsland".to_string(),
    ];
    assert_eq!(map.keys(), expected);
    assert_eq!(engine.active_keys(), expected);
    assert!(map.viewport.lock().is_some());

    // Reloading a product replaces its layer instead of stacking another.
    assert!(loader.load(REGION, RasterProduct::Dtm).await.unwrap());
    assert_eq!(map.layers.lock().len(), 3);

    engine.clear();
    assert!(map.keys().is_empty());
}

/// A failed upload never starts the queue.
#[tokio::test]
async fn test_failed_upload_fails_job() {
    let temp = tempfile::tempdir().unwrap();
    let laz = temp.path().join("Crater_Rim.laz");
    std::fs::write(&laz, b"LASF").unwrap();

    let backend = healthy_backend();
    backend.route_status("api/upload", 500);
    let inbox = Arc::new(Inbox::default());
    let orchestrator = ProcessingOrchestrator::new(
        ProcessingStepRunner::new(Arc::new(BackendClient::new(backend, "http://backend"))),
        Arc::new(QueueDisplay::new()),
        inbox.clone(),
    );

    let summary = orchestrator
        .run_upload(&laz, &options(), &JobHandle::new())
        .await
        .unwrap();

    assert_eq!(summary.state, JobState::Failed);
    assert_eq!(summary.region_id, "Crater_Rim");
    assert_eq!(summary.failed_steps, vec!["Upload".to_string()]);
    assert!(summary.generated_products.is_empty());
    assert!(inbox.has(NotificationLevel::Error, "Crater_Rim"));
}

/// A product the backend has no image for is reported, the rest still load.
#[tokio::test]
async fn test_missing_overlay_image_does_not_stop_others() {
    let backend = ScriptedBackend::default();
    route_overlays(&backend, &[RasterProduct::Dtm]);
    backend.route(
        &format!("api/overlay/raster/{}/slope", REGION),
        json!({"success": true, "bounds": [[42.90, -122.20], [42.96, -122.10]]}),
    );

    let client = Arc::new(BackendClient::new(backend, "http://backend"));
    let map = Arc::new(MemoryMap::default());
    let inbox = Arc::new(Inbox::default());
    let engine = Arc::new(OverlayRenderingEngine::new(
        Arc::new(OverlayStore::new()),
        map.clone(),
        inbox.clone(),
        OptimizationProfile::default(),
    ));
    let loader = OverlayLoader::new(client, engine);

    let results = loader
        .load_all(REGION, &[RasterProduct::Slope, RasterProduct::Dtm])
        .await;

    assert!(matches!(
        results[0].1,
        Err(OverlayError::MissingImage { .. })
    ));
    assert!(matches!(results[1].1, Ok(true)));
    assert_eq!(map.keys(), vec!["dtm_OR_WizardIsland".to_string()]);
    assert!(inbox.has(NotificationLevel::Error, "Slope"));
}

/// Runner that cancels its own job when it reaches a given step.
struct CancelAt {
    kind: StepKind,
    handle: JobHandle,
    ran: Mutex<Vec<StepKind>>,
}

impl StepRunner for CancelAt {
    async fn run(&self, step: &ProcessingStep, _context: &JobContext) -> StepOutcome {
        self.ran.lock().push(step.kind);
        if step.kind == self.kind {
            self.handle.cancel();
        }
        StepOutcome::success("done")
    }
}

/// Cancelling lets the current step finish and leaves later steps pending.
#[tokio::test]
async fn test_cancel_between_steps() {
    let handle = JobHandle::new();
    let runner = CancelAt {
        kind: StepKind::Product(RasterProduct::Chm),
        handle: handle.clone(),
        ran: Mutex::new(Vec::new()),
    };
    let queue = Arc::new(QueueDisplay::new());
    let inbox = Arc::new(Inbox::default());
    let orchestrator = ProcessingOrchestrator::new(runner, queue.clone(), inbox.clone());

    let mut job = ProcessingJob::new(
        JobContext::new(REGION, &ProcessingOptions::default()),
        vec![
            ProcessingStep::product(RasterProduct::Dtm),
            ProcessingStep::product(RasterProduct::Chm),
            ProcessingStep::remaining(vec![RasterProduct::Hillshade, RasterProduct::Slope]),
        ],
    )
    .with_handle(handle);

    let summary = orchestrator.run(&mut job).await;

    assert_eq!(job.state, JobState::Cancelled);
    assert_eq!(summary.outcome(), JobOutcome::Cancelled);
    assert_eq!(job.results.len(), 2);
    assert_eq!(
        *orchestrator.runner().ran.lock(),
        vec![
            StepKind::Product(RasterProduct::Dtm),
            StepKind::Product(RasterProduct::Chm)
        ]
    );
    assert_eq!(queue.status("remaining_products"), Some(QueueStatus::Pending));
    assert_eq!(queue.status("chm"), Some(QueueStatus::Success));
    assert!(inbox.has(NotificationLevel::Info, "cancelled"));
}

/// A 40000x30000 scene is planned down to the fallback caps without
/// decoding any pixels.
#[test]
fn test_plan_for_very_large_scene() {
    let optimizer = ImageOptimizer::new(OptimizationProfile::default());
    let plan = optimizer.plan(40_000, 30_000, 60 * 1024 * 1024);

    assert!(plan.is_needed());
    assert!(plan.triggers.contains(&OptimizeTrigger::PixelsExceeded));
    assert!(plan.triggers.contains(&OptimizeTrigger::EncodedSizeExceeded));
    assert_eq!(plan.scale, 0.25);
    assert_eq!(plan.target, (4096, 3072));
}
