//! Executing a single step against the backend.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::{
    AsyncHttpClient, BackendClient, DensityRequest, MaskRequest, MetadataRequest, ProductRequest,
    RasterProduct,
};

use super::job::{JobContext, StepOutcome};
use super::step::{ProcessingStep, StepKind};

/// Runs one step and reports how it went.
///
/// Implementations never retry and never panic on backend failure; every
/// failure becomes a [`StepOutcome`] with `Failed` status.
pub trait StepRunner: Send + Sync {
    fn run(
        &self,
        step: &ProcessingStep,
        context: &JobContext,
    ) -> impl Future<Output = StepOutcome> + Send;
}

/// Step runner backed by the processing backend.
pub struct ProcessingStepRunner<C> {
    client: Arc<BackendClient<C>>,
}

impl<C: AsyncHttpClient> ProcessingStepRunner<C> {
    pub fn new(client: Arc<BackendClient<C>>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<BackendClient<C>> {
        &self.client
    }

    async fn density_analysis(&self, context: &JobContext) -> StepOutcome {
        let Some(source) = context.source_file.clone() else {
            return StepOutcome::failed("No source point cloud for density analysis");
        };
        let request = DensityRequest {
            laz_file_path: source,
            region_name: context.region_id.clone(),
            resolution: context.resolution,
            mask_threshold: context.mask_threshold,
            generate_mask: false,
        };
        match self.client.analyze_density(&request).await {
            Ok(response) => {
                let clean = clean_file_of(&response);
                StepOutcome::success(
                    response
                        .message
                        .unwrap_or_else(|| "Density analysis complete".to_string()),
                )
                .with_clean_file(clean)
            }
            Err(e) => StepOutcome::failed(e.to_string()),
        }
    }

    async fn mask_generation(&self, context: &JobContext) -> StepOutcome {
        let Some(source) = context.source_file.clone() else {
            return StepOutcome::failed("No source point cloud for mask generation");
        };
        let request = MaskRequest {
            laz_file_path: source,
            region_name: context.region_id.clone(),
            mask_threshold: context.mask_threshold,
        };
        match self.client.generate_mask(&request).await {
            Ok(response) => {
                let clean = clean_file_of(&response);
                if clean.is_none() {
                    debug!(region = %context.region_id, "Mask produced no cleaned point cloud");
                }
                StepOutcome::success(
                    response
                        .message
                        .unwrap_or_else(|| "Mask generated".to_string()),
                )
                .with_clean_file(clean)
            }
            Err(e) => StepOutcome::failed(e.to_string()),
        }
    }

    fn product_request(&self, product: RasterProduct, context: &JobContext) -> ProductRequest {
        let mut request = ProductRequest::new(&context.region_id, product, context.resolution);
        request.source_file = context.source_file.clone();
        request.hillshade = context.hillshade;
        request
    }

    async fn quality_dtm(&self, context: &JobContext) -> StepOutcome {
        let mut request = self.product_request(RasterProduct::Dtm, context);
        match &context.clean_file {
            Some(clean) => {
                request.quality_mode = true;
                request.clean_file = Some(clean.clone());
            }
            None => warn!(
                region = %context.region_id,
                "No cleaned point cloud, generating DTM with standard parameters"
            ),
        }
        self.product(request).await
    }

    async fn product(&self, request: ProductRequest) -> StepOutcome {
        let name = request.product.display_name();
        match self.client.generate_product(&request).await {
            Ok(response) => StepOutcome::success(
                response
                    .message
                    .unwrap_or_else(|| format!("{} generated", name)),
            ),
            Err(e) => StepOutcome::failed(format!("{}: {}", name, e)),
        }
    }

    async fn batch(&self, products: &[RasterProduct], context: &JobContext) -> StepOutcome {
        let mut failed = Vec::new();
        for &product in products {
            let outcome = self.product(self.product_request(product, context)).await;
            if !outcome.is_success() {
                warn!(product = product.id(), detail = %outcome.detail, "Product generation failed");
                failed.push(product.display_name());
            }
        }
        if failed.is_empty() {
            StepOutcome::success(format!("{} products generated", products.len()))
        } else {
            StepOutcome::failed(format!("Failed: {}", failed.join(", ")))
        }
    }

    async fn metadata(&self, context: &JobContext) -> StepOutcome {
        let request = MetadataRequest {
            region_name: context.region_id.clone(),
            file_name: context
                .source_file
                .clone()
                .unwrap_or_else(|| context.region_id.clone()),
        };
        match self.client.generate_metadata(&request).await {
            Ok(response) => StepOutcome::success(
                response
                    .message
                    .unwrap_or_else(|| "Metadata generated".to_string()),
            )
            .with_satellite(response.sentinel2_acquisition),
            Err(e) => StepOutcome::failed(e.to_string()),
        }
    }
}

fn clean_file_of(response: &crate::backend::QualityResponse) -> Option<String> {
    if !response.clean_available() {
        return None;
    }
    response
        .mask_results
        .as_ref()
        .and_then(|m| m.clean_file.clone())
}

impl<C: AsyncHttpClient> StepRunner for ProcessingStepRunner<C> {
    async fn run(&self, step: &ProcessingStep, context: &JobContext) -> StepOutcome {
        debug!(step = step.kind.id(), region = %context.region_id, "Running step");
        match step.kind {
            StepKind::Upload => StepOutcome::skipped("Uploads happen before the queue starts"),
            StepKind::DensityAnalysis => self.density_analysis(context).await,
            StepKind::MaskGeneration => self.mask_generation(context).await,
            StepKind::QualityDtm => self.quality_dtm(context).await,
            StepKind::Product(product) => {
                self.product(self.product_request(product, context)).await
            }
            StepKind::RemainingProducts => self.batch(&step.products, context).await,
            StepKind::Metadata => self.metadata(context).await,
            StepKind::SatelliteAcquisition => {
                StepOutcome::skipped("Satellite imagery is reported by metadata generation")
            }
        }
    }
}
