//! Building the ordered step list for a job.

use crate::backend::{HillshadeParams, RasterProduct};

use super::error::ProcessingError;
use super::step::{ProcessingStep, StepKind};

/// Default output resolution in metres.
pub const DEFAULT_RESOLUTION: f64 = 1.0;

/// Default density threshold for the low-density mask.
pub const DEFAULT_MASK_THRESHOLD: f64 = 0.5;

/// What a processing job should produce.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOptions {
    /// Run density analysis, masking and quality DTM first.
    pub quality_mode: bool,
    /// Requested products, in any order.
    pub products: Vec<RasterProduct>,
    /// Finish with metadata (and satellite imagery) generation.
    pub include_metadata: bool,
    pub resolution: f64,
    pub mask_threshold: f64,
    pub hillshade: HillshadeParams,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            quality_mode: true,
            products: RasterProduct::all().to_vec(),
            include_metadata: true,
            resolution: DEFAULT_RESOLUTION,
            mask_threshold: DEFAULT_MASK_THRESHOLD,
            hillshade: HillshadeParams::default(),
        }
    }
}

impl ProcessingOptions {
    pub fn with_quality_mode(mut self, enabled: bool) -> Self {
        self.quality_mode = enabled;
        self
    }

    pub fn with_products(mut self, products: Vec<RasterProduct>) -> Self {
        self.products = products;
        self
    }

    pub fn with_metadata(mut self, enabled: bool) -> Self {
        self.include_metadata = enabled;
        self
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_mask_threshold(mut self, threshold: f64) -> Self {
        self.mask_threshold = threshold;
        self
    }

    pub fn with_hillshade(mut self, hillshade: HillshadeParams) -> Self {
        self.hillshade = hillshade;
        self
    }

    fn wants(&self, product: RasterProduct) -> bool {
        self.products.contains(&product)
    }
}

/// Builds processing queues.
///
/// Order: quality phase (or a standard DTM), CHM, one batch step for the
/// remaining products, then metadata and satellite imagery.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueBuilder;

impl QueueBuilder {
    pub fn build(options: &ProcessingOptions) -> Result<Vec<ProcessingStep>, ProcessingError> {
        let mut steps = Vec::new();

        if options.quality_mode {
            steps.push(ProcessingStep::new(StepKind::DensityAnalysis));
            steps.push(ProcessingStep::new(StepKind::MaskGeneration));
            steps.push(ProcessingStep::new(StepKind::QualityDtm));
        } else if options.wants(RasterProduct::Dtm) {
            steps.push(ProcessingStep::product(RasterProduct::Dtm));
        }

        if options.wants(RasterProduct::Chm) {
            steps.push(ProcessingStep::product(RasterProduct::Chm));
        }

        let remaining: Vec<RasterProduct> = RasterProduct::all()
            .iter()
            .copied()
            .filter(|p| !matches!(p, RasterProduct::Dtm | RasterProduct::Chm))
            .filter(|p| options.wants(*p))
            .collect();
        if !remaining.is_empty() {
            steps.push(ProcessingStep::remaining(remaining));
        }

        if !steps.iter().any(|s| s.kind.is_product_step()) {
            return Err(ProcessingError::EmptyQueue);
        }

        if options.include_metadata {
            steps.push(ProcessingStep::new(StepKind::Metadata));
            steps.push(ProcessingStep::new(StepKind::SatelliteAcquisition));
        }

        Ok(steps)
    }
}
