//! Processing steps.

use std::fmt;

use crate::backend::RasterProduct;

/// Kind of backend work a step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Point-cloud upload preceding the queue.
    Upload,
    DensityAnalysis,
    MaskGeneration,
    /// DTM generated from the cleaned point cloud when one exists.
    QualityDtm,
    Product(RasterProduct),
    /// Every requested product not given a step of its own.
    RemainingProducts,
    Metadata,
    /// Derived from the metadata response; never dispatched on its own.
    SatelliteAcquisition,
}

impl StepKind {
    /// Stable identifier, used to key the queue display.
    pub fn id(&self) -> &'static str {
        match self {
            StepKind::Upload => "upload",
            StepKind::DensityAnalysis => "density_analysis",
            StepKind::MaskGeneration => "mask_generation",
            StepKind::QualityDtm => "quality_dtm",
            StepKind::Product(product) => product.id(),
            StepKind::RemainingProducts => "remaining_products",
            StepKind::Metadata => "metadata",
            StepKind::SatelliteAcquisition => "satellite",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StepKind::Upload => "Upload",
            StepKind::DensityAnalysis => "Density Analysis",
            StepKind::MaskGeneration => "Mask Generation",
            StepKind::QualityDtm => "Quality DTM",
            StepKind::Product(product) => product.display_name(),
            StepKind::RemainingProducts => "Remaining Products",
            StepKind::Metadata => "Metadata",
            StepKind::SatelliteAcquisition => "Satellite Imagery",
        }
    }

    /// True for the preprocessing phase that runs before any product.
    pub fn is_quality_mode_step(&self) -> bool {
        matches!(
            self,
            StepKind::DensityAnalysis | StepKind::MaskGeneration | StepKind::QualityDtm
        )
    }

    /// True for steps that produce a raster.
    pub fn is_product_step(&self) -> bool {
        matches!(
            self,
            StepKind::QualityDtm | StepKind::Product(_) | StepKind::RemainingProducts
        )
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One entry of a processing queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingStep {
    pub kind: StepKind,
    /// Products this step generates.
    pub products: Vec<RasterProduct>,
}

impl ProcessingStep {
    pub fn new(kind: StepKind) -> Self {
        let products = match kind {
            StepKind::QualityDtm => vec![RasterProduct::Dtm],
            StepKind::Product(product) => vec![product],
            _ => Vec::new(),
        };
        Self { kind, products }
    }

    pub fn product(product: RasterProduct) -> Self {
        Self::new(StepKind::Product(product))
    }

    /// Batch step generating several products in order.
    pub fn remaining(products: Vec<RasterProduct>) -> Self {
        Self {
            kind: StepKind::RemainingProducts,
            products,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.display_name()
    }
}
