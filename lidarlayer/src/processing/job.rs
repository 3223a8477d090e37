//! Processing job state.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::backend::{HillshadeParams, RasterProduct, SatelliteAcquisition};

use super::queue::ProcessingOptions;
use super::step::{ProcessingStep, StepKind};

/// Lifecycle of a job.
///
/// `Completed` means every step was attempted; whether they succeeded is a
/// property of the results, not of the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    /// Executing the step at this index.
    Running(usize),
    Completed,
    Cancelled,
    /// The job could not start (e.g. the upload failed).
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Cancelled | JobState::Failed
        )
    }
}

/// Result status of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Success,
    Failed,
    /// Not applicable; excluded from failure counts.
    Skipped,
}

/// What a step reported back.
///
/// Besides the status, an outcome carries facts later steps depend on.
/// The orchestrator folds them into the [`JobContext`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub status: StepStatus,
    pub detail: String,
    /// Cleaned point cloud produced by the quality phase.
    pub clean_file: Option<String>,
    /// Satellite acquisition reported by the metadata step.
    pub satellite: Option<SatelliteAcquisition>,
}

impl StepOutcome {
    pub fn success(detail: impl Into<String>) -> Self {
        Self::with_status(StepStatus::Success, detail)
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self::with_status(StepStatus::Failed, detail)
    }

    pub fn skipped(detail: impl Into<String>) -> Self {
        Self::with_status(StepStatus::Skipped, detail)
    }

    fn with_status(status: StepStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
            clean_file: None,
            satellite: None,
        }
    }

    pub fn with_clean_file(mut self, clean_file: Option<String>) -> Self {
        self.clean_file = clean_file;
        self
    }

    pub fn with_satellite(mut self, satellite: Option<SatelliteAcquisition>) -> Self {
        self.satellite = satellite;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// Recorded result of an attempted step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub kind: StepKind,
    pub name: String,
    /// Products the step was asked to generate.
    pub products: Vec<RasterProduct>,
    pub outcome: StepOutcome,
    pub elapsed: Duration,
}

/// Inputs shared by every step of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobContext {
    pub region_id: String,
    /// Point cloud the region was created from, when known.
    pub source_file: Option<String>,
    pub resolution: f64,
    pub mask_threshold: f64,
    pub hillshade: HillshadeParams,
    /// Set once the quality phase produced a cleaned point cloud.
    pub clean_file: Option<String>,
    /// Set once metadata generation reported on satellite imagery.
    pub satellite: Option<SatelliteAcquisition>,
}

impl JobContext {
    pub fn new(region_id: impl Into<String>, options: &ProcessingOptions) -> Self {
        Self {
            region_id: region_id.into(),
            source_file: None,
            resolution: options.resolution,
            mask_threshold: options.mask_threshold,
            hillshade: options.hillshade,
            clean_file: None,
            satellite: None,
        }
    }

    pub fn with_source_file(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }

    /// Folds facts reported by a step into the context.
    pub(crate) fn absorb(&mut self, outcome: &StepOutcome) {
        if outcome.clean_file.is_some() {
            self.clean_file = outcome.clean_file.clone();
        }
        if outcome.satellite.is_some() {
            self.satellite = outcome.satellite;
        }
    }
}

/// Handle for cancelling a job from another task.
///
/// Cancellation is cooperative: the step in flight finishes, the next one
/// never starts.
#[derive(Debug, Clone, Default)]
pub struct JobHandle {
    token: CancellationToken,
}

impl JobHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// A queue of steps to run for one region.
#[derive(Debug, Clone)]
pub struct ProcessingJob {
    pub context: JobContext,
    pub steps: Vec<ProcessingStep>,
    pub state: JobState,
    /// Results of attempted steps, in execution order.
    pub results: Vec<StepResult>,
    handle: JobHandle,
}

impl ProcessingJob {
    pub fn new(context: JobContext, steps: Vec<ProcessingStep>) -> Self {
        Self {
            context,
            steps,
            state: JobState::Idle,
            results: Vec::new(),
            handle: JobHandle::new(),
        }
    }

    /// Uses an existing handle, so a job can be cancelled before it exists.
    pub fn with_handle(mut self, handle: JobHandle) -> Self {
        self.handle = handle;
        self
    }

    pub fn handle(&self) -> JobHandle {
        self.handle.clone()
    }

    pub fn result(&self, kind: StepKind) -> Option<&StepResult> {
        self.results.iter().find(|r| r.kind == kind)
    }

    pub fn success_count(&self) -> usize {
        self.count(StepStatus::Success)
    }

    /// Products of every successful step, in execution order.
    pub fn generated_products(&self) -> Vec<RasterProduct> {
        self.results
            .iter()
            .filter(|r| r.outcome.is_success())
            .flat_map(|r| r.products.iter().copied())
            .collect()
    }

    /// True if any raster-producing step succeeded.
    pub fn any_product_succeeded(&self) -> bool {
        self.results
            .iter()
            .any(|r| r.kind.is_product_step() && r.outcome.is_success())
    }

    fn count(&self, status: StepStatus) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome.status == status)
            .count()
    }
}
