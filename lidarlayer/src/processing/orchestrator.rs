//! Sequencing processing steps for a job.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::backend::{AsyncHttpClient, SatelliteAcquisition};
use crate::notify::{NotificationLevel, Notifier};

use super::error::ProcessingError;
use super::job::{JobContext, JobHandle, JobState, ProcessingJob, StepOutcome, StepResult, StepStatus};
use super::progress::{ProgressReporter, QueueStatus, StepProgress};
use super::queue::{ProcessingOptions, QueueBuilder};
use super::runner::{ProcessingStepRunner, StepRunner};
use super::step::{ProcessingStep, StepKind};
use super::summary::{JobOutcome, JobSummary};

/// Runs processing jobs one step at a time.
///
/// Steps of a job never overlap. A failed step is recorded and the queue
/// moves on; cancellation is honoured only between steps.
pub struct ProcessingOrchestrator<R> {
    runner: R,
    reporter: Arc<dyn ProgressReporter>,
    notifier: Arc<dyn Notifier>,
}

impl<R: StepRunner> ProcessingOrchestrator<R> {
    pub fn new(
        runner: R,
        reporter: Arc<dyn ProgressReporter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            runner,
            reporter,
            notifier,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Runs every step of `job` and returns the aggregated summary.
    pub async fn run(&self, job: &mut ProcessingJob) -> JobSummary {
        let start = Instant::now();
        let handle = job.handle();
        let total = job.steps.len();
        let steps = job.steps.clone();

        info!(region = %job.context.region_id, steps = total, "Processing job started");
        self.reporter.queue_started(&steps);

        job.state = JobState::Completed;
        for (index, step) in steps.iter().enumerate() {
            if handle.token().is_cancelled() {
                info!(
                    region = %job.context.region_id,
                    next_step = step.name(),
                    "Processing cancelled"
                );
                job.state = JobState::Cancelled;
                break;
            }

            job.state = JobState::Running(index);
            self.reporter.report(&StepProgress::new(step, index, total));
            self.reporter.step_status(step.kind, QueueStatus::Running);

            let step_start = Instant::now();
            let outcome = self.execute(step, job).await;
            job.context.absorb(&outcome);

            match outcome.status {
                StepStatus::Success => info!(step = step.name(), "Step succeeded"),
                StepStatus::Failed => {
                    warn!(step = step.name(), detail = %outcome.detail, "Step failed")
                }
                StepStatus::Skipped => info!(step = step.name(), detail = %outcome.detail, "Step skipped"),
            }
            self.reporter.step_status(step.kind, queue_status(outcome.status));

            job.results.push(StepResult {
                kind: step.kind,
                name: step.name().to_string(),
                products: step.products.clone(),
                outcome,
                elapsed: step_start.elapsed(),
            });
            job.state = JobState::Completed;
        }

        self.finish(job, start)
    }

    /// Dispatches a step, or derives its outcome when it needs no request.
    async fn execute(&self, step: &ProcessingStep, job: &ProcessingJob) -> StepOutcome {
        match step.kind {
            StepKind::Metadata if !job.any_product_succeeded() => {
                StepOutcome::skipped("No raster product succeeded")
            }
            StepKind::SatelliteAcquisition => satellite_outcome(job),
            _ => self.runner.run(step, &job.context).await,
        }
    }

    fn finish(&self, job: &ProcessingJob, start: Instant) -> JobSummary {
        let summary = JobSummary::from_job(job, start.elapsed());
        self.reporter.finished(&summary);
        let level = match summary.outcome() {
            JobOutcome::FullSuccess => NotificationLevel::Success,
            JobOutcome::PartialSuccess => NotificationLevel::Warning,
            JobOutcome::Failure => NotificationLevel::Error,
            JobOutcome::Cancelled => NotificationLevel::Info,
        };
        self.notifier.notify(level, &summary.message());
        summary
    }

    /// Builds and runs a job for an existing region.
    pub async fn run_region(
        &self,
        context: JobContext,
        options: &ProcessingOptions,
        handle: &JobHandle,
    ) -> Result<(ProcessingJob, JobSummary), ProcessingError> {
        let steps = QueueBuilder::build(options)?;
        let mut job = ProcessingJob::new(context, steps).with_handle(handle.clone());
        let summary = self.run(&mut job).await;
        Ok((job, summary))
    }

    /// Records a job that could not start.
    fn fail_before_start(&self, region: &str, reason: &str, options: &ProcessingOptions) -> JobSummary {
        let mut job = ProcessingJob::new(JobContext::new(region, options), Vec::new());
        job.results.push(StepResult {
            kind: StepKind::Upload,
            name: StepKind::Upload.display_name().to_string(),
            products: Vec::new(),
            outcome: StepOutcome::failed(reason),
            elapsed: std::time::Duration::ZERO,
        });
        job.state = JobState::Failed;
        self.finish(&job, Instant::now())
    }
}

impl<C: AsyncHttpClient> ProcessingOrchestrator<ProcessingStepRunner<C>> {
    /// Uploads a point cloud, then processes the region it creates.
    ///
    /// An upload failure ends the job in [`JobState::Failed`].
    pub async fn run_upload(
        &self,
        path: &Path,
        options: &ProcessingOptions,
        handle: &JobHandle,
    ) -> Result<JobSummary, ProcessingError> {
        QueueBuilder::build(options)?;

        let (region, source_file) = match self.upload(path).await {
            Ok(uploaded) => uploaded,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Upload failed");
                let region = region_from_file_name(&path.to_string_lossy())
                    .unwrap_or_else(|_| path.display().to_string());
                return Ok(self.fail_before_start(&region, &e.to_string(), options));
            }
        };

        info!(region = %region, file = %source_file, "Upload complete");
        let context = JobContext::new(region, options).with_source_file(source_file);
        let (_, summary) = self.run_region(context, options, handle).await?;
        Ok(summary)
    }

    async fn upload(&self, path: &Path) -> Result<(String, String), ProcessingError> {
        let response = self.runner.client().upload(path).await?;
        let source_file = response
            .files
            .first()
            .map(|f| f.input_file.clone())
            .ok_or_else(|| ProcessingError::InvalidRegion(path.display().to_string()))?;
        let region = region_from_file_name(&source_file)?;
        Ok((region, source_file))
    }

    /// Generates standard products for an existing region, without the
    /// quality phase or metadata.
    pub async fn run_generate_all(
        &self,
        region: &str,
        options: &ProcessingOptions,
        handle: &JobHandle,
    ) -> Result<JobSummary, ProcessingError> {
        let options = options.clone().with_quality_mode(false).with_metadata(false);
        let context = JobContext::new(region, &options);
        let (_, summary) = self.run_region(context, &options, handle).await?;
        Ok(summary)
    }
}

fn queue_status(status: StepStatus) -> QueueStatus {
    match status {
        StepStatus::Success => QueueStatus::Success,
        StepStatus::Failed => QueueStatus::Error,
        StepStatus::Skipped => QueueStatus::Skipped,
    }
}

fn satellite_outcome(job: &ProcessingJob) -> StepOutcome {
    let metadata_ok = job
        .result(StepKind::Metadata)
        .is_some_and(|r| r.outcome.is_success());
    match job.context.satellite {
        Some(SatelliteAcquisition {
            attempted: true,
            success,
        }) if metadata_ok => {
            if success {
                StepOutcome::success("Satellite imagery acquired")
            } else {
                StepOutcome::failed("Satellite imagery acquisition failed")
            }
        }
        _ => StepOutcome::skipped("Satellite imagery not attempted"),
    }
}

/// Region name for an uploaded file: its stem without directories.
pub fn region_from_file_name(file_name: &str) -> Result<String, ProcessingError> {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .unwrap_or_default();
    if stem.is_empty() {
        return Err(ProcessingError::InvalidRegion(file_name.to_string()));
    }
    Ok(stem)
}
