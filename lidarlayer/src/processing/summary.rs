//! Aggregated job results.

use std::time::Duration;

use crate::backend::RasterProduct;

use super::job::{JobState, ProcessingJob, StepStatus};

/// How a finished job is reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    FullSuccess,
    PartialSuccess,
    Failure,
    Cancelled,
}

/// Final tally of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSummary {
    pub region_id: String,
    pub state: JobState,
    pub success_count: usize,
    /// Names of failed steps, in execution order.
    pub failed_steps: Vec<String>,
    pub skipped_steps: Vec<String>,
    /// Products whose steps succeeded.
    pub generated_products: Vec<RasterProduct>,
    pub elapsed: Duration,
}

impl JobSummary {
    pub fn from_job(job: &ProcessingJob, elapsed: Duration) -> Self {
        let names = |status: StepStatus| -> Vec<String> {
            job.results
                .iter()
                .filter(|r| r.outcome.status == status)
                .map(|r| r.name.clone())
                .collect()
        };
        Self {
            region_id: job.context.region_id.clone(),
            state: job.state,
            success_count: job.success_count(),
            failed_steps: names(StepStatus::Failed),
            skipped_steps: names(StepStatus::Skipped),
            generated_products: job.generated_products(),
            elapsed,
        }
    }

    pub fn outcome(&self) -> JobOutcome {
        match self.state {
            JobState::Cancelled => JobOutcome::Cancelled,
            JobState::Failed => JobOutcome::Failure,
            _ if self.failed_steps.is_empty() => JobOutcome::FullSuccess,
            _ if self.success_count > 0 => JobOutcome::PartialSuccess,
            _ => JobOutcome::Failure,
        }
    }

    /// User-visible summary line.
    pub fn message(&self) -> String {
        match self.outcome() {
            JobOutcome::FullSuccess => format!(
                "Processing complete for {}: {} step(s) succeeded",
                self.region_id, self.success_count
            ),
            JobOutcome::PartialSuccess => format!(
                "Processing finished for {} with errors: {} succeeded, failed: {}",
                self.region_id,
                self.success_count,
                self.failed_steps.join(", ")
            ),
            JobOutcome::Failure if self.failed_steps.is_empty() => {
                format!("Processing failed for {}", self.region_id)
            }
            JobOutcome::Failure => format!(
                "Processing failed for {}: {}",
                self.region_id,
                self.failed_steps.join(", ")
            ),
            JobOutcome::Cancelled => format!(
                "Processing cancelled for {} after {} successful step(s)",
                self.region_id, self.success_count
            ),
        }
    }
}
