//! Progress reporting for processing jobs.
//!
//! The orchestrator knows nothing about how progress is shown. It calls a
//! [`ProgressReporter`] before each step, whenever a step changes status,
//! and once when the job ends.

use parking_lot::Mutex;
use tracing::info;

use super::step::{ProcessingStep, StepKind};
use super::summary::JobSummary;

/// Position of the step about to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepProgress {
    pub kind: StepKind,
    pub name: String,
    /// Zero-based.
    pub index: usize,
    pub total: usize,
}

impl StepProgress {
    pub fn new(step: &ProcessingStep, index: usize, total: usize) -> Self {
        Self {
            kind: step.kind,
            name: step.name().to_string(),
            index,
            total,
        }
    }

    /// `round((index + 1) / total * 100)`.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.index + 1) as f64 / self.total as f64 * 100.0).round() as u8
    }
}

/// Per-step status shown in the queue display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Pending,
    Running,
    Success,
    Error,
    Skipped,
}

/// Receives progress from the orchestrator.
pub trait ProgressReporter: Send + Sync {
    /// Called once with the full queue before the first step.
    fn queue_started(&self, _steps: &[ProcessingStep]) {}

    /// Called before each step.
    fn report(&self, progress: &StepProgress);

    fn step_status(&self, kind: StepKind, status: QueueStatus);

    fn finished(&self, summary: &JobSummary);
}

/// In-memory mirror of per-step status, keyed by step id.
#[derive(Debug, Default)]
pub struct QueueDisplay {
    entries: Mutex<Vec<(StepKind, QueueStatus)>>,
}

impl QueueDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, id: &str) -> Option<QueueStatus> {
        self.entries
            .lock()
            .iter()
            .find(|(kind, _)| kind.id() == id)
            .map(|(_, status)| *status)
    }

    /// Entries in queue order.
    pub fn entries(&self) -> Vec<(StepKind, QueueStatus)> {
        self.entries.lock().clone()
    }

    pub fn count(&self, status: QueueStatus) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|(_, s)| *s == status)
            .count()
    }
}

impl ProgressReporter for QueueDisplay {
    fn queue_started(&self, steps: &[ProcessingStep]) {
        *self.entries.lock() = steps
            .iter()
            .map(|s| (s.kind, QueueStatus::Pending))
            .collect();
    }

    fn report(&self, _progress: &StepProgress) {}

    fn step_status(&self, kind: StepKind, status: QueueStatus) {
        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|(k, _)| *k == kind) {
            Some(entry) => entry.1 = status,
            None => entries.push((kind, status)),
        }
    }

    fn finished(&self, _summary: &JobSummary) {}
}

/// Reporter that logs progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgressReporter;

impl ProgressReporter for TracingProgressReporter {
    fn report(&self, progress: &StepProgress) {
        info!(
            step = %progress.name,
            index = progress.index + 1,
            total = progress.total,
            percent = progress.percent(),
            "Processing step"
        );
    }

    fn step_status(&self, kind: StepKind, status: QueueStatus) {
        tracing::debug!(step = kind.id(), status = ?status, "Step status");
    }

    fn finished(&self, summary: &JobSummary) {
        info!(
            region = %summary.region_id,
            state = ?summary.state,
            succeeded = summary.success_count,
            failed = summary.failed_steps.len(),
            skipped = summary.skipped_steps.len(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Processing job finished"
        );
    }
}
