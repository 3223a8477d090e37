//! Multi-stage processing jobs.
//!
//! A job is an ordered queue of backend steps for one region:
//!
//! ```text
//! [Density Analysis → Mask Generation → Quality DTM]   quality phase
//! CHM → Remaining Products                             product steps
//! Metadata → Satellite Imagery                         finishing steps
//! ```
//!
//! [`ProcessingOrchestrator`] walks the queue strictly in order through a
//! [`StepRunner`]. A failed step never stops the queue, cancellation takes
//! effect only between steps, and the result is aggregated into a
//! [`JobSummary`]. Progress goes to an injected [`ProgressReporter`] and the
//! final message to a [`Notifier`](crate::notify::Notifier).

mod error;
mod job;
mod orchestrator;
mod progress;
mod queue;
mod runner;
mod step;
mod summary;

pub use error::ProcessingError;
pub use job::{
    JobContext, JobHandle, JobState, ProcessingJob, StepOutcome, StepResult, StepStatus,
};
pub use orchestrator::{region_from_file_name, ProcessingOrchestrator};
pub use progress::{
    ProgressReporter, QueueDisplay, QueueStatus, StepProgress, TracingProgressReporter,
};
pub use queue::{ProcessingOptions, QueueBuilder, DEFAULT_MASK_THRESHOLD, DEFAULT_RESOLUTION};
pub use runner::{ProcessingStepRunner, StepRunner};
pub use step::{ProcessingStep, StepKind};
pub use summary::{JobOutcome, JobSummary};
