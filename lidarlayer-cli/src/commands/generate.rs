//! Generate command - produce standard rasters for an uploaded region.

use std::sync::Arc;

use lidarlayer::config::ConfigFile;
use lidarlayer::notify::Notifier;
use lidarlayer::processing::{JobHandle, ProcessingOrchestrator, ProcessingStepRunner};

use super::common::{
    build_client, finish_job, install_cancel_handler, resolve_backend, resolve_options, JobArgs,
};
use crate::error::CliError;
use crate::progress::{ConsoleNotifier, IndicatifReporter};

/// Arguments for the generate command.
pub struct GenerateArgs {
    pub region: String,
    pub job: JobArgs,
}

/// Run the generate command.
///
/// The region must already exist on the backend. No quality phase and no
/// metadata are run.
pub async fn run(args: GenerateArgs, config: &ConfigFile) -> Result<(), CliError> {
    let backend = resolve_backend(args.job.backend_url.clone(), config);
    let options = resolve_options(&args.job, config)?;
    let client = build_client(&backend)?;

    println!("Generating rasters for {} via {}", args.region, backend.base_url);
    println!();

    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
    let orchestrator = ProcessingOrchestrator::new(
        ProcessingStepRunner::new(client.clone()),
        Arc::new(IndicatifReporter::new()),
        notifier.clone(),
    );

    let handle = JobHandle::new();
    install_cancel_handler(handle.clone())?;

    let summary = orchestrator
        .run_generate_all(&args.region, &options, &handle)
        .await?;

    finish_job(summary, client, args.job.out, config, notifier).await
}
