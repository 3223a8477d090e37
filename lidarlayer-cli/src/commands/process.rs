//! Process command - upload a point cloud and run the full queue.

use std::path::PathBuf;
use std::sync::Arc;

use console::style;
use lidarlayer::config::ConfigFile;
use lidarlayer::notify::Notifier;
use lidarlayer::processing::{JobHandle, ProcessingOrchestrator, ProcessingStepRunner};

use super::common::{
    build_client, finish_job, install_cancel_handler, resolve_backend, resolve_options, JobArgs,
};
use crate::error::CliError;
use crate::progress::{ConsoleNotifier, IndicatifReporter};

/// Arguments for the process command.
pub struct ProcessArgs {
    pub file: PathBuf,
    pub job: JobArgs,
}

/// Run the process command.
pub async fn run(args: ProcessArgs, config: &ConfigFile) -> Result<(), CliError> {
    if !args.file.is_file() {
        return Err(CliError::Io(format!("{}: no such file", args.file.display())));
    }

    let backend = resolve_backend(args.job.backend_url.clone(), config);
    let options = resolve_options(&args.job, config)?;
    let client = build_client(&backend)?;

    println!("{}", style(format!("LidarLayer v{}", lidarlayer::VERSION)).bold());
    println!();
    println!("File:      {}", args.file.display());
    println!("Backend:   {}", backend.base_url);
    println!(
        "Quality:   {}",
        if options.quality_mode { "on" } else { "off" }
    );
    println!(
        "Products:  {}",
        options
            .products
            .iter()
            .map(|p| p.display_name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("Press Ctrl+C to stop after the current step");
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
        .run_upload(&args.file, &options, &handle)
        .await?;

    finish_job(summary, client, args.job.out, config, notifier).await
}
