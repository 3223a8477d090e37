//! Terminal progress and notifications.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use lidarlayer::notify::{NotificationLevel, Notifier};
use lidarlayer::processing::{
    JobSummary, ProcessingStep, ProgressReporter, QueueDisplay, QueueStatus, StepKind,
    StepProgress,
};

/// Progress bar over the processing queue.
///
/// Finished steps are printed above the bar as they complete; the bar
/// itself tracks how many steps are done.
pub struct IndicatifReporter {
    bar: ProgressBar,
    queue: QueueDisplay,
}

impl IndicatifReporter {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    fn with_bar(bar: ProgressBar) -> Self {
        bar.set_prefix("Processing");
        bar.set_style(
            ProgressStyle::with_template("{prefix} {msg}\n[{wide_bar:.cyan/blue}] {pos}/{len}")
                .map(|s| s.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self {
            bar,
            queue: QueueDisplay::new(),
        }
    }
}

impl Default for IndicatifReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for IndicatifReporter {
    fn queue_started(&self, steps: &[ProcessingStep]) {
        self.queue.queue_started(steps);
        self.bar.set_length(steps.len() as u64);
        self.bar.set_position(0);
    }

    fn report(&self, progress: &StepProgress) {
        self.bar
            .set_message(format!("{} ({}%)", progress.name, progress.percent()));
    }

    fn step_status(&self, kind: StepKind, status: QueueStatus) {
        self.queue.step_status(kind, status);
        if let Some(line) = status_line(kind, status) {
            self.bar.inc(1);
            self.bar.println(line);
        }
    }

    fn finished(&self, summary: &JobSummary) {
        self.bar.finish_and_clear();
        let pending = self.queue.count(QueueStatus::Pending);
        if pending > 0 {
            println!("  {} step(s) not run", pending);
        }
        println!("Finished in {:.1}s", summary.elapsed.as_secs_f64());
    }
}

/// Line printed when a step settles; `None` while it is still in flight.
fn status_line(kind: StepKind, status: QueueStatus) -> Option<String> {
    let mark = match status {
        QueueStatus::Success => style("✓").green(),
        QueueStatus::Error => style("✗").red(),
        QueueStatus::Skipped => style("-").dim(),
        QueueStatus::Pending | QueueStatus::Running => return None,
    };
    Some(format!("  {} {}", mark, kind.display_name()))
}

/// Prints notifications to the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        match level {
            NotificationLevel::Info => println!("{}", message),
            NotificationLevel::Success => println!("{}", style(message).green()),
            NotificationLevel::Warning => eprintln!("{}", style(message).yellow()),
            NotificationLevel::Error => eprintln!("{}", style(message).red().bold()),
        }
    }
}

#[cfg(test)]
mod tests {
    use lidarlayer::backend::RasterProduct;

    use super::*;

    #[test]
    fn test_bar_counts_settled_steps() {
        let reporter = IndicatifReporter::with_bar(ProgressBar::hidden());
        let steps = vec![
            ProcessingStep::product(RasterProduct::Dtm),
            ProcessingStep::product(RasterProduct::Chm),
        ];
        reporter.queue_started(&steps);
        assert_eq!(reporter.bar.length(), Some(2));

        let dtm = StepKind::Product(RasterProduct::Dtm);
        reporter.step_status(dtm, QueueStatus::Running);
        assert_eq!(reporter.bar.position(), 0);
        reporter.step_status(dtm, QueueStatus::Success);
        assert_eq!(reporter.bar.position(), 1);
        assert_eq!(reporter.queue.status("dtm"), Some(QueueStatus::Success));
        assert_eq!(reporter.queue.status("chm"), Some(QueueStatus::Pending));
    }

    #[test]
    fn test_status_line_only_for_settled_steps() {
        let kind = StepKind::QualityDtm;
        assert!(status_line(kind, QueueStatus::Running).is_none());
        assert!(status_line(kind, QueueStatus::Error)
            .unwrap()
            .contains("Quality DTM"));
    }
}
