use indicatif::{ProgressBar, ProgressStyle};
use renbatch_core::error::display_name;
use renbatch_core::{ProgressMessage, RenameJob, TerminalStatus};

/// Progress bar for a rename job of `total` entries
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    pb
}

/// Follow a job that outlived the bounded wait until it ends.
///
/// With `visible` off this only blocks; the bar draws to stderr and hides
/// itself when stderr is not a terminal.
pub fn follow_job(job: &RenameJob, visible: bool) {
    if !visible {
        job.wait();
        return;
    }

    let pb = create_progress_bar(job.total() as u64);
    for message in job.subscribe() {
        match message {
            ProgressMessage::Progress(event) => {
                pb.set_position(event.index.saturating_sub(1) as u64);
                pb.set_message(format!(
                    "{} ({})",
                    display_name(&event.entry.source),
                    event.note()
                ));
            },
            ProgressMessage::Done { status, completed } => {
                pb.set_position(completed as u64);
                match status {
                    TerminalStatus::Completed => pb.finish_and_clear(),
                    TerminalStatus::Failed | TerminalStatus::Cancelled => {
                        pb.abandon_with_message(status.to_string());
                    },
                }
                break;
            },
        }
    }
}
