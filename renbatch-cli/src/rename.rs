use anyhow::{anyhow, Context, Result};
use renbatch_core::error::display_name;
use renbatch_core::names::sanitize_path;
use renbatch_core::{
    find_invalid_names, rename_operation, resolve_destination, AutoApprove, CancellationToken,
    Config, MappingReviewer, OutputFormatter, RenameOptions, RenameResult, ReviewDecision,
};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::progress::follow_job;
use crate::OutputFormat;

#[allow(clippy::too_many_arguments)]
#[allow(clippy::fn_params_excessive_bools)]
pub fn handle_rename(
    mapping: &Path,
    yes: bool,
    dry_run: bool,
    sanitize: bool,
    timeout_ms: Option<u64>,
    output: Option<OutputFormat>,
    config: &Config,
    token: CancellationToken,
    use_color: bool,
) -> Result<RenameResult> {
    let output = output.map_or_else(
        || renbatch_core::OutputFormat::from_config(&config.defaults.output),
        Into::into,
    );

    let options = RenameOptions {
        dry_run,
        sanitize: sanitize || config.defaults.sanitize_names,
        wait_timeout: timeout_ms.map_or_else(|| config.defaults.wait_timeout(), Duration::from_millis),
        history_limit: config.defaults.history_limit,
        use_color,
    };

    let show_progress = output == renbatch_core::OutputFormat::Summary;
    let mut on_slow = |job: &renbatch_core::RenameJob| follow_job(job, show_progress);

    let result = if yes || dry_run {
        rename_operation(mapping, None, &options, &mut AutoApprove, token, &mut on_slow)?
    } else {
        if !io::stdin().is_terminal() {
            return Err(anyhow!(
                "Cannot prompt for confirmation in non-interactive mode. Use --yes to proceed."
            ));
        }
        let stdin = io::stdin();
        let mut reviewer = PromptReviewer::new(stdin.lock(), io::stderr());
        rename_operation(mapping, None, &options, &mut reviewer, token, &mut on_slow)?
    };

    match output {
        renbatch_core::OutputFormat::Json => println!("{}", result.format_json()),
        renbatch_core::OutputFormat::Summary => print!("{}", result.format_summary()),
    }

    Ok(result)
}

/// Shows the mapping on a terminal and asks before anything is renamed.
///
/// Destinations with invalid characters are flagged, and the user is offered
/// to sanitize them in place.
pub struct PromptReviewer<R, W> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> PromptReviewer<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    fn ask(&mut self, question: &str, default_yes: bool) -> Result<bool> {
        write!(self.out, "{question} ")?;
        self.out.flush().context("Failed to flush prompt")?;

        let mut answer = String::new();
        self.input
            .read_line(&mut answer)
            .context("Failed to read user input")?;
        let answer = answer.trim().to_lowercase();

        Ok(match answer.as_str() {
            "y" | "yes" => true,
            "" => default_yes,
            _ => false,
        })
    }

    fn print_mapping(&mut self, sources: &[PathBuf], destinations: &[PathBuf]) -> Result<()> {
        let invalid = find_invalid_names(destinations);
        for (i, (source, destination)) in sources.iter().zip(destinations).enumerate() {
            let marker = if invalid.contains(&i) { "!" } else { " " };
            writeln!(
                self.out,
                "{marker} {} → {}",
                source.display(),
                display_name(&resolve_destination(source, destination))
            )?;
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> MappingReviewer for PromptReviewer<R, W> {
    fn review(
        &mut self,
        sources: &[PathBuf],
        destinations: &mut [PathBuf],
    ) -> Result<ReviewDecision> {
        self.print_mapping(sources, destinations)?;

        let invalid = find_invalid_names(destinations);
        if !invalid.is_empty() {
            writeln!(
                self.out,
                "{} destination names contain characters that are not allowed in file names.",
                invalid.len()
            )?;
            if self.ask("Remove the invalid characters? [Y/n]:", true)? {
                for i in invalid {
                    destinations[i] = sanitize_path(&destinations[i]);
                }
            }
        }

        if self.ask("Apply? [y/N]:", false)? {
            Ok(ReviewDecision::Approve)
        } else {
            writeln!(self.out, "Aborted.")?;
            Ok(ReviewDecision::Abandon)
        }
    }
}
