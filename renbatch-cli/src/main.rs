use anyhow::{Context, Result};
use clap::Parser;
use renbatch_core::{
    CancellationToken, Config, OutputFormatter, TerminalStatus, ValidationError, VersionResult,
};
use std::io::{self, IsTerminal};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod cli;
mod history;
mod progress;
mod rename;
mod status;

use cli::{Cli, Commands, OutputFormat};

const EXIT_CONFLICT: i32 = 1;
const EXIT_INVALID: i32 = 2;
const EXIT_INTERNAL: i32 = 3;
const EXIT_INTERRUPTED: i32 = 130;

fn main() {
    // Both SIGINT and SIGTERM cancel the running job between two renames
    let interrupted = Arc::new(AtomicBool::new(false));
    let token = CancellationToken::new();

    let interrupted_clone = Arc::clone(&interrupted);
    let token_clone = token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nReceived SIGINT. Stopping after the current file...");
        interrupted_clone.store(true, Ordering::SeqCst);
        token_clone.cancel();
    }) {
        eprintln!("Error setting SIGINT handler: {e}");
        process::exit(EXIT_INTERNAL);
    }

    #[cfg(unix)]
    {
        let interrupted_clone = Arc::clone(&interrupted);
        let token_clone = token.clone();
        let registered = unsafe {
            signal_hook::low_level::register(signal_hook::consts::SIGTERM, move || {
                interrupted_clone.store(true, Ordering::SeqCst);
                token_clone.cancel();
            })
        };
        if let Err(e) = registered {
            eprintln!("Error setting SIGTERM handler: {e}");
            process::exit(EXIT_INTERNAL);
        }
    }

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir)
            .with_context(|| format!("Failed to change to directory: {}", dir.display()))
            .unwrap_or_else(|e| {
                eprintln!("Error: {e:#}");
                process::exit(EXIT_INVALID);
            });
    }

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Error: {e:#}");
        process::exit(EXIT_INVALID);
    });
    tracing::debug!("Loaded config: {:?}", config.defaults);

    let use_color = !cli.no_color
        && config.defaults.use_color.unwrap_or(true)
        && io::stdout().is_terminal();

    let result = match cli.command {
        Commands::Rename {
            mapping,
            yes,
            dry_run,
            sanitize,
            timeout_ms,
            output,
        } => rename::handle_rename(
            &mapping, yes, dry_run, sanitize, timeout_ms, output, &config, token, use_color,
        )
        .map(|result| result.status),

        Commands::History { limit, output } => history::handle_history(limit, output).map(|()| None),

        Commands::Status { output } => status::handle_status(output).map(|()| None),

        Commands::Version { output } => handle_version(output).map(|()| None),
    };

    if interrupted.load(Ordering::SeqCst) {
        eprintln!("Operation interrupted");
        process::exit(EXIT_INTERRUPTED);
    }

    match result {
        Ok(None | Some(TerminalStatus::Completed)) => process::exit(0),
        Ok(Some(TerminalStatus::Cancelled)) => process::exit(EXIT_INTERRUPTED),
        Ok(Some(TerminalStatus::Failed)) => process::exit(EXIT_INTERNAL),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(exit_code_for(&e));
        },
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or debug with `--verbose`
fn init_logging(verbose: bool) {
    let default = if verbose {
        "renbatch=debug"
    } else {
        "renbatch=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn exit_code_for(e: &anyhow::Error) -> i32 {
    if e.downcast_ref::<ValidationError>().is_some() {
        return EXIT_CONFLICT;
    }

    let bad_input = e.chain().any(|cause| {
        cause.downcast_ref::<serde_json::Error>().is_some()
            || cause
                .downcast_ref::<io::Error>()
                .is_some_and(|io| io.kind() == io::ErrorKind::NotFound)
    });
    if bad_input || e.to_string().contains("non-interactive") {
        EXIT_INVALID
    } else {
        EXIT_INTERNAL
    }
}

fn handle_version(output: OutputFormat) -> Result<()> {
    let version_result = VersionResult {
        name: "renbatch".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    println!("{}", version_result.format(output.into()));
    Ok(())
}
