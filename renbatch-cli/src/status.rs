use anyhow::{Context, Result};
use renbatch_core::{status_operation, OutputFormatter};

use crate::OutputFormat;

pub fn handle_status(output: OutputFormat) -> Result<()> {
    let status = status_operation(None).context("Failed to get status")?;

    match output {
        OutputFormat::Json => println!("{}", status.format_json()),
        OutputFormat::Summary => print!("{}", status.format_summary()),
    }

    Ok(())
}
