use anyhow::Result;
use renbatch_core::{history_operation, OutputFormatter};

use crate::OutputFormat;

pub fn handle_history(limit: Option<usize>, output: OutputFormat) -> Result<()> {
    let result = history_operation(limit, None)?;

    match output {
        OutputFormat::Json => println!("{}", result.format_json()),
        OutputFormat::Summary => println!("{}", result.format_summary()),
    }

    Ok(())
}
