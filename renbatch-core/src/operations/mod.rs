//! High-level operations that correspond to CLI commands
//!
//! These modules contain the core logic for each renbatch operation,
//! separated from CLI concerns like argument parsing and output formatting.

pub mod history;
pub mod rename;
pub mod status;

pub use history::history_operation;
pub use rename::{rename_operation, RenameOptions};
pub use status::status_operation;
