#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod cancel;
pub mod catalog;
pub mod config;
pub mod error;
pub mod history;
pub mod job;
pub mod lock;
pub mod mapping;
pub mod mover;
pub mod names;
pub mod operations;
pub mod outcome;
pub mod output;
pub mod plan;
pub mod progress;
pub mod rename_log;

pub use cancel::CancellationToken;
pub use catalog::{CatalogItem, ItemCatalog, ItemCategory, ItemId, VecCatalog};
pub use config::Config;
pub use error::{RenameError, ValidationError};
pub use history::{format_history, get_status, History, HistoryEntry, StatusInfo};
pub use job::{JobOutcome, JobState, RenameExecutor, RenameJob, TerminalStatus};
pub use lock::LockFile;
pub use mapping::{load_mapping, MappingRecord};
pub use mover::{detect_case_insensitive_fs, FileMover, FsMover};
pub use names::{
    find_invalid_names, review_mapping, sanitize_file_name, AutoApprove, MappingReviewer,
    ReviewDecision, SanitizeNames,
};
pub use operations::{history_operation, rename_operation, status_operation, RenameOptions};
pub use outcome::{AnalyticsSink, HistorySink, OutcomeAggregator, OutcomeReport, TracingAnalytics};
pub use output::{
    HistoryResult, OutputFormat, OutputFormatter, RenameResult, StatusResult, VersionResult,
};
pub use plan::{build_plan, resolve_destination, RenameEntry, RenamePlan};
pub use progress::{ProgressEvent, ProgressMessage, ProgressSubscription};
pub use rename_log::RenameLog;
