use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Reasons a raw mapping is rejected before anything on disk is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Duplicate source file: {}", display_name(.path))]
    DuplicateSource { path: PathBuf },

    #[error("Conflict detected: {} is the destination of more than one file ({} included)", .destination.display(), .from.display())]
    DestinationConflict { from: PathBuf, destination: PathBuf },

    #[error("File already exists: {}", .destination.display())]
    DestinationExists { from: PathBuf, destination: PathBuf },
}

impl ValidationError {
    /// The source path of the entry that failed validation
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::DuplicateSource { path } => path,
            Self::DestinationConflict { from, .. } | Self::DestinationExists { from, .. } => from,
        }
    }
}

/// Failure of a single move while a job is running. Ends the job.
#[derive(Debug, Error)]
pub enum RenameError {
    #[error("Failed to rename {} to {}: {error}", .from.display(), .to.display())]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("Rename worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Failed to start rename worker: {0}")]
    Spawn(#[source] io::Error),
}

/// File name of `path`, or the whole path when it has none
pub fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}
