use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A single source -> destination move
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenameEntry {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl RenameEntry {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// True when the move would leave the file where it is
    pub fn is_noop(&self) -> bool {
        self.source == self.destination
    }
}

/// A validated, ordered set of renames.
///
/// Sources are unique, resolved destinations are unique, and no destination
/// collides with an existing file other than its own source. Built only by
/// [`build_plan`].
#[derive(Debug, Clone, Serialize)]
pub struct RenamePlan {
    pub id: String,
    pub created_at: String,
    entries: Vec<RenameEntry>,
    #[serde(skip)]
    by_source: HashMap<PathBuf, usize>,
}

impl RenamePlan {
    pub fn entries(&self) -> &[RenameEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the resolved destination of a source path
    pub fn destination_of(&self, source: &Path) -> Option<&Path> {
        self.by_source
            .get(source)
            .map(|&index| self.entries[index].destination.as_path())
    }

    pub fn into_entries(self) -> Vec<RenameEntry> {
        self.entries
    }
}

/// Resolve a destination against the source's folder.
///
/// Bare names and relative paths land next to the source; absolute paths are
/// taken as-is.
pub fn resolve_destination(source: &Path, destination: &Path) -> PathBuf {
    if destination.is_absolute() {
        return destination.to_path_buf();
    }

    match source.parent() {
        Some(parent) => parent.join(destination),
        None => destination.to_path_buf(),
    }
}

/// Validate a raw mapping and turn it into a [`RenamePlan`].
///
/// Nothing on disk is modified. Entries are checked in order and the first
/// offending entry aborts the whole batch. The in-memory checks (duplicate
/// source, conflicting destination) run before the existence check for each
/// entry.
pub fn build_plan<I, S, D>(raw: I) -> Result<RenamePlan, ValidationError>
where
    I: IntoIterator<Item = (S, D)>,
    S: Into<PathBuf>,
    D: Into<PathBuf>,
{
    let mut entries = Vec::new();
    let mut by_source: HashMap<PathBuf, usize> = HashMap::new();
    let mut claimed: HashSet<PathBuf> = HashSet::new();

    for (source, destination) in raw {
        let source = source.into();
        let destination = resolve_destination(&source, &destination.into());

        if by_source.contains_key(&source) {
            return Err(ValidationError::DuplicateSource { path: source });
        }

        if !claimed.insert(destination.clone()) {
            return Err(ValidationError::DestinationConflict {
                from: source,
                destination,
            });
        }

        if destination.exists() && !is_same_target(&source, &destination) {
            return Err(ValidationError::DestinationExists {
                from: source,
                destination,
            });
        }

        by_source.insert(source.clone(), entries.len());
        entries.push(RenameEntry {
            source,
            destination,
        });
    }

    Ok(RenamePlan {
        id: generate_plan_id(&entries),
        created_at: chrono::Local::now().to_rfc3339(),
        entries,
        by_source,
    })
}

/// A destination that exists on disk is acceptable only when it is the source
/// itself: either the same path, or a case-only change on a case-insensitive
/// filesystem where both spellings resolve to the same file.
fn is_same_target(source: &Path, destination: &Path) -> bool {
    if source == destination {
        return true;
    }

    let case_only = source.to_string_lossy().to_lowercase()
        == destination.to_string_lossy().to_lowercase();
    if !case_only {
        return false;
    }

    match (fs::canonicalize(source), fs::canonicalize(destination)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn generate_plan_id(entries: &[RenameEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.source.to_string_lossy().as_bytes());
        hasher.update([0]);
        hasher.update(entry.destination.to_string_lossy().as_bytes());
        hasher.update([0]);
    }
    hasher.update(
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default()
            .to_string()
            .as_bytes(),
    );
    format!("{:x}", hasher.finalize())[..16].to_string()
}
