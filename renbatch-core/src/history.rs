use crate::job::TerminalStatus;
use crate::outcome::HistorySink;
use crate::rename_log::RenameLog;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// One finished job that renamed at least one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Id of the job that produced this entry
    pub id: String,
    /// Timestamp when the job was recorded
    pub created_at: String,
    pub status: TerminalStatus,
    /// Renames that were performed (from -> to), in execution order
    pub renames: Vec<(PathBuf, PathBuf)>,
}

/// Rename history backed by a JSON file
pub struct History {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
    limit: Option<usize>,
}

impl History {
    /// Load history from the work directory
    pub fn load(work_dir: &Path) -> Result<Self> {
        Self::load_from_path(&work_dir.join("history.json"))
    }

    /// Load history from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let entries = if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open history file: {}", path.display()))?;
            let reader = BufReader::new(file);
            serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse history file: {}", path.display()))?
        } else {
            Vec::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries,
            limit: None,
        })
    }

    /// Prune to `limit` entries after every append
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Save the history to disk, replacing the old file in one step
    pub fn save(&self) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let file = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create history file: {}", self.path.display()))?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.entries)
            .with_context(|| format!("Failed to write history file: {}", self.path.display()))?;
        let file = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .with_context(|| format!("Failed to write history file: {}", self.path.display()))?;

        file.persist(&self.path)
            .with_context(|| format!("Failed to write history file: {}", self.path.display()))?;

        Ok(())
    }

    /// Add a new entry and save
    pub fn add_entry(&mut self, entry: HistoryEntry) -> Result<()> {
        if self.entries.iter().any(|e| e.id == entry.id) {
            return Err(anyhow!("History entry with ID {} already exists", entry.id));
        }

        self.entries.push(entry);
        self.save()
    }

    /// Find an entry by ID or unique ID prefix
    pub fn find_entry(&self, id: &str) -> Option<&HistoryEntry> {
        if let Some(exact) = self.entries.iter().find(|e| e.id == id) {
            return Some(exact);
        }

        let mut candidates = self.entries.iter().filter(|e| e.id.starts_with(id));
        match (candidates.next(), candidates.next()) {
            (Some(only), None) if !id.is_empty() => Some(only),
            _ => None,
        }
    }

    pub fn last_entry(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// Get all entries, most recent first, optionally limited to N
    pub fn list_entries(&self, limit: Option<usize>) -> Vec<&HistoryEntry> {
        let entries = self.entries.iter().rev();
        match limit {
            Some(limit) => entries.take(limit).collect(),
            None => entries.collect(),
        }
    }

    /// Drop the oldest entries so at most `max_entries` remain
    pub fn prune(&mut self, max_entries: usize) -> Result<()> {
        if self.entries.len() > max_entries {
            let to_remove = self.entries.len() - max_entries;
            self.entries.drain(0..to_remove);
            self.save()?;
        }
        Ok(())
    }
}

impl HistorySink for History {
    fn append(&mut self, job_id: &str, status: TerminalStatus, log: &RenameLog) -> Result<()> {
        self.add_entry(create_history_entry(job_id, status, log))?;
        if let Some(limit) = self.limit {
            self.prune(limit)?;
        }
        Ok(())
    }
}

pub fn create_history_entry(job_id: &str, status: TerminalStatus, log: &RenameLog) -> HistoryEntry {
    HistoryEntry {
        id: job_id.to_string(),
        created_at: chrono::Local::now().to_rfc3339(),
        status,
        renames: log.pairs(),
    }
}

/// Format history entries for display
pub fn format_history(entries: &[&HistoryEntry], json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(entries)?)
    } else {
        use comfy_table::{Cell, Color, Table};

        let mut table = Table::new();
        table.set_header(vec![
            Cell::new("ID").fg(Color::Cyan),
            Cell::new("Date").fg(Color::Cyan),
            Cell::new("Status").fg(Color::Cyan),
            Cell::new("Renames").fg(Color::Cyan),
            Cell::new("First").fg(Color::Cyan),
        ]);

        for entry in entries {
            let date = entry
                .created_at
                .split('T')
                .next()
                .unwrap_or(&entry.created_at);
            let first = entry.renames.first().map_or_else(String::new, |(from, to)| {
                format!(
                    "{} → {}",
                    crate::error::display_name(from),
                    crate::error::display_name(to)
                )
            });

            table.add_row(vec![
                &entry.id[..8.min(entry.id.len())],
                date,
                &entry.status.to_string(),
                &entry.renames.len().to_string(),
                &first,
            ]);
        }

        Ok(table.to_string())
    }
}

/// Get the status of a work directory
pub fn get_status(work_dir: &Path) -> Result<StatusInfo> {
    let history = History::load(work_dir)?;
    let last = history.last_entry();

    Ok(StatusInfo {
        last_job: last.map(|e| e.id.clone()),
        last_status: last.map(|e| e.status),
        last_renamed: last.map_or(0, |e| e.renames.len()),
        locked: crate::lock::is_locked(work_dir),
        total_entries: history.len(),
    })
}

#[derive(Debug, Serialize)]
pub struct StatusInfo {
    pub last_job: Option<String>,
    pub last_status: Option<TerminalStatus>,
    pub last_renamed: usize,
    /// Another process currently holds the work directory lock
    pub locked: bool,
    pub total_entries: usize,
}

impl StatusInfo {
    pub fn format(&self) -> String {
        use std::fmt::Write;
        let mut output = String::new();

        match (&self.last_job, self.last_status) {
            (Some(id), Some(status)) => {
                let _ = writeln!(
                    output,
                    "Last job: {} ({}, {} files renamed)",
                    id, status, self.last_renamed
                );
            },
            _ => output.push_str("No renames recorded yet\n"),
        }

        if self.locked {
            output.push_str("⚠️  A rename is in progress\n");
        }

        let _ = writeln!(output, "Total history entries: {}", self.total_entries);

        output
    }
}
