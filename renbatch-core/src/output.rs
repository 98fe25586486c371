use crate::catalog::ItemCategory;
use crate::error::display_name;
use crate::history::{format_history, HistoryEntry, StatusInfo};
use crate::job::TerminalStatus;
use crate::plan::RenameEntry;
use nu_ansi_term::Color;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::PathBuf;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Summary,
    Json,
}

impl OutputFormat {
    /// Parse a config value, falling back to summary for anything unknown
    pub fn from_config(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Summary
        }
    }
}

/// Result of a rename operation
#[derive(Debug, Clone, Serialize)]
pub struct RenameResult {
    /// Job id, absent when nothing was executed
    pub job_id: Option<String>,
    /// Terminal status, absent for dry runs and abandoned reviews
    pub status: Option<TerminalStatus>,
    pub total: usize,
    pub dry_run: bool,
    pub abandoned: bool,
    /// Renames performed, or planned for a dry run
    pub renames: Vec<RenameEntry>,
    pub categories: BTreeMap<ItemCategory, usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unmatched: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_error: Option<String>,
    #[serde(skip)]
    pub use_color: bool,
}

impl RenameResult {
    pub fn renamed(&self) -> usize {
        if self.dry_run {
            0
        } else {
            self.renames.len()
        }
    }

    fn status_label(&self) -> String {
        let Some(status) = self.status else {
            return String::new();
        };
        let label = status.to_string();
        if !self.use_color {
            return label;
        }
        let color = match status {
            TerminalStatus::Completed => Color::Green,
            TerminalStatus::Failed => Color::Red,
            TerminalStatus::Cancelled => Color::Yellow,
        };
        color.bold().paint(label).to_string()
    }
}

/// Result of a status operation
#[derive(Debug, Serialize)]
pub struct StatusResult {
    #[serde(flatten)]
    pub info: StatusInfo,
}

/// Result of a history operation
#[derive(Debug, Serialize)]
pub struct HistoryResult {
    pub entries: Vec<HistoryEntry>,
}

/// Result of a version command
#[derive(Debug, Serialize)]
pub struct VersionResult {
    pub name: String,
    pub version: String,
}

/// Trait for formatting output in different formats
pub trait OutputFormatter {
    fn format(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => self.format_json(),
            OutputFormat::Summary => self.format_summary(),
        }
    }
    fn format_json(&self) -> String;
    fn format_summary(&self) -> String;
}

impl OutputFormatter for RenameResult {
    fn format_json(&self) -> String {
        serde_json::to_string(&json!({
            "success": self.error.is_none(),
            "operation": "rename",
            "job_id": self.job_id,
            "status": self.status,
            "dry_run": self.dry_run,
            "abandoned": self.abandoned,
            "summary": {
                "total": self.total,
                "renamed": self.renamed(),
                "categories": self.categories,
            },
            "renames": self.renames,
            "unmatched": self.unmatched,
            "error": self.error,
            "history_error": self.history_error,
        }))
        .unwrap_or_default()
    }

    fn format_summary(&self) -> String {
        let mut output = String::new();

        if self.abandoned {
            output.push_str("Rename abandoned, nothing was changed\n");
            return output;
        }

        if self.dry_run {
            let _ = writeln!(output, "Dry run: {} files would be renamed", self.renames.len());
            for entry in &self.renames {
                let _ = writeln!(
                    output,
                    "  {} → {}",
                    entry.source.display(),
                    entry.destination.display()
                );
            }
            return output;
        }

        if self.total == 0 {
            output.push_str("Nothing to rename\n");
            return output;
        }

        let _ = writeln!(
            output,
            "Rename {}: {} of {} files renamed",
            self.status_label(),
            self.renamed(),
            self.total
        );

        if !self.categories.is_empty() {
            let parts: Vec<_> = self
                .categories
                .iter()
                .map(|(category, count)| format!("{} {}", count, category))
                .collect();
            let _ = writeln!(output, "  {}", parts.join(", "));
        }

        if let Some(error) = &self.error {
            let _ = writeln!(output, "✗ {}", error);
        }

        if let Some(error) = &self.history_error {
            let _ = writeln!(output, "⚠️  History not recorded: {}", error);
        }

        if !self.unmatched.is_empty() {
            let names: Vec<_> = self.unmatched.iter().map(|p| display_name(p)).collect();
            let _ = writeln!(output, "⚠️  Not in catalog: {}", names.join(", "));
        }

        if let Some(job_id) = &self.job_id {
            if self.renamed() > 0 {
                let _ = writeln!(output, "Job ID: {}", job_id);
            }
        }

        output
    }
}

impl OutputFormatter for StatusResult {
    fn format_json(&self) -> String {
        serde_json::to_string(&self).unwrap_or_default()
    }

    fn format_summary(&self) -> String {
        self.info.format()
    }
}

impl OutputFormatter for HistoryResult {
    fn format_json(&self) -> String {
        serde_json::to_string(&json!({
            "entries": self.entries
        }))
        .unwrap_or_default()
    }

    fn format_summary(&self) -> String {
        if self.entries.is_empty() {
            return "No history entries found".to_string();
        }

        let entries: Vec<_> = self.entries.iter().collect();
        format_history(&entries, false).unwrap_or_default()
    }
}

impl OutputFormatter for VersionResult {
    fn format_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn format_summary(&self) -> String {
        format!("{} {}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rename_result(status: TerminalStatus, renamed: usize, total: usize) -> RenameResult {
        RenameResult {
            job_id: Some("abcdef0123456789".to_string()),
            status: Some(status),
            total,
            dry_run: false,
            abandoned: false,
            renames: (1..=renamed)
                .map(|i| RenameEntry::new(format!("/a/{i}.mkv"), format!("/a/Show {i}.mkv")))
                .collect(),
            categories: BTreeMap::from([(ItemCategory::Episode, renamed)]),
            unmatched: Vec::new(),
            error: None,
            history_error: None,
            use_color: false,
        }
    }

    #[test]
    fn test_rename_result_json_format() {
        let json = rename_result(TerminalStatus::Completed, 2, 2).format_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["operation"], "rename");
        assert_eq!(value["status"], "completed");
        assert_eq!(value["summary"]["renamed"], 2);
        assert_eq!(value["summary"]["categories"]["episode"], 2);
        assert_eq!(value["renames"][0]["source"], "/a/1.mkv");
    }

    #[test]
    fn test_rename_result_summary_counts() {
        let summary = rename_result(TerminalStatus::Cancelled, 1, 3).format_summary();
        assert!(summary.contains("Rename cancelled: 1 of 3 files renamed"));
        assert!(summary.contains("1 episode"));
        assert!(summary.contains("Job ID: abcdef0123456789"));
    }

    #[test]
    fn test_rename_result_summary_failure() {
        let mut result = rename_result(TerminalStatus::Failed, 0, 2);
        result.error = Some("Failed to rename /a/1.mkv".to_string());
        result.categories.clear();

        let summary = result.format_summary();
        assert!(summary.contains("0 of 2 files renamed"));
        assert!(summary.contains("✗ Failed to rename /a/1.mkv"));
        assert!(!summary.contains("Job ID"));
        assert!(result.format_json().contains("\"success\":false"));
    }

    #[test]
    fn test_rename_result_color() {
        let mut result = rename_result(TerminalStatus::Completed, 1, 1);
        result.use_color = true;
        assert!(result.format_summary().contains("\u{1b}["));

        result.use_color = false;
        assert!(!result.format_summary().contains("\u{1b}["));
    }

    #[test]
    fn test_dry_run_lists_plan() {
        let mut result = rename_result(TerminalStatus::Completed, 2, 2);
        result.status = None;
        result.dry_run = true;

        let summary = result.format_summary();
        assert!(summary.contains("Dry run: 2 files would be renamed"));
        assert!(summary.contains("/a/1.mkv → /a/Show 1.mkv"));
        assert_eq!(result.renamed(), 0);
    }

    #[test]
    fn test_abandoned_summary() {
        let mut result = rename_result(TerminalStatus::Completed, 0, 0);
        result.abandoned = true;
        assert!(result.format_summary().contains("abandoned"));
    }

    #[test]
    fn test_history_result_formats() {
        let empty = HistoryResult { entries: vec![] };
        assert_eq!(empty.format_summary(), "No history entries found");
        assert_eq!(empty.format(OutputFormat::Json), r#"{"entries":[]}"#);
    }

    #[test]
    fn test_version_result_formats() {
        let result = VersionResult {
            name: "renbatch".to_string(),
            version: "0.1.0".to_string(),
        };

        assert_eq!(result.format_summary(), "renbatch 0.1.0");
        assert_eq!(
            result.format(OutputFormat::Json),
            r#"{"name":"renbatch","version":"0.1.0"}"#
        );
    }

    #[test]
    fn test_output_format_from_config() {
        assert_eq!(OutputFormat::from_config("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_config("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_config("summary"), OutputFormat::Summary);
        assert_eq!(OutputFormat::from_config("table"), OutputFormat::Summary);
    }
}
