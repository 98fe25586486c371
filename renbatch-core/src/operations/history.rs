use crate::config::work_dir;
use crate::output::HistoryResult;
use crate::History;
use anyhow::Result;
use std::path::Path;

/// History operation - returns structured data, most recent first
pub fn history_operation(limit: Option<usize>, working_dir: Option<&Path>) -> Result<HistoryResult> {
    let root = working_dir.unwrap_or_else(|| Path::new("."));
    let history = History::load(&work_dir(root))?;

    Ok(HistoryResult {
        entries: history.list_entries(limit).into_iter().cloned().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::TerminalStatus;
    use crate::HistoryEntry;
    use tempfile::TempDir;

    #[test]
    fn test_history_operation_limits_and_orders() {
        let temp_dir = TempDir::new().unwrap();
        let mut history = History::load(&work_dir(temp_dir.path())).unwrap();
        for i in 0..3 {
            history
                .add_entry(HistoryEntry {
                    id: format!("job{i}"),
                    created_at: "2024-01-01T00:00:00+00:00".to_string(),
                    status: TerminalStatus::Completed,
                    renames: vec![],
                })
                .unwrap();
        }

        let result = history_operation(Some(2), Some(temp_dir.path())).unwrap();
        let ids: Vec<_> = result.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["job2", "job1"]);
    }

    #[test]
    fn test_history_operation_without_history() {
        let temp_dir = TempDir::new().unwrap();
        let result = history_operation(None, Some(temp_dir.path())).unwrap();
        assert!(result.entries.is_empty());
    }
}
