use crate::config::work_dir;
use crate::history::get_status;
use crate::output::StatusResult;
use anyhow::Result;
use std::path::Path;

/// Status operation - returns structured data
pub fn status_operation(working_dir: Option<&Path>) -> Result<StatusResult> {
    let root = working_dir.unwrap_or_else(|| Path::new("."));
    Ok(StatusResult {
        info: get_status(&work_dir(root))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LockFile;
    use tempfile::TempDir;

    #[test]
    fn test_status_reports_lock() {
        let temp_dir = TempDir::new().unwrap();
        let lock = LockFile::acquire(&work_dir(temp_dir.path())).unwrap();

        let status = status_operation(Some(temp_dir.path())).unwrap();
        assert!(status.info.locked);
        assert_eq!(status.info.total_entries, 0);

        lock.release().unwrap();
        assert!(!status_operation(Some(temp_dir.path())).unwrap().info.locked);
    }
}
