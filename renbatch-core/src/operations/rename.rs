use crate::cancel::CancellationToken;
use crate::config::work_dir;
use crate::job::{RenameExecutor, RenameJob};
use crate::mapping::{catalog_from_records, load_mapping};
use crate::mover::FsMover;
use crate::names::{find_invalid_names, review_mapping, MappingReviewer, SanitizeNames};
use crate::outcome::{OutcomeAggregator, TracingAnalytics};
use crate::output::RenameResult;
use crate::plan::build_plan;
use crate::{History, LockFile};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Knobs for a single rename run
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct RenameOptions {
    /// Validate and report the plan without moving anything
    pub dry_run: bool,
    /// Strip invalid characters from destination names before review
    pub sanitize: bool,
    /// Bounded wait before `on_slow` is handed the running job
    pub wait_timeout: Duration,
    /// History entries kept after recording this run
    pub history_limit: usize,
    pub use_color: bool,
}

impl Default for RenameOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            sanitize: false,
            wait_timeout: Duration::from_millis(2000),
            history_limit: 500,
            use_color: false,
        }
    }
}

/// Rename operation - returns structured data
///
/// Loads the mapping, lets `reviewer` approve or edit it, validates it and
/// runs it on a background job observing `token`. If the job is still running
/// after `options.wait_timeout`, `on_slow` is called with it (typically to show
/// progress); the operation then waits for the job and reports the outcome to
/// the history file.
///
/// Validation failures are returned as errors that downcast to
/// [`ValidationError`](crate::ValidationError). A failed or cancelled job is
/// not an error: see [`RenameResult::status`].
pub fn rename_operation(
    mapping_path: &Path,
    working_dir: Option<&Path>,
    options: &RenameOptions,
    reviewer: &mut dyn MappingReviewer,
    token: CancellationToken,
    on_slow: &mut dyn FnMut(&RenameJob),
) -> Result<RenameResult> {
    let root = match working_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let renbatch_dir = work_dir(&root);

    let records = load_mapping(mapping_path, &root)?;
    let mut mapping: Vec<(PathBuf, PathBuf)> = records
        .iter()
        .map(|r| (r.source.clone(), r.destination.clone()))
        .collect();

    if options.sanitize {
        mapping = review_mapping(&mut SanitizeNames, mapping)?;
    }

    let destinations: Vec<_> = mapping.iter().map(|(_, d)| d.clone()).collect();
    for index in find_invalid_names(&destinations) {
        tracing::warn!(
            "Destination contains characters that are invalid on some systems: {}",
            destinations[index].display()
        );
    }

    let requested = mapping.len();
    let mapping = review_mapping(reviewer, mapping)?;
    if requested > 0 && mapping.is_empty() {
        return Ok(empty_result(options, true));
    }

    let plan = build_plan(mapping)?;
    tracing::debug!("Validated plan {} with {} entries", plan.id, plan.len());

    if options.dry_run {
        let mut result = empty_result(options, false);
        result.dry_run = true;
        result.total = plan.len();
        result.renames = plan.into_entries();
        return Ok(result);
    }

    if plan.is_empty() {
        return Ok(empty_result(options, false));
    }

    let _lock =
        LockFile::acquire(&renbatch_dir).context("Failed to acquire lock for renbatch operation")?;

    // Load before moving anything so a broken history file stops the run early
    let mut history = History::load(&renbatch_dir)?.with_limit(options.history_limit);
    let mut catalog = catalog_from_records(&records);

    let job = RenameExecutor::new(FsMover::default()).execute_with_token(plan, token);
    if job.wait_timeout(options.wait_timeout).is_none() {
        on_slow(&job);
    }
    let outcome = job.join();

    let mut analytics = TracingAnalytics;
    let report =
        OutcomeAggregator::new(&mut catalog, &mut history, &mut analytics).aggregate(outcome);

    Ok(RenameResult {
        job_id: Some(report.job_id),
        status: Some(report.status),
        total: report.total,
        dry_run: false,
        abandoned: false,
        renames: report.log.entries().to_vec(),
        categories: report.categories,
        unmatched: report.unmatched,
        error: report.error,
        history_error: report.history_error,
        use_color: options.use_color,
    })
}

fn empty_result(options: &RenameOptions, abandoned: bool) -> RenameResult {
    RenameResult {
        job_id: None,
        status: None,
        total: 0,
        dry_run: false,
        abandoned,
        renames: Vec::new(),
        categories: BTreeMap::new(),
        unmatched: Vec::new(),
        error: None,
        history_error: None,
        use_color: options.use_color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::job::TerminalStatus;
    use crate::names::{AutoApprove, ReviewDecision};
    use crate::output::OutputFormatter;
    use std::fs;
    use tempfile::TempDir;

    struct Abandon;

    impl MappingReviewer for Abandon {
        fn review(&mut self, _: &[PathBuf], _: &mut [PathBuf]) -> Result<ReviewDecision> {
            Ok(ReviewDecision::Abandon)
        }
    }

    fn write_mapping(dir: &Path, json: &str) -> PathBuf {
        let path = dir.join("mapping.json");
        fs::write(&path, json).unwrap();
        path
    }

    fn run(dir: &Path, mapping: &Path, options: &RenameOptions) -> Result<RenameResult> {
        rename_operation(
            mapping,
            Some(dir),
            options,
            &mut AutoApprove,
            CancellationToken::new(),
            &mut |_| {},
        )
    }

    #[test]
    fn test_rename_moves_files_and_records_history() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("b.txt"), "b").unwrap();
        let mapping = write_mapping(
            root,
            r#"[{"source": "a.txt", "destination": "c.txt"},
                {"source": "b.txt", "destination": "sub/d.txt"}]"#,
        );

        let result = run(root, &mapping, &RenameOptions::default()).unwrap();

        assert_eq!(result.status, Some(TerminalStatus::Completed));
        assert_eq!(result.renamed(), 2);
        assert!(root.join("c.txt").exists());
        assert!(root.join("sub/d.txt").exists());
        assert!(!root.join("a.txt").exists());

        let history = History::load(&work_dir(root)).unwrap();
        let entry = history.last_entry().unwrap();
        assert_eq!(Some(&entry.id), result.job_id.as_ref());
        assert_eq!(entry.renames.len(), 2);
        assert!(!root.join(".renbatch/renbatch.lock").exists());
    }

    #[test]
    fn test_validation_failure_touches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("b.txt"), "b").unwrap();
        let mapping = write_mapping(
            root,
            r#"[{"source": "a.txt", "destination": "c.txt"},
                {"source": "b.txt", "destination": "c.txt"}]"#,
        );

        let err = run(root, &mapping, &RenameOptions::default()).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::DestinationConflict { .. })
        ));
        assert!(root.join("a.txt").exists());
        assert!(root.join("b.txt").exists());
        assert!(!work_dir(root).join("history.json").exists());
    }

    #[test]
    fn test_dry_run_reports_plan_only() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), "a").unwrap();
        let mapping = write_mapping(root, r#"[{"source": "a.txt", "destination": "b.txt"}]"#);

        let options = RenameOptions {
            dry_run: true,
            ..RenameOptions::default()
        };
        let result = run(root, &mapping, &options).unwrap();

        assert!(result.dry_run);
        assert_eq!(result.renames[0].destination, root.join("b.txt"));
        assert!(root.join("a.txt").exists());
        assert!(!root.join("b.txt").exists());
    }

    #[test]
    fn test_sanitize_cleans_destinations() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), "a").unwrap();
        let mapping = write_mapping(root, r#"[{"source": "a.txt", "destination": "what?.txt"}]"#);

        let options = RenameOptions {
            sanitize: true,
            ..RenameOptions::default()
        };
        let result = run(root, &mapping, &options).unwrap();

        assert_eq!(result.status, Some(TerminalStatus::Completed));
        assert!(root.join("what.txt").exists());
    }

    #[test]
    fn test_abandoned_review_renames_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), "a").unwrap();
        let mapping = write_mapping(root, r#"[{"source": "a.txt", "destination": "b.txt"}]"#);

        let result = rename_operation(
            &mapping,
            Some(root),
            &RenameOptions::default(),
            &mut Abandon,
            CancellationToken::new(),
            &mut |_| {},
        )
        .unwrap();

        assert!(result.abandoned);
        assert!(root.join("a.txt").exists());
        assert!(!work_dir(root).exists());
    }

    #[test]
    fn test_cancelled_token_renames_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), "a").unwrap();
        let mapping = write_mapping(root, r#"[{"source": "a.txt", "destination": "b.txt"}]"#);

        let token = CancellationToken::new();
        token.cancel();
        let result = rename_operation(
            &mapping,
            Some(root),
            &RenameOptions::default(),
            &mut AutoApprove,
            token,
            &mut |_| {},
        )
        .unwrap();

        assert_eq!(result.status, Some(TerminalStatus::Cancelled));
        assert_eq!(result.renamed(), 0);
        assert!(root.join("a.txt").exists());
        assert!(!work_dir(root).join("history.json").exists());
    }

    #[test]
    fn test_zero_timeout_hands_job_to_observer() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), "a").unwrap();
        let mapping = write_mapping(root, r#"[{"source": "a.txt", "destination": "b.txt"}]"#);

        let options = RenameOptions {
            wait_timeout: Duration::ZERO,
            ..RenameOptions::default()
        };
        let mut observed = 0;
        let result = rename_operation(
            &mapping,
            Some(root),
            &options,
            &mut AutoApprove,
            CancellationToken::new(),
            &mut |job| {
                observed += 1;
                job.wait();
            },
        )
        .unwrap();

        // The job may finish before the zero-length wait checks it
        assert!(observed <= 1);
        assert_eq!(result.status, Some(TerminalStatus::Completed));
    }

    #[test]
    fn test_empty_mapping_is_nothing_to_do() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let mapping = write_mapping(root, "[]");

        let result = run(root, &mapping, &RenameOptions::default()).unwrap();

        assert!(result.status.is_none());
        assert!(!result.abandoned);
        assert!(result.format_summary().contains("Nothing to rename"));
    }
}
