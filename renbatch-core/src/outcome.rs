//! Reporting a finished job to the collaborators that care about it.

use crate::catalog::{ItemCatalog, ItemCategory};
use crate::job::{JobOutcome, TerminalStatus};
use crate::rename_log::RenameLog;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Receives the ordered log of every job that renamed at least one file
pub trait HistorySink {
    fn append(&mut self, job_id: &str, status: TerminalStatus, log: &RenameLog) -> Result<()>;
}

/// Receives per-category rename counts. Failures are logged and ignored.
pub trait AnalyticsSink {
    fn report(&mut self, category: ItemCategory, count: usize) -> Result<()>;
}

/// Analytics sink that only emits tracing events
#[derive(Debug, Default)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn report(&mut self, category: ItemCategory, count: usize) -> Result<()> {
        tracing::info!(category = %category, count, "Rename");
        Ok(())
    }
}

/// Final summary of a job after downstream reporting
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeReport {
    pub job_id: String,
    pub status: TerminalStatus,
    pub total: usize,
    pub log: RenameLog,
    pub categories: BTreeMap<ItemCategory, usize>,
    /// Logged sources the catalog did not know about
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unmatched: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_error: Option<String>,
}

impl OutcomeReport {
    pub fn renamed(&self) -> usize {
        self.log.len()
    }
}

/// Runs the end-of-job bookkeeping for exactly one [`JobOutcome`]
pub struct OutcomeAggregator<'a> {
    catalog: &'a mut dyn ItemCatalog,
    history: &'a mut dyn HistorySink,
    analytics: &'a mut dyn AnalyticsSink,
}

impl<'a> OutcomeAggregator<'a> {
    pub fn new(
        catalog: &'a mut dyn ItemCatalog,
        history: &'a mut dyn HistorySink,
        analytics: &'a mut dyn AnalyticsSink,
    ) -> Self {
        Self {
            catalog,
            history,
            analytics,
        }
    }

    /// Report `outcome` downstream.
    ///
    /// A failed or cancelled job is treated like a shorter successful one:
    /// every logged entry is removed from the catalog, recorded in history and
    /// counted. An empty log touches nothing.
    pub fn aggregate(self, outcome: JobOutcome) -> OutcomeReport {
        let JobOutcome {
            job_id,
            status,
            total,
            log,
            error,
        } = outcome;

        match (&error, status) {
            (Some(e), _) => tracing::error!("{}", e),
            (None, TerminalStatus::Cancelled) => {
                tracing::info!("Rename cancelled after {} of {} files", log.len(), total);
            },
            (None, _) => {},
        }

        let mut report = OutcomeReport {
            job_id,
            status,
            total,
            log,
            categories: BTreeMap::new(),
            unmatched: Vec::new(),
            error: error.map(|e| e.to_string()),
            history_error: None,
        };

        if report.log.is_empty() {
            return report;
        }

        for entry in &report.log {
            match self.catalog.locate(&entry.source) {
                Some(item) => {
                    let category = self.catalog.classify(item);
                    *report.categories.entry(category).or_default() += 1;
                    self.catalog.remove(item);
                },
                None => {
                    tracing::warn!(
                        "Renamed file not found in catalog: {}",
                        entry.source.display()
                    );
                    report.unmatched.push(entry.source.clone());
                },
            }
        }

        tracing::info!("{} files renamed.", report.log.len());

        if let Err(e) = self.history.append(&report.job_id, report.status, &report.log) {
            tracing::warn!("Failed to record rename history: {:#}", e);
            report.history_error = Some(format!("{e:#}"));
        }

        for (category, count) in &report.categories {
            if let Err(e) = self.analytics.report(*category, *count) {
                tracing::warn!("Failed to report {} renames: {:#}", category, e);
            }
        }

        report
    }
}
