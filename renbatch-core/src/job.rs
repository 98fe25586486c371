//! Background execution of a validated rename plan.
//!
//! A [`RenameJob`] owns one worker thread that walks the plan in order. Before
//! each entry the worker checks the cancellation flag, then announces the
//! entry to progress subscribers, then moves the file. The first failed move
//! ends the job. Whatever happened, the log of completed moves is handed back
//! through [`RenameJob::join`].

use crate::cancel::CancellationToken;
use crate::error::RenameError;
use crate::mover::FileMover;
use crate::plan::RenamePlan;
use crate::progress::{ProgressEvent, ProgressHub, ProgressSubscription};
use crate::rename_log::RenameLog;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How a job ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalStatus {
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Lifecycle of a job. `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    Finished(TerminalStatus),
}

impl JobState {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Finished(_))
    }
}

/// Everything a job produced, handed over once it ended
#[derive(Debug)]
pub struct JobOutcome {
    pub job_id: String,
    pub status: TerminalStatus,
    pub total: usize,
    pub log: RenameLog,
    pub error: Option<RenameError>,
}

/// Starts rename jobs with a given move primitive
pub struct RenameExecutor {
    mover: Arc<dyn FileMover>,
}

impl RenameExecutor {
    pub fn new(mover: impl FileMover + 'static) -> Self {
        Self {
            mover: Arc::new(mover),
        }
    }

    pub fn with_shared(mover: Arc<dyn FileMover>) -> Self {
        Self { mover }
    }

    /// Start a job for `plan` on a dedicated worker thread
    pub fn execute(&self, plan: RenamePlan) -> RenameJob {
        RenameJob::spawn(plan, Arc::clone(&self.mover), CancellationToken::new())
    }

    /// Like [`execute`](Self::execute), but observing an existing token.
    ///
    /// Useful when the token is wired to a signal handler before the job
    /// exists.
    pub fn execute_with_token(&self, plan: RenamePlan, token: CancellationToken) -> RenameJob {
        RenameJob::spawn(plan, Arc::clone(&self.mover), token)
    }
}

struct Shared {
    state: Mutex<JobState>,
    state_changed: Condvar,
    log: Mutex<RenameLog>,
    progress: ProgressHub,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn log(&self) -> MutexGuard<'_, RenameLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: JobState) {
        *self.state() = next;
        self.state_changed.notify_all();
    }
}

/// Handle to a running (or finished) rename job
pub struct RenameJob {
    id: String,
    total: usize,
    cancel: CancellationToken,
    shared: Arc<Shared>,
    worker: Worker,
}

enum Worker {
    Started(JoinHandle<Option<RenameError>>),
    Unavailable(Option<std::io::Error>),
    Joined,
}

impl RenameJob {
    fn spawn(plan: RenamePlan, mover: Arc<dyn FileMover>, cancel: CancellationToken) -> Self {
        let id = plan.id.clone();
        let total = plan.len();
        let shared = Arc::new(Shared {
            state: Mutex::new(JobState::Idle),
            state_changed: Condvar::new(),
            log: Mutex::new(RenameLog::new()),
            progress: ProgressHub::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker_cancel = cancel.clone();
        let worker = thread::Builder::new()
            .name(format!("renbatch-{id}"))
            .spawn(move || run_worker(&plan, mover.as_ref(), &worker_cancel, &worker_shared));

        let worker = match worker {
            Ok(handle) => Worker::Started(handle),
            Err(e) => {
                // No thread, no work: report it the same way a failed move is
                tracing::error!("Failed to start rename worker: {}", e);
                shared.set_state(JobState::Finished(TerminalStatus::Failed));
                shared.progress.finish(TerminalStatus::Failed, 0);
                Worker::Unavailable(Some(e))
            },
        };

        Self {
            id,
            total,
            cancel,
            shared,
            worker,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn state(&self) -> JobState {
        *self.shared.state()
    }

    /// Number of entries renamed so far
    pub fn completed(&self) -> usize {
        self.shared.log().len()
    }

    /// Copy of the log as it stands right now
    pub fn log_snapshot(&self) -> RenameLog {
        self.shared.log().clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Ask the worker to stop before the next entry.
    ///
    /// Returns false when the job already ended or cancellation was already
    /// requested; in both cases nothing changes. A request that arrives while
    /// the last entry is being moved still returns true, and the job then
    /// ends `Completed`.
    pub fn cancel(&self) -> bool {
        // The worker needs this lock to finish, so the check and the flag
        // cannot straddle the end of the job
        let state = self.shared.state();
        if state.is_finished() {
            return false;
        }
        self.cancel.cancel()
    }

    pub fn subscribe(&self) -> ProgressSubscription {
        self.shared.progress.subscribe()
    }

    /// Wait up to `timeout` for the job to end.
    ///
    /// Returns the terminal status, or `None` if the job is still running.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<TerminalStatus> {
        let guard = self.shared.state();
        let (guard, _) = self
            .shared
            .state_changed
            .wait_timeout_while(guard, timeout, |state| !state.is_finished())
            .unwrap_or_else(PoisonError::into_inner);

        match *guard {
            JobState::Finished(status) => Some(status),
            JobState::Idle | JobState::Running => None,
        }
    }

    /// Block until the job ends
    pub fn wait(&self) -> TerminalStatus {
        let guard = self.shared.state();
        let guard = self
            .shared
            .state_changed
            .wait_while(guard, |state| !state.is_finished())
            .unwrap_or_else(PoisonError::into_inner);

        match *guard {
            JobState::Finished(status) => status,
            // wait_while only returns once finished
            JobState::Idle | JobState::Running => TerminalStatus::Failed,
        }
    }

    /// Wait for the worker and take ownership of everything it produced
    pub fn join(mut self) -> JobOutcome {
        let error = match std::mem::replace(&mut self.worker, Worker::Joined) {
            Worker::Started(handle) => match handle.join() {
                Ok(error) => error,
                Err(payload) => Some(RenameError::WorkerPanicked(panic_message(&*payload))),
            },
            Worker::Unavailable(error) => error.map(RenameError::Spawn),
            Worker::Joined => None,
        };

        let status = match self.state() {
            JobState::Finished(status) => status,
            JobState::Idle | JobState::Running => TerminalStatus::Failed,
        };

        let log = std::mem::take(&mut *self.shared.log());

        JobOutcome {
            job_id: self.id.clone(),
            status,
            total: self.total,
            log,
            error,
        }
    }
}

impl fmt::Debug for RenameJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenameJob")
            .field("id", &self.id)
            .field("total", &self.total)
            .field("state", &self.state())
            .field("completed", &self.completed())
            .finish_non_exhaustive()
    }
}

fn run_worker(
    plan: &RenamePlan,
    mover: &dyn FileMover,
    cancel: &CancellationToken,
    shared: &Shared,
) -> Option<RenameError> {
    shared.set_state(JobState::Running);

    let result = panic::catch_unwind(AssertUnwindSafe(|| process_entries(plan, mover, cancel, shared)));

    let (status, error) = match result {
        Ok(Ok(status)) => (status, None),
        Ok(Err(error)) => (TerminalStatus::Failed, Some(error)),
        Err(payload) => (
            TerminalStatus::Failed,
            Some(RenameError::WorkerPanicked(panic_message(&*payload))),
        ),
    };

    let completed = shared.log().len();
    match &error {
        Some(e) => tracing::warn!("Rename job {} failed after {} renames: {}", plan.id, completed, e),
        None => tracing::debug!("Rename job {} {} ({} of {})", plan.id, status, completed, plan.len()),
    }

    shared.set_state(JobState::Finished(status));
    shared.progress.finish(status, completed);
    error
}

fn process_entries(
    plan: &RenamePlan,
    mover: &dyn FileMover,
    cancel: &CancellationToken,
    shared: &Shared,
) -> Result<TerminalStatus, RenameError> {
    let total = plan.len();

    for (i, entry) in plan.entries().iter().enumerate() {
        if cancel.is_cancelled() {
            return Ok(TerminalStatus::Cancelled);
        }

        shared.progress.emit(ProgressEvent {
            index: i + 1,
            total,
            entry: entry.clone(),
        });

        tracing::debug!(
            "Renaming {} -> {}",
            entry.source.display(),
            entry.destination.display()
        );
        mover
            .move_path(&entry.source, &entry.destination)
            .map_err(|error| RenameError::Io {
                from: entry.source.clone(),
                to: entry.destination.clone(),
                error,
            })?;

        shared.log().push(entry.clone());
    }

    Ok(TerminalStatus::Completed)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
