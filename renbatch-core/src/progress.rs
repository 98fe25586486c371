use crate::job::TerminalStatus;
use crate::plan::RenameEntry;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Mutex;
use std::time::Duration;

/// Emitted once per entry, right before its move is attempted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// 1-based position of the entry in the plan
    pub index: usize,
    pub total: usize,
    pub entry: RenameEntry,
}

impl ProgressEvent {
    /// "N of M" note for a progress display
    pub fn note(&self) -> String {
        format!("{} of {}", self.index, self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressMessage {
    Progress(ProgressEvent),
    /// Sent exactly once per subscriber, after the job reached a terminal state
    Done {
        status: TerminalStatus,
        completed: usize,
    },
}

#[derive(Default)]
struct HubState {
    subscribers: Vec<Sender<ProgressMessage>>,
    latest: Option<ProgressEvent>,
    finished: Option<(TerminalStatus, usize)>,
}

/// Fan-out of progress messages from the worker to any number of observers.
///
/// Sends are unbounded so the worker never waits on a slow observer. The lock
/// only guards the subscriber list, which keeps a subscription that races with
/// an emission from either missing or repeating the event.
#[derive(Default)]
pub(crate) struct ProgressHub {
    state: Mutex<HubState>,
}

impl ProgressHub {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn emit(&self, event: ProgressEvent) {
        let mut state = lock(&self.state);
        state
            .subscribers
            .retain(|tx| tx.send(ProgressMessage::Progress(event.clone())).is_ok());
        state.latest = Some(event);
    }

    pub(crate) fn finish(&self, status: TerminalStatus, completed: usize) {
        let mut state = lock(&self.state);
        if state.finished.is_some() {
            return;
        }
        for tx in state.subscribers.drain(..) {
            let _ = tx.send(ProgressMessage::Done { status, completed });
        }
        state.finished = Some((status, completed));
    }

    /// Attach a new observer. It first sees the most recent event, if any, and
    /// then everything emitted afterwards.
    pub(crate) fn subscribe(&self) -> ProgressSubscription {
        let (tx, rx) = mpsc::channel();
        let mut state = lock(&self.state);

        if let Some(latest) = &state.latest {
            let _ = tx.send(ProgressMessage::Progress(latest.clone()));
        }

        if let Some((status, completed)) = state.finished {
            let _ = tx.send(ProgressMessage::Done { status, completed });
        } else {
            state.subscribers.push(tx);
        }

        ProgressSubscription { rx }
    }
}

fn lock(state: &Mutex<HubState>) -> std::sync::MutexGuard<'_, HubState> {
    // A panicking observer cannot corrupt the list, so keep going
    state
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Receiving end of a job's progress messages.
///
/// Iterating yields messages until the `Done` message has been delivered.
pub struct ProgressSubscription {
    rx: Receiver<ProgressMessage>,
}

impl ProgressSubscription {
    /// Block until the next message, or `None` once the job is gone
    pub fn recv(&self) -> Option<ProgressMessage> {
        self.rx.recv().ok()
    }

    /// Wait at most `timeout` for the next message.
    ///
    /// `Ok(None)` means nothing arrived in time; `Err(())` means no further
    /// messages will ever arrive.
    #[allow(clippy::result_unit_err)]
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<ProgressMessage>, ()> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(()),
        }
    }

    /// Drain whatever is queued without blocking
    pub fn try_iter(&self) -> impl Iterator<Item = ProgressMessage> + '_ {
        std::iter::from_fn(move || match self.rx.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        })
    }
}

impl Iterator for ProgressSubscription {
    type Item = ProgressMessage;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }
}
