//! Observable, fenced store fields.
//!
//! A field keeps the last good value next to the status of the most recent
//! request. Requests take a ticket before they go out; only the holder of the
//! newest ticket may settle the field, so a slow response can never overwrite
//! the result of a request issued after it.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::error::FetchError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(FetchError),
}

impl FetchStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, FetchStatus::Ready | FetchStatus::Failed(_))
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchStatus::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldState<T> {
    pub value: Option<T>,
    pub status: FetchStatus,
}

impl<T> Default for FieldState<T> {
    fn default() -> Self {
        Self {
            value: None,
            status: FetchStatus::Idle,
        }
    }
}

/// How a fetch ended from the store's point of view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Settled {
    /// The field now holds the fetched value.
    Updated,
    /// The request failed; the previous value was kept.
    Degraded(FetchError),
    /// A newer request was issued meanwhile; the response was dropped.
    Superseded,
    /// Nothing was requested, e.g. no job identity yet.
    Skipped,
    /// The task running the fetch was cancelled or panicked.
    Aborted,
}

impl Settled {
    pub fn is_updated(&self) -> bool {
        matches!(self, Settled::Updated)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket(u64);

pub(crate) struct Field<T> {
    tx: watch::Sender<FieldState<T>>,
    issued: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> Field<T> {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(FieldState::default());
        Self {
            tx,
            issued: AtomicU64::new(0),
        }
    }

    /// Issues a ticket that supersedes every earlier one and marks the field
    /// as loading.
    pub(crate) fn begin(&self) -> Ticket {
        let ticket = Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1);
        self.tx.send_modify(|state| state.status = FetchStatus::Loading);
        ticket
    }

    pub(crate) fn is_current(&self, ticket: Ticket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }

    /// Applies a response. Failures keep the previous value.
    pub(crate) fn settle(&self, ticket: Ticket, result: Result<T, FetchError>) -> Settled {
        let mut outcome = Settled::Superseded;
        self.tx.send_if_modified(|state| {
            if !self.is_current(ticket) {
                return false;
            }
            match result {
                Ok(value) => {
                    state.value = Some(value);
                    state.status = FetchStatus::Ready;
                    outcome = Settled::Updated;
                }
                Err(err) => {
                    state.status = FetchStatus::Failed(err.clone());
                    outcome = Settled::Degraded(err);
                }
            }
            true
        });
        outcome
    }

    /// Drops any value and status; outstanding tickets become stale.
    pub(crate) fn reset(&self) {
        self.issued.fetch_add(1, Ordering::SeqCst);
        self.tx.send_replace(FieldState::default());
    }

    pub(crate) fn value(&self) -> Option<T> {
        self.tx.borrow().value.clone()
    }

    pub(crate) fn status(&self) -> FetchStatus {
        self.tx.borrow().status.clone()
    }

    pub(crate) fn state(&self) -> FieldState<T> {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<FieldState<T>> {
        self.tx.subscribe()
    }

    pub(crate) fn stream(&self) -> WatchStream<FieldState<T>> {
        WatchStream::new(self.tx.subscribe())
    }
}

/// Waits until the field's current request has settled and returns its state.
pub async fn wait_settled<T: Clone>(
    rx: &mut watch::Receiver<FieldState<T>>,
) -> FieldState<T> {
    // a closed channel just means no further updates; report what is there
    let _ = rx
        .wait_for(|state| !matches!(state.status, FetchStatus::Loading))
        .await;
    rx.borrow().clone()
}
