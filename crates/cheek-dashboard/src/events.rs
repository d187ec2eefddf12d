//! Structured failure and progress reports for whatever renders the stores.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::error::{FetchError, IdentityError};
use crate::identity::JobName;
use crate::selector::{RunId, RunSelector};

pub const DEFAULT_EVENT_QUEUE_SIZE: usize = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    JobSpec,
    JobRun,
    Jobs,
    Logs,
    Version,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Resource::JobSpec => "job spec",
            Resource::JobRun => "job run",
            Resource::Jobs => "job listing",
            Resource::Logs => "core logs",
            Resource::Version => "version",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DashboardEvent {
    IdentityUnresolved {
        location: String,
        error: IdentityError,
    },
    FetchFailed {
        resource: Resource,
        error: FetchError,
    },
    FetchSuperseded {
        resource: Resource,
    },
    RunResolved {
        job: JobName,
        requested: RunSelector,
        run_id: RunId,
    },
    TriggerFinished {
        job: JobName,
        result: Result<(), FetchError>,
    },
    VersionShown {
        version: String,
    },
}

impl DashboardEvent {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            DashboardEvent::IdentityUnresolved { .. }
                | DashboardEvent::FetchFailed { .. }
                | DashboardEvent::TriggerFinished { result: Err(_), .. }
        )
    }
}

/// Bounded queue of events; the receiver returned by [`EventQueue::new`]
/// wakes up whenever the queue goes from empty to non-empty.
pub struct EventQueue {
    queue: Mutex<VecDeque<DashboardEvent>>,
    notify: mpsc::Sender<()>,
    max_len: usize,
}

impl EventQueue {
    pub fn new(max_len: usize) -> (Arc<Self>, mpsc::Receiver<()>) {
        let (notify, notify_rx) = mpsc::channel(1);
        (
            Arc::new(Self {
                queue: Mutex::new(VecDeque::new()),
                notify,
                max_len: max_len.max(1),
            }),
            notify_rx,
        )
    }

    pub fn sink(self: &Arc<Self>) -> EventSink {
        EventSink {
            inner: Some(Arc::clone(self)),
        }
    }

    pub fn drain(&self) -> Vec<DashboardEvent> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<DashboardEvent>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, event: DashboardEvent) -> bool {
        let mut queue = self.lock();
        let was_empty = queue.is_empty();

        if queue.len() >= self.max_len {
            // superseded notices carry the least information, evict them first
            if let Some(pos) = queue
                .iter()
                .position(|ev| matches!(ev, DashboardEvent::FetchSuperseded { .. }))
            {
                queue.remove(pos);
            } else if matches!(event, DashboardEvent::FetchSuperseded { .. }) {
                return false;
            } else {
                queue.pop_front();
            }
        }

        queue.push_back(event);
        if was_empty {
            let _ = self.notify.try_send(());
        }
        true
    }
}

/// Write side of an [`EventQueue`]. A disabled sink discards everything.
#[derive(Clone, Default)]
pub struct EventSink {
    inner: Option<Arc<EventQueue>>,
}

impl EventSink {
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn emit(&self, event: DashboardEvent) -> bool {
        match &self.inner {
            Some(queue) => queue.push(event),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(status: u16) -> DashboardEvent {
        DashboardEvent::FetchFailed {
            resource: Resource::Jobs,
            error: FetchError::Status {
                path: "/api/jobs/".into(),
                status,
            },
        }
    }

    fn superseded() -> DashboardEvent {
        DashboardEvent::FetchSuperseded {
            resource: Resource::JobSpec,
        }
    }

    #[test]
    fn full_queue_evicts_superseded_first() {
        let (queue, _rx) = EventQueue::new(2);
        let sink = queue.sink();
        sink.emit(superseded());
        sink.emit(failed(500));
        sink.emit(failed(502));
        assert_eq!(queue.drain(), vec![failed(500), failed(502)]);
    }

    #[test]
    fn full_queue_drops_oldest_otherwise() {
        let (queue, _rx) = EventQueue::new(2);
        let sink = queue.sink();
        sink.emit(failed(500));
        sink.emit(failed(501));
        assert!(!sink.emit(superseded()));
        sink.emit(failed(502));
        assert_eq!(queue.drain(), vec![failed(501), failed(502)]);
    }

    #[tokio::test]
    async fn first_event_wakes_receiver() {
        let (queue, mut rx) = EventQueue::new(8);
        queue.sink().emit(failed(500));
        assert_eq!(rx.recv().await, Some(()));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn disabled_sink_discards() {
        assert!(!EventSink::disabled().emit(failed(500)));
    }
}
