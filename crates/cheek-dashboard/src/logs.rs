use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::events::{DashboardEvent, EventSink, Resource};
use crate::field::{FetchStatus, Field, FieldState, Settled};
use crate::models::LogEntry;

/// Scheduler log lines for one log widget. Each widget builds its own
/// component; nothing is shared between instances.
pub struct LogsComponent {
    inner: Arc<Inner>,
}

struct Inner {
    api: ApiClient,
    events: EventSink,
    logs: Field<Vec<LogEntry>>,
}

impl LogsComponent {
    pub fn new(api: ApiClient, events: EventSink) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                events,
                logs: Field::new(),
            }),
        }
    }

    /// Starts loading the log without waiting for it.
    pub fn init(&self) -> JoinHandle<Settled> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.fetch().await })
    }

    pub async fn fetch_logs(&self) -> Settled {
        self.inner.fetch().await
    }

    pub fn logs(&self) -> Option<Vec<LogEntry>> {
        self.inner.logs.value()
    }

    pub fn status(&self) -> FetchStatus {
        self.inner.logs.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<FieldState<Vec<LogEntry>>> {
        self.inner.logs.subscribe()
    }
}

impl Inner {
    async fn fetch(&self) -> Settled {
        let ticket = self.logs.begin();
        let result = self.api.core_logs().await;
        let settled = self.logs.settle(ticket, result);
        match &settled {
            Settled::Updated => debug!("core logs loaded"),
            Settled::Degraded(err) => {
                warn!("failed to fetch {}: {err}", Resource::Logs);
                self.events.emit(DashboardEvent::FetchFailed {
                    resource: Resource::Logs,
                    error: err.clone(),
                });
            }
            Settled::Superseded | Settled::Skipped | Settled::Aborted => {}
        }
        settled
    }
}
