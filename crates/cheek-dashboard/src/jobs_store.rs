use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::events::{DashboardEvent, EventSink, Resource};
use crate::field::{FetchStatus, Field, FieldState, Settled};
use crate::models::JobListing;

/// Listing of every configured job. Loaded once per page; there is no
/// background refresh.
#[derive(Clone)]
pub struct JobsListStore {
    inner: Arc<Inner>,
}

struct Inner {
    api: ApiClient,
    events: EventSink,
    jobs: Field<JobListing>,
}

impl JobsListStore {
    pub fn new(api: ApiClient, events: EventSink) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                events,
                jobs: Field::new(),
            }),
        }
    }

    /// Starts loading the listing without waiting for it.
    pub fn init(&self) -> JoinHandle<Settled> {
        let store = self.clone();
        tokio::spawn(async move { store.fetch_jobs().await })
    }

    pub async fn fetch_jobs(&self) -> Settled {
        let ticket = self.inner.jobs.begin();
        let result = self.inner.api.jobs().await;
        let settled = self.inner.jobs.settle(ticket, result);
        match &settled {
            Settled::Updated => debug!("job listing loaded"),
            Settled::Degraded(err) => {
                warn!("failed to fetch {}: {err}", Resource::Jobs);
                self.inner.events.emit(DashboardEvent::FetchFailed {
                    resource: Resource::Jobs,
                    error: err.clone(),
                });
            }
            Settled::Superseded => {
                self.inner.events.emit(DashboardEvent::FetchSuperseded {
                    resource: Resource::Jobs,
                });
            }
            Settled::Skipped | Settled::Aborted => {}
        }
        settled
    }

    pub fn jobs(&self) -> Option<JobListing> {
        self.inner.jobs.value()
    }

    /// The listing, or an empty one while nothing was loaded yet.
    pub fn jobs_or_empty(&self) -> JobListing {
        self.jobs().unwrap_or_default()
    }

    pub fn status(&self) -> FetchStatus {
        self.inner.jobs.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<FieldState<JobListing>> {
        self.inner.jobs.subscribe()
    }

    pub fn reset(&self) {
        self.inner.jobs.reset();
    }
}
