//! The set of stores one dashboard page works with, and the sequence that
//! runs when a page is loaded.

use std::sync::Arc;

use cheek_telemetry as telemetry;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error};

use crate::api::ApiClient;
use crate::error::FetchError;
use crate::events::EventSink;
use crate::field::Settled;
use crate::identity::{location_path, resolve_location, JobIdentity};
use crate::job_store::{InitHandle, JobStore};
use crate::jobs_store::JobsListStore;
use crate::logs::LogsComponent;
use crate::models::VersionInfo;
use crate::selected::SelectedJobStore;
use crate::trigger::TriggerAction;
use crate::version::{TextSlot, VersionBadge};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Page {
    Overview,
    CoreLogs,
    JobRun(JobIdentity),
    Unknown(String),
}

impl Page {
    pub fn from_location(location: &str) -> Self {
        let path = location_path(location);
        match path.trim_end_matches('/') {
            "" => return Page::Overview,
            "/core/logs" => return Page::CoreLogs,
            _ => {}
        }
        if path.starts_with("/jobs/") {
            if let Ok(identity) = resolve_location(path) {
                return Page::JobRun(identity);
            }
        }
        Page::Unknown(path.to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Page::Overview => "overview",
            Page::CoreLogs => "core_logs",
            Page::JobRun(_) => "job_run",
            Page::Unknown(_) => "unknown",
        }
    }
}

/// Every store a page can bind to, built once and handed to consumers.
pub struct Dashboard {
    api: ApiClient,
    events: EventSink,
    job: JobStore,
    jobs: JobsListStore,
    selected: SelectedJobStore,
    version: Arc<TextSlot>,
}

impl Dashboard {
    pub fn new(api: ApiClient, events: EventSink) -> Self {
        Self {
            job: JobStore::new(api.clone(), events.clone()),
            jobs: JobsListStore::new(api.clone(), events.clone()),
            selected: SelectedJobStore::new(),
            version: Arc::new(TextSlot::default()),
            api,
            events,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn job(&self) -> &JobStore {
        &self.job
    }

    pub fn jobs(&self) -> &JobsListStore {
        &self.jobs
    }

    pub fn selected(&self) -> &SelectedJobStore {
        &self.selected
    }

    pub fn trigger_action(&self) -> TriggerAction {
        TriggerAction::new(self.api.clone(), self.events.clone())
    }

    /// A fresh logs component for one widget.
    pub fn logs_component(&self) -> LogsComponent {
        LogsComponent::new(self.api.clone(), self.events.clone())
    }

    pub fn version_text(&self) -> Option<String> {
        self.version.text()
    }

    /// Runs the page-load sequence for `location`. Every fetch is started
    /// right away; nothing here waits for a response.
    pub fn load(&self, location: &str) -> PageLoad {
        let page = Page::from_location(location);
        debug!(page = page.kind(), "loading dashboard page");
        telemetry::event("page.load", &[("page", page.kind())]);

        let jobs = self.jobs.init();
        let job = match &page {
            Page::JobRun(identity) => Some(self.job.init_with(identity.clone())),
            // the job store is bound on every page; report why it stays empty
            _ => self.job.init(location).ok(),
        };
        let logs = matches!(page, Page::CoreLogs).then(|| {
            let component = self.logs_component();
            let handle = component.init();
            (component, handle)
        });
        let badge = VersionBadge::new(
            self.api.clone(),
            self.events.clone(),
            Arc::clone(&self.version),
        );
        let version = tokio::spawn(badge.mount());

        PageLoad {
            page,
            job,
            jobs,
            logs,
            version,
        }
    }
}

/// Handles of everything [`Dashboard::load`] started.
pub struct PageLoad {
    pub page: Page,
    job: Option<InitHandle>,
    jobs: JoinHandle<Settled>,
    logs: Option<(LogsComponent, JoinHandle<Settled>)>,
    version: JoinHandle<Result<VersionInfo, FetchError>>,
}

pub struct LoadedPage {
    pub page: Page,
    pub job: Option<(Settled, Settled)>,
    pub jobs: Settled,
    pub logs: Option<LogsComponent>,
    pub version: Option<VersionInfo>,
}

impl PageLoad {
    /// Waits for every fetch of the page load to finish.
    pub async fn settled(self) -> LoadedPage {
        let job = match self.job {
            Some(handle) => Some(handle.settled().await),
            None => None,
        };
        let jobs = self.jobs.await.unwrap_or_else(|err| aborted("job listing", err));
        let logs = match self.logs {
            Some((component, handle)) => {
                let _ = handle.await.unwrap_or_else(|err| aborted("core logs", err));
                Some(component)
            }
            None => None,
        };
        let version = match self.version.await {
            Ok(result) => result.ok(),
            Err(err) => {
                error!("version fetch ended abnormally: {err}");
                None
            }
        };
        LoadedPage {
            page: self.page,
            job,
            jobs,
            logs,
            version,
        }
    }
}

fn aborted(what: &str, err: JoinError) -> Settled {
    error!("{what} fetch ended abnormally: {err}");
    Settled::Aborted
}
