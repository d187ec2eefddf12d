use cheek_telemetry as telemetry;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::api::ApiClient;
use crate::error::FetchError;
use crate::events::{DashboardEvent, EventSink};
use crate::identity::JobName;
use crate::models::StatusReply;

/// Asks the backend to start a run of a job.
///
/// Holds no store, so triggering never changes displayed state; callers that
/// want to see the new run re-fetch it themselves.
#[derive(Clone)]
pub struct TriggerAction {
    api: ApiClient,
    events: EventSink,
}

impl TriggerAction {
    pub fn new(api: ApiClient, events: EventSink) -> Self {
        Self { api, events }
    }

    /// Fires the request in the background and returns immediately.
    pub fn trigger(&self, job: JobName) -> JoinHandle<Result<StatusReply, FetchError>> {
        let action = self.clone();
        tokio::spawn(async move { action.run(&job).await })
    }

    /// Sends the trigger and waits for the backend's answer.
    pub async fn run(&self, job: &JobName) -> Result<StatusReply, FetchError> {
        let result = self.api.trigger(job).await;
        match &result {
            Ok(_) => info!("job {job} triggered"),
            Err(err) => error!("job {job} could not be triggered: {err}"),
        }
        telemetry::event(
            "job.trigger",
            &[
                ("job", job.as_str()),
                ("outcome", if result.is_ok() { "ok" } else { "error" }),
            ],
        );
        self.events.emit(DashboardEvent::TriggerFinished {
            job: job.clone(),
            result: result.as_ref().map(|_| ()).map_err(|err| err.clone()),
        });
        result
    }
}
