use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::FetchError;
use crate::identity::JobName;
use crate::models::{JobListing, JobRun, JobSpec, LogEntry, ScheduleStatus, StatusReply, VersionInfo};
use crate::selector::RunSelector;
use crate::transport::{Method, Transport};

pub const JOBS_PATH: &str = "/api/jobs/";
pub const CORE_LOGS_PATH: &str = "/api/core/logs";
pub const VERSION_PATH: &str = "/api/version";
pub const SCHEDULE_STATUS_PATH: &str = "/api/schedule/status";
pub const HEALTH_PATH: &str = "/healthz/";

pub fn job_path(job: &JobName) -> String {
    format!("/api/jobs/{job}")
}

pub fn job_run_path(job: &JobName, run: &RunSelector) -> String {
    format!("/api/jobs/{job}/runs/{}", run.wire_segment())
}

pub fn trigger_path(job: &JobName) -> String {
    format!("/api/jobs/{job}/trigger")
}

/// Typed calls against the dashboard API. Cheap to clone; every store holds
/// its own handle.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn from_transport<T: Transport + 'static>(transport: T) -> Self {
        Self::new(Arc::new(transport))
    }

    pub async fn job_spec(&self, job: &JobName) -> Result<JobSpec, FetchError> {
        self.get(&job_path(job)).await
    }

    pub async fn job_run(&self, job: &JobName, run: &RunSelector) -> Result<JobRun, FetchError> {
        self.get(&job_run_path(job, run)).await
    }

    pub async fn jobs(&self) -> Result<JobListing, FetchError> {
        self.get(JOBS_PATH).await
    }

    pub async fn trigger(&self, job: &JobName) -> Result<StatusReply, FetchError> {
        let path = trigger_path(job);
        // success is decided by the status code alone; the body is informational
        match self.transport.request(Method::Post, &path).await {
            Ok(body) => Ok(serde_json::from_value(body).unwrap_or_default()),
            Err(FetchError::Decode { .. }) => Ok(StatusReply::default()),
            Err(err) => Err(err),
        }
    }

    pub async fn core_logs(&self) -> Result<Vec<LogEntry>, FetchError> {
        let body = self.transport.request(Method::Get, CORE_LOGS_PATH).await?;
        if body.is_null() {
            return Ok(Vec::new());
        }
        decode(CORE_LOGS_PATH, body)
    }

    pub async fn version(&self) -> Result<VersionInfo, FetchError> {
        self.get(VERSION_PATH).await
    }

    pub async fn schedule_status(&self) -> Result<ScheduleStatus, FetchError> {
        self.get(SCHEDULE_STATUS_PATH).await
    }

    pub async fn health(&self) -> Result<StatusReply, FetchError> {
        self.get(HEALTH_PATH).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let body = self.transport.request(Method::Get, path).await?;
        decode(path, body)
    }
}

fn decode<T: DeserializeOwned>(path: &str, body: Value) -> Result<T, FetchError> {
    serde_json::from_value(body).map_err(|e| FetchError::decode(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::RunId;

    #[test]
    fn paths_follow_backend_routes() {
        let job = JobName::new("nightly-build").unwrap();
        assert_eq!(job_path(&job), "/api/jobs/nightly-build");
        assert_eq!(
            job_run_path(&job, &RunSelector::Latest),
            "/api/jobs/nightly-build/runs/-1"
        );
        assert_eq!(
            job_run_path(&job, &RunSelector::ById(RunId(42))),
            "/api/jobs/nightly-build/runs/42"
        );
        assert_eq!(trigger_path(&job), "/api/jobs/nightly-build/trigger");
    }
}
