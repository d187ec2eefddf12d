//! State of the job page: which job and run are viewed, the job's spec and
//! the run's result.

use std::sync::{Arc, Mutex, MutexGuard};

use cheek_telemetry as telemetry;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error, info, warn};

use crate::api::ApiClient;
use crate::error::IdentityError;
use crate::events::{DashboardEvent, EventSink, Resource};
use crate::field::{FetchStatus, Field, FieldState, Settled, Ticket};
use crate::identity::{resolve_location, JobIdentity, JobName};
use crate::models::{JobRun, JobSpec};
use crate::selector::RunSelector;

/// Progress of one of the two page fetches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalfState {
    Pending,
    Ready,
    Degraded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStorePhase {
    Uninitialized,
    IdentityResolved,
    Loading { spec: HalfState, run: HalfState },
    Ready,
    /// Both fetches finished and at least one failed. Nothing retries from here.
    PartiallyDegraded,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JobSnapshot {
    pub job_name: Option<JobName>,
    pub run_id: Option<RunSelector>,
    pub spec: FieldState<JobSpec>,
    pub run: FieldState<JobRun>,
}

impl JobSnapshot {
    pub fn phase(&self) -> JobStorePhase {
        if self.job_name.is_none() {
            return JobStorePhase::Uninitialized;
        }
        match (half(&self.spec.status), half(&self.run.status)) {
            (None, None) => JobStorePhase::IdentityResolved,
            (Some(HalfState::Ready), Some(HalfState::Ready)) => JobStorePhase::Ready,
            (Some(spec), Some(run)) if spec != HalfState::Pending && run != HalfState::Pending => {
                JobStorePhase::PartiallyDegraded
            }
            (spec, run) => JobStorePhase::Loading {
                spec: spec.unwrap_or(HalfState::Pending),
                run: run.unwrap_or(HalfState::Pending),
            },
        }
    }
}

fn half(status: &FetchStatus) -> Option<HalfState> {
    match status {
        FetchStatus::Idle => None,
        FetchStatus::Loading => Some(HalfState::Pending),
        FetchStatus::Ready => Some(HalfState::Ready),
        FetchStatus::Failed(_) => Some(HalfState::Degraded),
    }
}

/// Handles of the two fetches launched by [`JobStore::init`]. Dropping it
/// leaves the fetches running.
pub struct InitHandle {
    spec: JoinHandle<Settled>,
    run: JoinHandle<Settled>,
}

impl InitHandle {
    pub async fn settled(self) -> (Settled, Settled) {
        let (spec, run) = tokio::join!(self.spec, self.run);
        (join_outcome(spec), join_outcome(run))
    }
}

fn join_outcome(result: Result<Settled, JoinError>) -> Settled {
    result.unwrap_or_else(|err| {
        error!("job store fetch task ended abnormally: {err}");
        Settled::Aborted
    })
}

#[derive(Clone)]
pub struct JobStore {
    inner: Arc<Inner>,
}

struct Inner {
    api: ApiClient,
    events: EventSink,
    /// Held while the identity is read or replaced together with taking
    /// tickets, so a ticket is never paired with another init's identity.
    identity: Mutex<()>,
    job_name: watch::Sender<Option<JobName>>,
    run_id: watch::Sender<Option<RunSelector>>,
    spec: Field<JobSpec>,
    run: Field<JobRun>,
}

impl JobStore {
    pub fn new(api: ApiClient, events: EventSink) -> Self {
        let (job_name, _) = watch::channel(None);
        let (run_id, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                api,
                events,
                identity: Mutex::new(()),
                job_name,
                run_id,
                spec: Field::new(),
                run: Field::new(),
            }),
        }
    }

    /// Resolves the identity carried by `location` and starts loading the
    /// job's spec and run. Returns as soon as both fetches are launched.
    pub fn init(&self, location: &str) -> Result<InitHandle, IdentityError> {
        match resolve_location(location) {
            Ok(identity) => Ok(self.init_with(identity)),
            Err(err) => {
                warn!("cannot resolve job identity: {err}");
                self.inner.events.emit(DashboardEvent::IdentityUnresolved {
                    location: location.to_string(),
                    error: err.clone(),
                });
                Err(err)
            }
        }
    }

    pub fn init_with(&self, identity: JobIdentity) -> InitHandle {
        let JobIdentity {
            job_name,
            run_token,
        } = identity;
        let selector = RunSelector::from_token(&run_token);

        let (spec_ticket, run_ticket) = {
            let _identity = self.inner.lock_identity();
            // tickets first: any fetch still in flight from an earlier init
            // is stale before the new identity becomes visible
            let spec_ticket = self.inner.spec.begin();
            let run_ticket = self.inner.run.begin();
            self.inner.job_name.send_replace(Some(job_name.clone()));
            self.inner.run_id.send_replace(Some(selector.clone()));
            (spec_ticket, run_ticket)
        };

        info!(job = %job_name, run = %selector, "job store initialised");
        let run_token = selector.to_token();
        telemetry::event(
            "store.init",
            &[("job", job_name.as_str()), ("run", run_token.as_str())],
        );

        let spec = tokio::spawn({
            let inner = Arc::clone(&self.inner);
            let job = job_name.clone();
            async move { inner.load_spec(job, spec_ticket).await }
        });
        let run = tokio::spawn({
            let inner = Arc::clone(&self.inner);
            async move { inner.load_run(job_name, selector, run_ticket).await }
        });
        InitHandle { spec, run }
    }

    /// Reloads the spec of the current job.
    pub async fn fetch_spec(&self) -> Settled {
        let (job, ticket) = {
            let _identity = self.inner.lock_identity();
            let Some(job) = self.job_name() else {
                debug!("fetch_spec before any job identity was resolved");
                return Settled::Skipped;
            };
            (job, self.inner.spec.begin())
        };
        self.inner.load_spec(job, ticket).await
    }

    /// Loads `run` of the current job. On success the store's run id becomes
    /// the id the backend reported, which turns `Latest` into a concrete id.
    pub async fn fetch_job_run(&self, run: RunSelector) -> Settled {
        self.fetch_run(Some(run)).await
    }

    /// Reloads the run currently identified by the store's run id.
    pub async fn refresh_run(&self) -> Settled {
        self.fetch_run(None).await
    }

    async fn fetch_run(&self, run: Option<RunSelector>) -> Settled {
        let (job, run, ticket) = {
            let _identity = self.inner.lock_identity();
            let Some((job, run)) = self.job_name().zip(run.or_else(|| self.run_id())) else {
                debug!("run fetch before any job identity was resolved");
                return Settled::Skipped;
            };
            (job, run, self.inner.run.begin())
        };
        self.inner.load_run(job, run, ticket).await
    }

    /// Back to the state of a freshly constructed store. In-flight fetches
    /// are ignored when they complete.
    pub fn reset(&self) {
        let _identity = self.inner.lock_identity();
        self.inner.spec.reset();
        self.inner.run.reset();
        self.inner.job_name.send_replace(None);
        self.inner.run_id.send_replace(None);
    }

    pub fn job_name(&self) -> Option<JobName> {
        self.inner.job_name.borrow().clone()
    }

    pub fn run_id(&self) -> Option<RunSelector> {
        self.inner.run_id.borrow().clone()
    }

    pub fn spec(&self) -> Option<JobSpec> {
        self.inner.spec.value()
    }

    pub fn job_run(&self) -> Option<JobRun> {
        self.inner.run.value()
    }

    pub fn spec_status(&self) -> FetchStatus {
        self.inner.spec.status()
    }

    pub fn run_status(&self) -> FetchStatus {
        self.inner.run.status()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_name: self.job_name(),
            run_id: self.run_id(),
            spec: self.inner.spec.state(),
            run: self.inner.run.state(),
        }
    }

    pub fn phase(&self) -> JobStorePhase {
        self.snapshot().phase()
    }

    pub fn subscribe_job_name(&self) -> watch::Receiver<Option<JobName>> {
        self.inner.job_name.subscribe()
    }

    pub fn subscribe_run_id(&self) -> watch::Receiver<Option<RunSelector>> {
        self.inner.run_id.subscribe()
    }

    pub fn subscribe_spec(&self) -> watch::Receiver<FieldState<JobSpec>> {
        self.inner.spec.subscribe()
    }

    pub fn subscribe_run(&self) -> watch::Receiver<FieldState<JobRun>> {
        self.inner.run.subscribe()
    }

    pub fn spec_updates(&self) -> WatchStream<FieldState<JobSpec>> {
        self.inner.spec.stream()
    }

    pub fn run_updates(&self) -> WatchStream<FieldState<JobRun>> {
        self.inner.run.stream()
    }
}

impl Inner {
    fn lock_identity(&self) -> MutexGuard<'_, ()> {
        self.identity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn load_spec(&self, job: JobName, ticket: Ticket) -> Settled {
        let result = self.api.job_spec(&job).await;
        let settled = self.spec.settle(ticket, result);
        match &settled {
            Settled::Updated => debug!(job = %job, "job spec loaded"),
            other => self.report(Resource::JobSpec, &job, other),
        }
        settled
    }

    async fn load_run(&self, job: JobName, requested: RunSelector, ticket: Ticket) -> Settled {
        let result = self.api.job_run(&job, &requested).await;
        let resolved = result.as_ref().ok().map(|run| run.id);
        let settled = self.run.settle(ticket, result);

        match (&settled, resolved) {
            (Settled::Updated, Some(run_id)) => {
                let replaced = self.run_id.send_if_modified(|current| {
                    if !self.run.is_current(ticket) {
                        return false;
                    }
                    *current = Some(RunSelector::ById(run_id));
                    true
                });
                if replaced {
                    debug!(job = %job, requested = %requested, run_id = %run_id, "job run loaded");
                    self.events.emit(DashboardEvent::RunResolved {
                        job,
                        requested,
                        run_id,
                    });
                }
            }
            (other, _) => self.report(Resource::JobRun, &job, other),
        }
        settled
    }

    fn report(&self, resource: Resource, job: &JobName, settled: &Settled) {
        match settled {
            Settled::Degraded(err) => {
                warn!(job = %job, "failed to fetch {resource}: {err}");
                self.events.emit(DashboardEvent::FetchFailed {
                    resource,
                    error: err.clone(),
                });
            }
            Settled::Superseded => {
                debug!(job = %job, "dropping superseded {resource} response");
                self.events
                    .emit(DashboardEvent::FetchSuperseded { resource });
            }
            Settled::Updated | Settled::Skipped | Settled::Aborted => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;

    fn failed() -> FetchStatus {
        FetchStatus::Failed(FetchError::Status {
            path: "/api/jobs/a".into(),
            status: 500,
        })
    }

    fn snapshot(spec: FetchStatus, run: FetchStatus) -> JobSnapshot {
        JobSnapshot {
            job_name: Some(JobName::new("a").unwrap()),
            run_id: Some(RunSelector::Latest),
            spec: FieldState {
                value: None,
                status: spec,
            },
            run: FieldState {
                value: None,
                status: run,
            },
        }
    }

    #[test]
    fn phase_follows_both_halves() {
        let mut empty = snapshot(FetchStatus::Idle, FetchStatus::Idle);
        assert_eq!(empty.phase(), JobStorePhase::IdentityResolved);
        empty.job_name = None;
        assert_eq!(empty.phase(), JobStorePhase::Uninitialized);

        assert_eq!(
            snapshot(FetchStatus::Loading, FetchStatus::Ready).phase(),
            JobStorePhase::Loading {
                spec: HalfState::Pending,
                run: HalfState::Ready
            }
        );
        assert_eq!(
            snapshot(failed(), FetchStatus::Loading).phase(),
            JobStorePhase::Loading {
                spec: HalfState::Degraded,
                run: HalfState::Pending
            }
        );
        assert_eq!(
            snapshot(FetchStatus::Ready, FetchStatus::Ready).phase(),
            JobStorePhase::Ready
        );
        assert_eq!(
            snapshot(failed(), FetchStatus::Ready).phase(),
            JobStorePhase::PartiallyDegraded
        );
        assert_eq!(
            snapshot(failed(), failed()).phase(),
            JobStorePhase::PartiallyDegraded
        );
    }
}
