//! Client-side state for the cheek job dashboard.
//!
//! A page location such as `/jobs/nightly-build/latest` is resolved into a
//! job identity, the job's spec and run are fetched concurrently from the
//! dashboard API, and the results are published through observable stores.
//! Failures never escape a fetch: they are logged, reported on the event
//! queue, and leave the previous value in place.

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod field;
pub mod identity;
pub mod job_store;
pub mod jobs_store;
pub mod logs;
pub mod models;
pub mod page;
pub mod selected;
pub mod selector;
pub mod transport;
pub mod trigger;
pub mod version;

pub use api::ApiClient;
pub use config::DashboardConfig;
pub use error::{ConfigError, FetchError, IdentityError};
pub use events::{DashboardEvent, EventQueue, EventSink, Resource, DEFAULT_EVENT_QUEUE_SIZE};
pub use field::{FetchStatus, FieldState, Settled};
pub use identity::{resolve_location, JobIdentity, JobName};
pub use job_store::{HalfState, InitHandle, JobSnapshot, JobStore, JobStorePhase};
pub use jobs_store::JobsListStore;
pub use logs::LogsComponent;
pub use models::{JobListing, JobRun, JobSpec, LogEntry, ScheduleStatus, StatusReply, VersionInfo};
pub use page::{Dashboard, LoadedPage, Page, PageLoad};
pub use selected::SelectedJobStore;
pub use selector::{resolve, RunId, RunSelector, LATEST_RUN_SENTINEL};
pub use transport::{HttpTransport, Method, Transport};
pub use trigger::TriggerAction;
pub use version::{version_label, DisplaySurface, TextSlot, VersionBadge};
