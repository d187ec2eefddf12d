use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::selector::RunId;

pub type ExtraFields = BTreeMap<String, Value>;

/// Configuration of one job as served by `GET /api/jobs/{name}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSpec {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    pub cron: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub command: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub triggers: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub retries: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub runs: Vec<JobRun>,
    pub yaml: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl JobSpec {
    /// Status of the most recent run the backend attached to this spec.
    pub fn last_status(&self) -> Option<i32> {
        self.runs.first().and_then(|run| run.status)
    }
}

/// One execution of a job. The backend always reports the canonical `id`,
/// also when the run was requested through the latest-run sentinel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobRun {
    pub id: RunId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub status: Option<i32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub log: String,
    #[serde(default)]
    pub triggered_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub triggered_by: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub triggered: Vec<String>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl JobRun {
    pub fn succeeded(&self) -> bool {
        self.status == Some(0)
    }
}

/// Snapshot of every configured job, keyed by job name.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct JobListing(pub BTreeMap<String, JobSpec>);

impl JobListing {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&JobSpec> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JobSpec)> {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for JobListing {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Keyed(BTreeMap<String, Value>),
            List(Vec<Value>),
            Missing(()),
        }

        // entries decode one by one; a malformed spec drops only itself
        let mut jobs = BTreeMap::new();
        match Wire::deserialize(deserializer)? {
            Wire::Keyed(entries) => {
                for (key, value) in entries {
                    if let Some(mut spec) = listing_entry(&key, value) {
                        if spec.name.is_empty() {
                            spec.name = key.clone();
                        }
                        jobs.insert(key, spec);
                    }
                }
            }
            Wire::List(entries) => {
                for (idx, value) in entries.into_iter().enumerate() {
                    if let Some(spec) = listing_entry(&format!("#{idx}"), value) {
                        jobs.insert(spec.name.clone(), spec);
                    }
                }
            }
            Wire::Missing(()) => {}
        }
        Ok(JobListing(jobs))
    }
}

fn listing_entry(key: &str, value: Value) -> Option<JobSpec> {
    match serde_json::from_value(value) {
        Ok(spec) => Some(spec),
        Err(err) => {
            warn!(entry = key, "skipping undecodable job in listing: {err}");
            None
        }
    }
}

/// Decodes an explicit `null` as the type's default, like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One line of the scheduler's own log, as served by `GET /api/core/logs`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogEntry {
    pub id: Option<i64>,
    pub job: Option<String>,
    pub timestamp: Option<String>,
    pub level: Option<String>,
    pub message: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionInfo {
    pub version: String,
    pub commit_sha: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleStatus {
    pub status: BTreeMap<String, i32>,
    pub failed_run_count: u32,
    pub has_failed_runs: bool,
}

impl ScheduleStatus {
    pub fn failing_jobs(&self) -> impl Iterator<Item = &str> {
        self.status
            .iter()
            .filter(|(_, status)| **status != 0)
            .map(|(name, _)| name.as_str())
    }
}

/// Small acknowledgement body used by the trigger and health endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusReply {
    #[serde(rename = "jobs")]
    pub job: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl StatusReply {
    pub fn is_ok(&self) -> bool {
        self.status.as_deref() == Some("ok")
    }
}
