//! Resolves the job identity a dashboard location points at.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

const JOBS_SEGMENT: &str = "/jobs/";

/// Name of a job as configured on the backend. Never empty, never contains `/`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobName(String);

impl JobName {
    pub fn new(name: impl Into<String>) -> Result<Self, IdentityError> {
        let name = name.into();
        if name.is_empty() || name.contains('/') {
            return Err(IdentityError::InvalidJobName(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for JobName {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        JobName::new(value)
    }
}

impl From<JobName> for String {
    fn from(value: JobName) -> Self {
        value.0
    }
}

impl std::str::FromStr for JobName {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobName::new(s)
    }
}

/// The `(job name, run token)` pair carried by a `/jobs/<name>/<run>` location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobIdentity {
    pub job_name: JobName,
    pub run_token: String,
}

/// Extracts `{job_name, run_token}` from the first `/jobs/<name>/<run>`
/// occurrence in the location's path. Segments after the run token are
/// ignored; the query string and fragment are never part of the match.
pub fn resolve_location(location: &str) -> Result<JobIdentity, IdentityError> {
    let path = location_path(location);
    let mut rest = path;
    while let Some(pos) = rest.find(JOBS_SEGMENT) {
        let mut segments = rest[pos + JOBS_SEGMENT.len()..].splitn(3, '/');
        let name = segments.next().unwrap_or_default();
        let token = segments.next().unwrap_or_default();
        if !name.is_empty() && !token.is_empty() {
            return Ok(JobIdentity {
                job_name: JobName::new(name)?,
                run_token: token.to_string(),
            });
        }
        // keep scanning, a later "/jobs/" may still match
        rest = &rest[pos + 1..];
    }
    Err(IdentityError::NoJobPath {
        location: location.to_string(),
    })
}

/// Path component of an absolute URL or of a bare path.
pub(crate) fn location_path(location: &str) -> &str {
    let path = match location.find("://") {
        Some(idx) => {
            let after_scheme = &location[idx + 3..];
            match after_scheme.find('/') {
                Some(slash) => &after_scheme[slash..],
                None => "",
            }
        }
        None => location,
    };
    let end = path.find(|c| c == '?' || c == '#').unwrap_or(path.len());
    &path[..end]
}
