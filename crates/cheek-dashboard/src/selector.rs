//! The `"latest"` run token and the reserved `-1` run id it travels as.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const LATEST_TOKEN: &str = "latest";

/// Run id the backend interprets as "most recent run of this job".
pub const LATEST_RUN_SENTINEL: i64 = -1;

/// Backend-assigned id of a single run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub i64);

impl RunId {
    pub fn get(self) -> i64 {
        self.0
    }

    pub fn is_sentinel(self) -> bool {
        self.0 == LATEST_RUN_SENTINEL
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which run of a job a view refers to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RunSelector {
    Latest,
    ById(RunId),
    /// Token that is neither `latest` nor decimal; forwarded as-is and left
    /// for the backend to accept or reject.
    Token(String),
}

/// Maps a run token from a location to a selector.
pub fn resolve(token: &str) -> RunSelector {
    RunSelector::from_token(token)
}

impl RunSelector {
    pub fn from_token(token: &str) -> Self {
        if token == LATEST_TOKEN {
            return RunSelector::Latest;
        }
        // only canonical decimals become ids, so the token goes out unchanged
        match token.parse::<i64>() {
            Ok(id) if id.to_string() != token => RunSelector::Token(token.to_string()),
            Ok(LATEST_RUN_SENTINEL) => RunSelector::Latest,
            Ok(id) => RunSelector::ById(RunId(id)),
            Err(_) => RunSelector::Token(token.to_string()),
        }
    }

    /// Path segment sent to `/api/jobs/{name}/runs/{segment}`.
    pub fn wire_segment(&self) -> String {
        match self {
            RunSelector::Latest => LATEST_RUN_SENTINEL.to_string(),
            RunSelector::ById(id) => id.to_string(),
            RunSelector::Token(token) => token.clone(),
        }
    }

    pub fn sentinel_value(&self) -> Option<i64> {
        match self {
            RunSelector::Latest => Some(LATEST_RUN_SENTINEL),
            RunSelector::ById(id) => Some(id.get()),
            RunSelector::Token(_) => None,
        }
    }

    /// Token form suitable for building a `/jobs/<name>/<token>` location.
    pub fn to_token(&self) -> String {
        match self {
            RunSelector::Latest => LATEST_TOKEN.to_string(),
            other => other.wire_segment(),
        }
    }
}

impl From<RunId> for RunSelector {
    fn from(id: RunId) -> Self {
        if id.is_sentinel() {
            RunSelector::Latest
        } else {
            RunSelector::ById(id)
        }
    }
}

impl fmt::Display for RunSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_token())
    }
}
