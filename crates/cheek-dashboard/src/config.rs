use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use cheek_util::{BASE_URL_ENV, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, FetchError};
use crate::transport::HttpTransport;

const CONFIG_FILE: &str = "dashboard-config.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub base_url: String,
    /// Zero leaves the HTTP client's own default in place.
    pub request_timeout_secs: u64,
    pub selected_job: String,
    pub last_location: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 0,
            selected_job: String::new(),
            last_location: String::new(),
        }
    }
}

impl DashboardConfig {
    /// Defaults, overlaid with the saved config file. `CHEEK_URL` wins over
    /// the file. Unreadable files are reported and ignored.
    pub fn load() -> Self {
        let path = config_path();
        match Self::load_from(&path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!("{err}");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut cfg = Self::read_stored(path)?;
        let env_url = cheek_util::env_or(BASE_URL_ENV, "");
        if !env_url.is_empty() {
            cfg.base_url = env_url;
        }
        Ok(cfg)
    }

    /// Applies `change` to the config file as stored and writes it back.
    /// Environment overrides are never persisted.
    pub fn update(change: impl FnOnce(&mut Self)) -> Result<Self, ConfigError> {
        Self::update_at(&config_path(), change)
    }

    pub fn update_at(path: &Path, change: impl FnOnce(&mut Self)) -> Result<Self, ConfigError> {
        let mut stored = Self::read_stored(path)?;
        change(&mut stored);
        stored.save_to(path)?;
        Ok(stored)
    }

    fn read_stored(path: &Path) -> Result<Self, ConfigError> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        cheek_util::write_json_atomic(path, self)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn base_url_or_default(&self) -> &str {
        if self.base_url.trim().is_empty() {
            DEFAULT_BASE_URL
        } else {
            self.base_url.trim()
        }
    }

    pub fn transport(&self) -> Result<HttpTransport, FetchError> {
        HttpTransport::with_timeout(self.base_url_or_default(), self.request_timeout())
    }
}

pub fn config_path() -> PathBuf {
    cheek_util::state_file_path(CONFIG_FILE)
}
