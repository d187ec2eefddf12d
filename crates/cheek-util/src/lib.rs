use std::{
    fs, io,
    path::{Path, PathBuf},
};

use cheek_telemetry as telemetry;
use serde::Serialize;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8081";
pub const BASE_URL_ENV: &str = "CHEEK_URL";

pub fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

pub fn data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".local/share/cheek")
    } else {
        PathBuf::from("/tmp/cheek")
    }
}

pub fn state_dir() -> PathBuf {
    data_dir().join("state")
}

pub fn state_file_path(file_name: &str) -> PathBuf {
    state_dir().join(file_name)
}

pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Joins a base URL and an absolute API path without doubling the slash.
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

pub fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

pub fn init_client_telemetry(app_name: &'static str, app_version: &'static str, base_url: &str) {
    telemetry::init_with_env(app_name, app_version);
    telemetry::event("client.start", &[("base_url", base_url)]);
    debug!("telemetry initialised for {app_name} {app_version}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(
            join_url("http://h:8081/", "/api/jobs/"),
            "http://h:8081/api/jobs/"
        );
        assert_eq!(join_url("http://h:8081", "api/version"), "http://h:8081/api/version");
    }

    #[test]
    fn write_json_atomic_replaces_file() {
        #[derive(Serialize)]
        struct Sample {
            value: u32,
        }

        let dir = std::env::temp_dir().join(format!("cheek-util-test-{}", std::process::id()));
        let path = dir.join("sample.json");
        write_json_atomic(&path, &Sample { value: 1 }).unwrap();
        write_json_atomic(&path, &Sample { value: 2 }).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"value\": 2"));
        assert!(!path.with_extension("json.tmp").exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
