//! Opt-in usage telemetry for dashboard clients.
//!
//! Events are queued on a bounded channel and appended as JSON lines by a
//! background thread, so recording never blocks a fetch or a trigger. Nothing
//! is recorded unless `CHEEK_TELEMETRY` is set to a truthy value.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

const EVENT_QUEUE_CAPACITY: usize = 256;
const MAX_EVENT_BYTES: u64 = 2 * 1024 * 1024;

#[derive(Clone)]
pub struct TelemetryOptions {
    pub app_name: &'static str,
    pub app_version: &'static str,
    pub enabled: bool,
    pub output_dir: Option<PathBuf>,
}

pub struct Telemetry {
    app_name: String,
    app_version: String,
    session_id: String,
    enabled: AtomicBool,
    sender: SyncSender<UsageEvent>,
}

#[derive(Serialize)]
struct UsageEvent {
    event_type: String,
    at_unix_millis: i64,
    app: String,
    version: String,
    session_id: String,
    properties: BTreeMap<String, String>,
}

static TELEMETRY: OnceLock<Arc<Telemetry>> = OnceLock::new();

pub fn init(options: TelemetryOptions) -> Arc<Telemetry> {
    if let Some(existing) = TELEMETRY.get() {
        existing.enabled.store(options.enabled, Ordering::Relaxed);
        return Arc::clone(existing);
    }

    let (sender, receiver) = sync_channel(EVENT_QUEUE_CAPACITY);
    let telemetry = Arc::new(Telemetry {
        app_name: options.app_name.to_string(),
        app_version: options.app_version.to_string(),
        session_id: new_session_id(),
        enabled: AtomicBool::new(options.enabled),
        sender,
    });

    let dir = options
        .output_dir
        .unwrap_or_else(|| default_output_dir(options.app_name));
    start_writer_thread(dir, receiver);

    let _ = TELEMETRY.set(Arc::clone(&telemetry));
    telemetry
}

pub fn init_with_env(app_name: &'static str, app_version: &'static str) -> Arc<Telemetry> {
    init(TelemetryOptions {
        app_name,
        app_version,
        enabled: env_flag("CHEEK_TELEMETRY"),
        output_dir: None,
    })
}

/// Records an event on the process-wide recorder, if one was initialised.
pub fn event(event_type: &str, properties: &[(&str, &str)]) {
    if let Some(telemetry) = TELEMETRY.get() {
        telemetry.event(event_type, properties);
    }
}

impl Telemetry {
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn event(&self, event_type: &str, properties: &[(&str, &str)]) {
        if !self.is_enabled() {
            return;
        }
        let properties = properties
            .iter()
            .filter(|(key, _)| !key.trim().is_empty())
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        let event = UsageEvent {
            event_type: event_type.to_string(),
            at_unix_millis: now_millis(),
            app: self.app_name.clone(),
            version: self.app_version.clone(),
            session_id: self.session_id.clone(),
            properties,
        };
        // full queue: drop rather than stall the caller
        let _ = self.sender.try_send(event);
    }
}

fn start_writer_thread(dir: PathBuf, receiver: Receiver<UsageEvent>) {
    std::thread::spawn(move || {
        while let Ok(event) = receiver.recv() {
            write_event(&dir, &event);
        }
    });
}

fn write_event(dir: &Path, event: &UsageEvent) {
    if let Err(err) = fs::create_dir_all(dir) {
        eprintln!("telemetry: failed to create {}: {err}", dir.display());
        return;
    }

    let path = dir.join("events.jsonl");
    if rotate_if_needed(&path).is_err() {
        return;
    }

    let mut file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("telemetry: failed to open {}: {err}", path.display());
            return;
        }
    };
    if let Ok(line) = serde_json::to_string(event) {
        let _ = writeln!(file, "{line}");
    }
}

fn rotate_if_needed(path: &Path) -> std::io::Result<()> {
    if let Ok(meta) = fs::metadata(path) {
        if meta.len() >= MAX_EVENT_BYTES {
            let rotated = path.with_extension("jsonl.1");
            let _ = fs::remove_file(&rotated);
            fs::rename(path, rotated)?;
        }
    }
    Ok(())
}

fn default_output_dir(app_name: &str) -> PathBuf {
    let base = if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".local/share/cheek")
    } else {
        PathBuf::from("/tmp/cheek")
    };
    base.join("telemetry").join(app_name)
}

fn env_flag(name: &str) -> bool {
    match std::env::var(name) {
        Ok(value) => matches!(
            value.to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => false,
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn new_session_id() -> String {
    let now = now_millis();
    let pid = std::process::id();
    format!("{now:x}-{pid:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_flag_accepts_truthy_values() {
        std::env::set_var("CHEEK_TELEMETRY_TEST_FLAG", "Yes");
        assert!(env_flag("CHEEK_TELEMETRY_TEST_FLAG"));
        std::env::set_var("CHEEK_TELEMETRY_TEST_FLAG", "0");
        assert!(!env_flag("CHEEK_TELEMETRY_TEST_FLAG"));
        std::env::remove_var("CHEEK_TELEMETRY_TEST_FLAG");
        assert!(!env_flag("CHEEK_TELEMETRY_TEST_FLAG"));
    }

    #[test]
    fn rotation_moves_oversized_log_aside() {
        let dir = std::env::temp_dir().join(format!("cheek-telemetry-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("events.jsonl");
        fs::write(&path, vec![b'x'; MAX_EVENT_BYTES as usize]).unwrap();
        rotate_if_needed(&path).unwrap();
        assert!(!path.exists());
        assert!(path.with_extension("jsonl.1").exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
