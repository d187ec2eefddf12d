#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use cheek_dashboard::{ApiClient, EventQueue, EventSink, FetchError, Method, Transport};
use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::sync::oneshot;

struct Scripted {
    gate: Option<oneshot::Receiver<()>>,
    reply: Result<Value, FetchError>,
}

/// In-memory backend. Each scripted reply is used once, in order; an
/// unscripted request answers 404.
#[derive(Default)]
pub struct ScriptedBackend {
    routes: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    calls: Mutex<Vec<(Method, String)>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, method: Method, path: &str, scripted: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(scripted);
    }

    pub fn reply_json(&self, method: Method, path: &str, body: Value) {
        self.push(
            method,
            path,
            Scripted {
                gate: None,
                reply: Ok(body),
            },
        );
    }

    pub fn reply_status(&self, method: Method, path: &str, status: u16) {
        self.reply_error(
            method,
            path,
            FetchError::Status {
                path: path.to_string(),
                status,
            },
        );
    }

    pub fn reply_error(&self, method: Method, path: &str, error: FetchError) {
        self.push(
            method,
            path,
            Scripted {
                gate: None,
                reply: Err(error),
            },
        );
    }

    /// The reply is held back until the returned sender fires (or is dropped).
    pub fn reply_gated(&self, method: Method, path: &str, body: Value) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(
            method,
            path,
            Scripted {
                gate: Some(rx),
                reply: Ok(body),
            },
        );
        tx
    }

    pub fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, method: Method, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|(m, p)| *m == method && p == path)
            .count()
    }
}

impl Transport for ScriptedBackend {
    fn request<'a>(
        &'a self,
        method: Method,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Value, FetchError>> {
        self.calls
            .lock()
            .unwrap()
            .push((method, path.to_string()));
        let scripted = self
            .routes
            .lock()
            .unwrap()
            .get_mut(&(method, path.to_string()))
            .and_then(VecDeque::pop_front);

        Box::pin(async move {
            let Some(scripted) = scripted else {
                return Err(FetchError::Status {
                    path: path.to_string(),
                    status: 404,
                });
            };
            if let Some(gate) = scripted.gate {
                let _ = gate.await;
            }
            scripted.reply
        })
    }
}

pub struct Harness {
    pub backend: Arc<ScriptedBackend>,
    pub api: ApiClient,
    pub queue: Arc<EventQueue>,
    pub events: EventSink,
}

pub fn harness() -> Harness {
    let backend = ScriptedBackend::new();
    let api = ApiClient::new(backend.clone());
    let (queue, _notify) = EventQueue::new(64);
    let events = queue.sink();
    Harness {
        backend,
        api,
        queue,
        events,
    }
}
