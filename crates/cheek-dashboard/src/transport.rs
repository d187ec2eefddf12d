use std::fmt;
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use crate::error::FetchError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// Issues one request against the dashboard API and hands back the decoded
/// JSON body. An empty body decodes as `Value::Null`.
pub trait Transport: Send + Sync {
    fn request<'a>(
        &'a self,
        method: Method,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Value, FetchError>>;
}

/// `Transport` over HTTP.
#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_timeout(base_url, None)
    }

    /// `timeout` of `None` leaves the client's default in place.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, FetchError> {
        let base_url = base_url.into();
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| FetchError::Transport {
            path: base_url.clone(),
            message: format!("failed to build http client: {e}"),
        })?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, method: Method, path: &str) -> Result<Value, FetchError> {
        let url = cheek_util::join_url(&self.base_url, path);
        debug!("{method} {url}");
        let request = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        let resp = request.send().await.map_err(|e| FetchError::Transport {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(|e| FetchError::Transport {
            path: path.to_string(),
            message: format!("failed to read body: {e}"),
        })?;
        decode_body(path, &body)
    }
}

impl Transport for HttpTransport {
    fn request<'a>(
        &'a self,
        method: Method,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Value, FetchError>> {
        Box::pin(self.send(method, path))
    }
}

pub(crate) fn decode_body(path: &str, body: &[u8]) -> Result<Value, FetchError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| FetchError::decode(path, e))
}
