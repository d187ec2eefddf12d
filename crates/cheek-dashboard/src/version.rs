use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::api::ApiClient;
use crate::error::FetchError;
use crate::events::{DashboardEvent, EventSink, Resource};
use crate::models::VersionInfo;

/// Somewhere a line of text can be shown.
pub trait DisplaySurface: Send + Sync {
    fn set_text(&self, text: &str);
}

impl<S: DisplaySurface + ?Sized> DisplaySurface for Arc<S> {
    fn set_text(&self, text: &str) {
        (**self).set_text(text)
    }
}

/// In-memory surface; keeps the last text written to it.
#[derive(Default)]
pub struct TextSlot {
    text: Mutex<Option<String>>,
}

impl TextSlot {
    pub fn text(&self) -> Option<String> {
        self.text
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl DisplaySurface for TextSlot {
    fn set_text(&self, text: &str) {
        *self
            .text
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(text.to_string());
    }
}

pub fn version_label(info: &VersionInfo) -> String {
    format!("Version: {}", info.version)
}

/// Fetches the backend version once and writes it to a surface.
pub struct VersionBadge<S> {
    api: ApiClient,
    events: EventSink,
    surface: S,
}

impl<S: DisplaySurface> VersionBadge<S> {
    pub fn new(api: ApiClient, events: EventSink, surface: S) -> Self {
        Self {
            api,
            events,
            surface,
        }
    }

    /// On failure the surface is left untouched.
    pub async fn mount(self) -> Result<VersionInfo, FetchError> {
        match self.api.version().await {
            Ok(info) => {
                self.surface.set_text(&version_label(&info));
                self.events.emit(DashboardEvent::VersionShown {
                    version: info.version.clone(),
                });
                Ok(info)
            }
            Err(err) => {
                warn!("failed to fetch {}: {err}", Resource::Version);
                self.events.emit(DashboardEvent::FetchFailed {
                    resource: Resource::Version,
                    error: err.clone(),
                });
                Err(err)
            }
        }
    }
}
