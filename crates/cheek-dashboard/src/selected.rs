use tokio::sync::watch;

use crate::identity::JobName;

/// Job the user picked in the interface. Only explicit user actions change it;
/// it is never derived from the location.
#[derive(Clone)]
pub struct SelectedJobStore {
    job_name: watch::Sender<Option<JobName>>,
}

impl Default for SelectedJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectedJobStore {
    pub fn new() -> Self {
        let (job_name, _) = watch::channel(None);
        Self { job_name }
    }

    pub fn set(&self, job_name: JobName) {
        self.job_name.send_replace(Some(job_name));
    }

    pub fn clear(&self) {
        self.job_name.send_replace(None);
    }

    pub fn get(&self) -> Option<JobName> {
        self.job_name.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<JobName>> {
        self.job_name.subscribe()
    }
}
