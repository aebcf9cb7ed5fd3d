//! Shared state for the HTTP handlers and the background scheduler.

use crate::cache::SnapshotStore;
use crate::config::Config;
use crate::http_client::Fetcher;
use crate::notify::Notifier;
use crate::sync::{self, NewChapters, SyncError};

pub struct AppState {
    pub fetcher: Fetcher,
    pub store: SnapshotStore,
    pub notifier: Notifier,
    pub config: Config,
}

impl AppState {
    /// One full check-and-notify cycle.
    ///
    /// A failed notification is logged but does not fail the cycle: the
    /// chapters are already persisted, and retrying delivery would announce
    /// them twice.
    pub async fn check(&self) -> Result<NewChapters, SyncError> {
        let fresh = sync::run(&self.fetcher, &self.store, &self.config.sources).await?;
        if let Err(e) = self.notifier.send(&fresh).await {
            log::error!("notification delivery failed: {e}");
        }
        Ok(fresh)
    }
}
