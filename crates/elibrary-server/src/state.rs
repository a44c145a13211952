//! Application state shared across handlers.

use std::sync::Arc;

use elibrary_core::LendingPolicy;
use elibrary_store::LibraryRepository;

use crate::config::ServerConfig;
use crate::events::NotificationBroadcaster;

/// Application state shared across all handlers.
///
/// This is cloneable and can be extracted in handlers using `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Storage behind the repository traits.
    repo: Arc<dyn LibraryRepository>,
    /// Server configuration.
    config: Arc<ServerConfig>,
    /// Live notification push for SSE subscribers.
    broadcaster: Arc<NotificationBroadcaster>,
}

impl AppState {
    /// Create new application state.
    pub fn new(repo: Arc<dyn LibraryRepository>, config: ServerConfig) -> Self {
        Self {
            repo,
            config: Arc::new(config),
            broadcaster: Arc::new(NotificationBroadcaster::new()),
        }
    }

    /// Get a reference to the repository.
    pub fn repo(&self) -> &dyn LibraryRepository {
        self.repo.as_ref()
    }

    /// Get a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The lending policy from the configuration.
    pub fn policy(&self) -> &LendingPolicy {
        &self.config.lending
    }

    /// Get a reference to the notification broadcaster.
    pub fn broadcaster(&self) -> &Arc<NotificationBroadcaster> {
        &self.broadcaster
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
