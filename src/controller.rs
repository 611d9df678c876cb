//! Picks the active store once per process: the remote database when its handshake
//! succeeds in time, otherwise the local file-backed store. The choice is final;
//! there is no reconnection after falling back.

use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::errors::DbError;
use crate::store::{Collection, DocumentStore, LocalStore};
use crate::types::Backend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    ConnectedRemote,
    ConnectedLocal,
}

pub struct StoreController {
    config: StoreConfig,
    active: OnceCell<Arc<dyn DocumentStore>>,
    // Serializes concurrent connect() calls so only one selection runs.
    connecting: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for StoreController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreController")
            .field("data_dir", &self.config.data_dir)
            .field("remote_configured", &self.config.remote.is_some())
            .field("state", &self.state())
            .finish()
    }
}

impl StoreController {
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self { config, active: OnceCell::new(), connecting: tokio::sync::Mutex::new(()) }
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Select the active store. Calling again after a store was chosen returns it unchanged.
    ///
    /// # Errors
    /// Fails only if the local fallback cannot create its data directory; remote
    /// connection failures are logged and trigger the fallback instead.
    pub async fn connect(&self) -> Result<Arc<dyn DocumentStore>, DbError> {
        if let Some(s) = self.active.get() {
            return Ok(s.clone());
        }
        let _guard = self.connecting.lock().await;
        if let Some(s) = self.active.get() {
            return Ok(s.clone());
        }
        let store = self.select().await?;
        let _ = self.active.set(store.clone());
        Ok(store)
    }

    async fn select(&self) -> Result<Arc<dyn DocumentStore>, DbError> {
        if let Some(remote) = self.try_remote().await {
            return Ok(remote);
        }
        let local = LocalStore::open(&self.config.data_dir)?;
        log::info!("controller: using local fallback store at {}", self.config.data_dir.display());
        Ok(Arc::new(local))
    }

    #[cfg(feature = "remote")]
    async fn try_remote(&self) -> Option<Arc<dyn DocumentStore>> {
        let Some(cfg) = self.config.remote.as_ref() else {
            log::info!("controller: no remote database configured");
            return None;
        };
        match crate::store::RemoteStore::connect(cfg).await {
            Ok(remote) => Some(Arc::new(remote)),
            Err(e) => {
                log::warn!("controller: remote database unavailable ({}); falling back to local store", e);
                None
            }
        }
    }

    #[cfg(not(feature = "remote"))]
    async fn try_remote(&self) -> Option<Arc<dyn DocumentStore>> {
        if self.config.remote.is_some() {
            log::warn!("controller: remote database configured but built without the `remote` feature");
        }
        None
    }

    /// The store chosen by [`connect`](Self::connect).
    ///
    /// # Errors
    /// Returns `NotConnected` if `connect` has not completed yet.
    pub fn active_store(&self) -> Result<Arc<dyn DocumentStore>, DbError> {
        self.active.get().cloned().ok_or(DbError::NotConnected)
    }

    /// Shorthand for `active_store()?.collection(name)`.
    ///
    /// # Errors
    /// Returns `NotConnected` before `connect`, or an invalid-name error.
    pub fn collection(&self, name: &str) -> Result<Arc<dyn Collection>, DbError> {
        self.active_store()?.collection(name)
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        match self.active.get().map(|s| s.backend()) {
            None => ConnectionState::Disconnected,
            Some(Backend::Remote) => ConnectionState::ConnectedRemote,
            Some(Backend::Local) => ConnectionState::ConnectedLocal,
        }
    }
}
