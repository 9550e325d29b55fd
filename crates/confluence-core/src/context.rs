//! Startup and shutdown wiring.
//!
//! `AppContext` owns the lifecycle of every core component. Components hold
//! `Arc`s to each other and are handed to callers explicitly; nothing is
//! looked up through globals.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::api::{Gateway, HttpTransport, Transport};
use crate::auth::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, SessionManager, TokenStore};
use crate::cache::QueryCache;
use crate::callback::AuthCallback;
use crate::config::{Config, TokenStorage};
use crate::documents::DocumentService;
use crate::navigation::Navigator;
use crate::notify::Notifier;

pub struct AppContext {
    pub config: Config,
    pub sessions: Arc<SessionManager>,
    pub gateway: Arc<Gateway>,
    pub cache: Arc<QueryCache>,
    pub documents: DocumentService,
    navigator: Arc<dyn Navigator>,
}

impl AppContext {
    /// Build every component over HTTP and restore the persisted session.
    pub fn start(
        config: Config,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let store = Self::token_store(&config)?;
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new()?);
        Ok(Self::start_with(config, store, transport, notifier, navigator))
    }

    /// Like [`AppContext::start`] with explicit storage and transport.
    pub fn start_with(
        config: Config,
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(store).with_leeway(config.clock_skew_leeway()));
        // Nothing may read the session before this returns
        sessions.initialize();

        let gateway = Arc::new(
            Gateway::new(
                transport,
                config.api_base_url.clone(),
                sessions.clone(),
                notifier,
                navigator.clone(),
            )
            .with_default_timeout(config.request_timeout())
            .with_default_retry(config.retry_policy()),
        );
        let cache = Arc::new(QueryCache::new());
        let documents = DocumentService::new(gateway.clone(), cache.clone());

        info!(
            api = %config.api_base_url,
            authenticated = sessions.is_authenticated(),
            "Client started"
        );

        Self {
            config,
            sessions,
            gateway,
            cache,
            documents,
            navigator,
        }
    }

    fn token_store(config: &Config) -> Result<Arc<dyn TokenStore>> {
        let store: Arc<dyn TokenStore> = match config.token_storage {
            TokenStorage::File => Arc::new(FileTokenStore::new(config.data_dir()?)),
            TokenStorage::Keyring => Arc::new(KeyringTokenStore),
            TokenStorage::Memory => Arc::new(MemoryTokenStore::new()),
        };
        Ok(store)
    }

    /// Callback handler wired to this context's session and navigator.
    pub fn auth_callback(&self) -> AuthCallback {
        AuthCallback::new(self.sessions.clone(), self.navigator.clone())
            .with_redirect_delay(self.config.callback_redirect_delay())
    }

    /// Drop cached query results. The session itself persists across runs.
    pub fn shutdown(self) {
        self.cache.clear();
        info!("Client shut down");
    }
}
