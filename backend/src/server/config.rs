//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;

use mockable::{Clock, DefaultClock};

use crate::config::{AppSettings, SecretSettings};
use crate::domain::ports::{BackgroundTasks, ChainIndexer};
use crate::outbound::memory::InMemoryStore;
use crate::outbound::persistence::DbPool;
use crate::outbound::tasks::TokioBackgroundTasks;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) settings: AppSettings,
    pub(crate) secrets: SecretSettings,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) memory_store: Option<Arc<InMemoryStore>>,
    pub(crate) chain_indexer: Option<Arc<dyn ChainIndexer>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) tasks: Arc<dyn BackgroundTasks>,
}

impl ServerConfig {
    /// Construct a server configuration from loaded settings and secrets.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, settings: AppSettings, secrets: SecretSettings) -> Self {
        Self {
            bind_addr,
            settings,
            secrets,
            db_pool: None,
            memory_store: None,
            chain_indexer: None,
            clock: Arc::new(DefaultClock),
            tasks: Arc::new(TokioBackgroundTasks),
        }
    }

    /// Attach a database connection pool for persistence adapters.
    ///
    /// Without one, every repository is served by an in-memory store.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Use `store` instead of a fresh in-memory store when no pool is set.
    #[must_use]
    pub fn with_memory_store(mut self, store: Arc<InMemoryStore>) -> Self {
        self.memory_store = Some(store);
        self
    }

    /// Replace the reqwest chain indexer built from the settings.
    #[must_use]
    pub fn with_chain_indexer(mut self, indexer: Arc<dyn ChainIndexer>) -> Self {
        self.chain_indexer = Some(indexer);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_background_tasks(mut self, tasks: Arc<dyn BackgroundTasks>) -> Self {
        self.tasks = tasks;
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Database pool shared with the readiness probe, if any.
    #[must_use]
    pub fn db_pool(&self) -> Option<&DbPool> {
        self.db_pool.as_ref()
    }
}
