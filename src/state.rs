//! Application state management

use std::sync::Arc;

use crate::auth::{IdentityProvider, StaticIdentityProvider, TokenInfoProvider};
use crate::config::Config;
use crate::metadata::{HttpMetadataStore, InMemoryMetadataStore, MetadataStore};
use crate::upload::{ChunkStore, DeletionCoordinator, StoreError, UploadOrchestrator};

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to prepare staging directory: {0}")]
    Staging(#[from] StoreError),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    metadata: Arc<dyn MetadataStore>,
    identity: Arc<dyn IdentityProvider>,
    orchestrator: UploadOrchestrator,
    deletion: DeletionCoordinator,
}

impl AppState {
    /// Create application state from explicit collaborators
    pub fn new(
        config: Config,
        chunk_store: ChunkStore,
        metadata: Arc<dyn MetadataStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let orchestrator = UploadOrchestrator::new(
            chunk_store.clone(),
            metadata.clone(),
            config.quota.default_allotment,
        );
        let deletion = DeletionCoordinator::new(chunk_store, metadata.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                metadata,
                identity,
                orchestrator,
                deletion,
            }),
        }
    }

    /// Create application state with the collaborators `config` selects
    pub async fn from_config(config: Config) -> Result<Self, StateError> {
        let chunk_store = ChunkStore::create(config.storage.staging_dir.clone()).await?;
        tracing::info!("Staging chunks in {}", chunk_store.root().display());

        let metadata: Arc<dyn MetadataStore> = match &config.data_service.url {
            Some(url) => {
                tracing::info!("Data service: {}", url);
                Arc::new(HttpMetadataStore::new(url))
            }
            None => {
                tracing::warn!("DATA_SVC_HOST not set, keeping metadata in memory");
                Arc::new(InMemoryMetadataStore::new())
            }
        };

        let identity: Arc<dyn IdentityProvider> = if config.identity.disabled {
            tracing::warn!("Authentication disabled, bearer tokens are trusted as user ids");
            Arc::new(StaticIdentityProvider)
        } else {
            Arc::new(TokenInfoProvider::new(&config.identity.tokeninfo_url))
        };

        Ok(Self::new(config, chunk_store, metadata, identity))
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the metadata store
    pub fn metadata(&self) -> &Arc<dyn MetadataStore> {
        &self.inner.metadata
    }

    /// Get the identity provider
    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.inner.identity
    }

    /// Get the upload orchestrator
    pub fn orchestrator(&self) -> &UploadOrchestrator {
        &self.inner.orchestrator
    }

    /// Get the deletion coordinator
    pub fn deletion(&self) -> &DeletionCoordinator {
        &self.inner.deletion
    }

    /// Get the chunk store
    pub fn chunk_store(&self) -> &ChunkStore {
        self.inner.orchestrator.chunk_store()
    }
}
