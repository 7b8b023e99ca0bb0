use crate::auth::CredentialStore;
use crate::auth::gate::AuthGate;
use crate::config::AppConfig;
use crate::config::git::GitConfig;
use crate::error::GatewayError;
use crate::model::repository::RepositoryMetadata;
use crate::repository::{RepoLocator, RepositoryLocation};
use async_trait::async_trait;
use std::sync::Arc;

/// Everything a request handler needs, shared across actix workers.
#[derive(Clone)]
pub struct AppCore {
    pub locator: RepoLocator,
    pub gate: AuthGate,
    pub git: GitConfig,
    pub realm: String,
}

#[async_trait]
pub trait MetadataStore: Send + Sync + 'static {
    async fn load_metadata(&self, location: &RepositoryLocation) -> Result<RepositoryMetadata, GatewayError>;
}

impl AppCore {
    pub fn new(
        config: &AppConfig,
        credentials: Arc<dyn CredentialStore>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            locator: RepoLocator::new(&config.git.repos_root)?,
            gate: AuthGate::new(credentials, metadata),
            git: config.git.clone(),
            realm: config.http.realm.clone(),
        })
    }

    /// Builds the core with the side-car metadata store and the users listed in `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, GatewayError> {
        Self::new(
            config,
            Arc::new(local::ConfigCredentialStore::new(&config.users)),
            Arc::new(local::SidecarMetadataStore),
        )
    }
}

pub mod local;
