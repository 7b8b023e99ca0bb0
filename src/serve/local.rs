use crate::auth::{CredentialStore, Identity};
use crate::config::user::UserConfig;
use crate::error::GatewayError;
use crate::model::repository::RepositoryMetadata;
use crate::repository::RepositoryLocation;
use crate::serve::MetadataStore;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::warn;

pub const METADATA_FILE: &str = ".meta.json";

/// Reads `<repo>.git/.meta.json`.
#[derive(Clone, Debug, Default)]
pub struct SidecarMetadataStore;

impl SidecarMetadataStore {
    pub async fn save_metadata(
        &self,
        location: &RepositoryLocation,
        meta: &RepositoryMetadata,
    ) -> Result<(), GatewayError> {
        let data = serde_json::to_vec_pretty(meta)?;
        tokio::fs::write(location.path().join(METADATA_FILE), data).await?;
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for SidecarMetadataStore {
    async fn load_metadata(&self, location: &RepositoryLocation) -> Result<RepositoryMetadata, GatewayError> {
        let data = tokio::fs::read(location.path().join(METADATA_FILE))
            .await
            .map_err(|e| GatewayError::MetadataUnavailable(format!("{}: {}", location, e)))?;
        Ok(serde_json::from_slice(&data)?)
    }
}

/// Credential store backed by the `[[users]]` entries of the configuration.
#[derive(Clone, Debug, Default)]
pub struct ConfigCredentialStore {
    users: HashMap<String, UserConfig>,
    tokens: HashMap<String, String>,
}

impl ConfigCredentialStore {
    pub fn new(users: &[UserConfig]) -> Self {
        let mut store = Self::default();
        for user in users {
            for token in user.tokens.iter().chain(user.api_keys.iter()) {
                store.tokens.insert(token.clone(), user.username.clone());
            }
            store.users.insert(user.username.clone(), user.clone());
        }
        store
    }

    fn identity(&self, username: &str) -> Result<Identity, GatewayError> {
        let user = self
            .users
            .get(username)
            .ok_or(GatewayError::CredentialRejected)?;
        Ok(Identity {
            username: user.username.clone(),
            is_admin: user.is_admin,
        })
    }
}

#[async_trait]
impl CredentialStore for ConfigCredentialStore {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Identity, GatewayError> {
        let user = self
            .users
            .get(username)
            .ok_or(GatewayError::CredentialRejected)?;
        let hash = user.password_hash.clone();
        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| GatewayError::Io(e.to_string()))?;
        match verified {
            Ok(true) => self.identity(username),
            Ok(false) => Err(GatewayError::CredentialRejected),
            Err(e) => {
                warn!(user = %username, error = %e, "stored password hash is not a valid bcrypt hash");
                Err(GatewayError::CredentialRejected)
            }
        }
    }

    async fn resolve_token(&self, token: &str) -> Result<Identity, GatewayError> {
        let username = self
            .tokens
            .get(token)
            .ok_or(GatewayError::CredentialRejected)?;
        self.identity(username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepoLocator;

    fn users() -> Vec<UserConfig> {
        vec![UserConfig {
            username: "alice".to_string(),
            password_hash: bcrypt::hash("correct horse", 4).unwrap(),
            tokens: vec!["login-token".to_string()],
            api_keys: vec!["api-key".to_string()],
            is_admin: true,
        }]
    }

    #[tokio::test]
    async fn test_malformed_hash_is_rejected() {
        let mut users = users();
        users[0].password_hash = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad".to_string();
        let store = ConfigCredentialStore::new(&users);
        assert!(matches!(
            store.authenticate("alice", "abc").await,
            Err(GatewayError::CredentialRejected)
        ));
    }

    #[tokio::test]
    async fn test_authenticate() {
        let store = ConfigCredentialStore::new(&users());
        let identity = store.authenticate("alice", "correct horse").await.unwrap();
        assert_eq!(identity.username, "alice");
        assert!(identity.is_admin);
        assert!(store.authenticate("alice", "wrong").await.is_err());
        assert!(store.authenticate("nobody", "correct horse").await.is_err());
    }

    #[tokio::test]
    async fn test_tokens_and_api_keys() {
        let store = ConfigCredentialStore::new(&users());
        assert_eq!(store.resolve_token("login-token").await.unwrap().username, "alice");
        assert_eq!(store.resolve_token("api-key").await.unwrap().username, "alice");
        assert!(matches!(
            store.resolve_token("nope").await,
            Err(GatewayError::CredentialRejected)
        ));
    }

    #[tokio::test]
    async fn test_sidecar_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("alice").join("project.git")).unwrap();
        let location = RepoLocator::new(dir.path())
            .unwrap()
            .locate("alice", "project")
            .unwrap();
        let store = SidecarMetadataStore;
        assert!(matches!(
            store.load_metadata(&location).await,
            Err(GatewayError::MetadataUnavailable(_))
        ));

        let mut meta = RepositoryMetadata::new("alice", true);
        meta.stars_count = 7;
        store.save_metadata(&location, &meta).await.unwrap();
        assert_eq!(store.load_metadata(&location).await.unwrap(), meta);
    }

    #[tokio::test]
    async fn test_corrupt_sidecar_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("alice").join("project.git");
        std::fs::create_dir_all(&repo).unwrap();
        std::fs::write(repo.join(METADATA_FILE), b"{not json").unwrap();
        let location = RepoLocator::new(dir.path())
            .unwrap()
            .locate("alice", "project")
            .unwrap();
        assert!(matches!(
            SidecarMetadataStore.load_metadata(&location).await,
            Err(GatewayError::MetadataUnavailable(_))
        ));
    }
}
