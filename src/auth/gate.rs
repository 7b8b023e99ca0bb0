use crate::auth::{AuthContext, CredentialMethod, CredentialStore, Credentials, Identity};
use crate::error::GatewayError;
use crate::repository::RepositoryLocation;
use crate::serve::MetadataStore;
use crate::transaction::Action;
use std::sync::Arc;
use tracing::{debug, warn};

/// Decides whether a request may pull from or push to a repository.
///
/// Public repositories may be pulled by anyone. Every other combination requires
/// the caller to authenticate as the repository owner; administrators get no
/// override here.
#[derive(Clone)]
pub struct AuthGate {
    pub credentials: Arc<dyn CredentialStore>,
    pub metadata: Arc<dyn MetadataStore>,
}

impl AuthGate {
    pub fn new(credentials: Arc<dyn CredentialStore>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            credentials,
            metadata,
        }
    }

    pub async fn authorize(
        &self,
        location: &RepositoryLocation,
        action: Action,
        presented: &Credentials,
    ) -> Result<AuthContext, GatewayError> {
        let meta = match self.metadata.load_metadata(location).await {
            Ok(meta) => meta,
            Err(err) => {
                warn!(repo = %location, error = %err, "repository metadata unavailable, denying access");
                return Err(GatewayError::Unauthorized);
            }
        };
        if action == Action::Pull && meta.is_public {
            return Ok(AuthContext::anonymous());
        }
        match self.authenticate(presented, &meta.owner).await {
            Some(ctx) => Ok(ctx),
            None => {
                debug!(repo = %location, ?action, "no credential resolved to the repository owner");
                Err(GatewayError::Unauthorized)
            }
        }
    }

    /// Tries Basic credentials first, then the token, and returns the first one
    /// that resolves to `owner`. A valid credential for another user falls through.
    async fn authenticate(&self, presented: &Credentials, owner: &str) -> Option<AuthContext> {
        if let Some((username, password)) = &presented.basic {
            match self.credentials.authenticate(username, password).await {
                Ok(identity) if identity.username == owner => {
                    return Some(context(identity, CredentialMethod::Basic));
                }
                Ok(identity) => debug!(user = %identity.username, "basic identity is not the owner"),
                Err(err) => debug!(user = %username, error = %err, "basic authentication failed"),
            }
        }
        if let Some(token) = &presented.token {
            match self.credentials.resolve_token(token).await {
                Ok(identity) if identity.username == owner => {
                    return Some(context(identity, CredentialMethod::Token));
                }
                Ok(identity) => debug!(user = %identity.username, "token identity is not the owner"),
                Err(err) => debug!(error = %err, "token authentication failed"),
            }
        }
        None
    }
}

fn context(identity: Identity, method: CredentialMethod) -> AuthContext {
    AuthContext {
        identity: Some(identity),
        method,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::repository::RepositoryMetadata;
    use crate::repository::RepoLocator;
    use async_trait::async_trait;

    struct Users;

    #[async_trait]
    impl CredentialStore for Users {
        async fn authenticate(&self, username: &str, password: &str) -> Result<Identity, GatewayError> {
            match (username, password) {
                ("alice", "alice-pw") => Ok(Identity { username: "alice".into(), is_admin: false }),
                ("root", "root-pw") => Ok(Identity { username: "root".into(), is_admin: true }),
                ("bob", "bob-pw") => Ok(Identity { username: "bob".into(), is_admin: false }),
                _ => Err(GatewayError::CredentialRejected),
            }
        }

        async fn resolve_token(&self, token: &str) -> Result<Identity, GatewayError> {
            match token {
                "alice-token" => Ok(Identity { username: "alice".into(), is_admin: false }),
                _ => Err(GatewayError::CredentialRejected),
            }
        }
    }

    struct Meta(Option<RepositoryMetadata>);

    #[async_trait]
    impl MetadataStore for Meta {
        async fn load_metadata(&self, _location: &RepositoryLocation) -> Result<RepositoryMetadata, GatewayError> {
            self.0
                .clone()
                .ok_or_else(|| GatewayError::MetadataUnavailable("missing".into()))
        }
    }

    fn setup(meta: Option<RepositoryMetadata>) -> (tempfile::TempDir, RepositoryLocation, AuthGate) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("alice").join("project.git")).unwrap();
        let location = RepoLocator::new(dir.path())
            .unwrap()
            .locate("alice", "project")
            .unwrap();
        let gate = AuthGate::new(Arc::new(Users), Arc::new(Meta(meta)));
        (dir, location, gate)
    }

    fn basic(user: &str, password: &str) -> Credentials {
        Credentials {
            basic: Some((user.to_string(), password.to_string())),
            token: None,
        }
    }

    #[tokio::test]
    async fn test_public_pull_is_anonymous() {
        let (_dir, location, gate) = setup(Some(RepositoryMetadata::new("alice", true)));
        let ctx = gate
            .authorize(&location, Action::Pull, &Credentials::default())
            .await
            .unwrap();
        assert_eq!(ctx, AuthContext::anonymous());
    }

    #[tokio::test]
    async fn test_private_pull_requires_owner() {
        let (_dir, location, gate) = setup(Some(RepositoryMetadata::new("alice", false)));
        assert!(matches!(
            gate.authorize(&location, Action::Pull, &Credentials::default()).await,
            Err(GatewayError::Unauthorized)
        ));
        assert!(matches!(
            gate.authorize(&location, Action::Pull, &basic("bob", "bob-pw")).await,
            Err(GatewayError::Unauthorized)
        ));
        let ctx = gate
            .authorize(&location, Action::Pull, &basic("alice", "alice-pw"))
            .await
            .unwrap();
        assert_eq!(ctx.method, CredentialMethod::Basic);
        assert_eq!(ctx.username(), "alice");
    }

    #[tokio::test]
    async fn test_push_requires_owner_even_when_public() {
        let (_dir, location, gate) = setup(Some(RepositoryMetadata::new("alice", true)));
        assert!(matches!(
            gate.authorize(&location, Action::Push, &Credentials::default()).await,
            Err(GatewayError::Unauthorized)
        ));
        assert!(
            gate.authorize(&location, Action::Push, &basic("alice", "alice-pw"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_admin_gets_no_override() {
        let (_dir, location, gate) = setup(Some(RepositoryMetadata::new("alice", false)));
        for action in [Action::Pull, Action::Push] {
            assert!(matches!(
                gate.authorize(&location, action, &basic("root", "root-pw")).await,
                Err(GatewayError::Unauthorized)
            ));
        }
    }

    #[tokio::test]
    async fn test_wrong_password_falls_through_to_token() {
        let (_dir, location, gate) = setup(Some(RepositoryMetadata::new("alice", false)));
        let presented = Credentials {
            basic: Some(("alice".into(), "wrong".into())),
            token: Some("alice-token".into()),
        };
        let ctx = gate.authorize(&location, Action::Push, &presented).await.unwrap();
        assert_eq!(ctx.method, CredentialMethod::Token);
    }

    #[tokio::test]
    async fn test_owner_token_after_non_owner_basic() {
        let (_dir, location, gate) = setup(Some(RepositoryMetadata::new("alice", false)));
        // basic 认证成功但不是 owner, 继续尝试 token
        let presented = Credentials {
            basic: Some(("bob".into(), "bob-pw".into())),
            token: Some("alice-token".into()),
        };
        let ctx = gate.authorize(&location, Action::Push, &presented).await.unwrap();
        assert_eq!(ctx.method, CredentialMethod::Token);
        assert_eq!(ctx.username(), "alice");

        let presented = Credentials {
            basic: Some(("bob".into(), "bob-pw".into())),
            token: Some("unknown-token".into()),
        };
        assert!(matches!(
            gate.authorize(&location, Action::Push, &presented).await,
            Err(GatewayError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_missing_metadata_fails_closed() {
        let (_dir, location, gate) = setup(None);
        assert!(matches!(
            gate.authorize(&location, Action::Pull, &basic("alice", "alice-pw")).await,
            Err(GatewayError::Unauthorized)
        ));
    }
}
