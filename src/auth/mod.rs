use crate::error::GatewayError;
use actix_web::HttpRequest;
use actix_web::http::header::Header;
use actix_web::web::Query;
use actix_web_httpauth::headers::authorization::{Authorization, Basic, Bearer};
use serde::Deserialize;

#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Identity, GatewayError>;
    /// Resolves a login token or API key.
    async fn resolve_token(&self, token: &str) -> Result<Identity, GatewayError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub is_admin: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialMethod {
    Anonymous,
    Basic,
    Token,
}

/// Who a request was admitted as. Built per request and dropped with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthContext {
    pub identity: Option<Identity>,
    pub method: CredentialMethod,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self {
            identity: None,
            method: CredentialMethod::Anonymous,
        }
    }

    pub fn username(&self) -> &str {
        self.identity
            .as_ref()
            .map(|identity| identity.username.as_str())
            .unwrap_or("-")
    }
}

/// Credentials presented by a request, in the order they are tried.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    pub basic: Option<(String, String)>,
    pub token: Option<String>,
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

impl Credentials {
    /// Collects Basic credentials and a token from the request.
    ///
    /// The token comes from `Authorization: Bearer`, else the `token` query
    /// parameter, else the `X-Auth-Token` header.
    pub fn from_request(req: &HttpRequest) -> Self {
        let basic = Authorization::<Basic>::parse(req).ok().map(|auth| {
            let scheme = auth.into_scheme();
            (
                scheme.user_id().to_string(),
                scheme.password().unwrap_or("").to_string(),
            )
        });
        let bearer = Authorization::<Bearer>::parse(req)
            .ok()
            .map(|auth| auth.into_scheme().token().to_string());
        let query = Query::<TokenQuery>::from_query(req.query_string())
            .ok()
            .and_then(|query| query.into_inner().token);
        let header = req
            .headers()
            .get(AUTH_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let token = bearer
            .or(query)
            .or(header)
            .filter(|token| !token.is_empty());
        Self { basic, token }
    }

    pub fn is_empty(&self) -> bool {
        self.basic.is_none() && self.token.is_none()
    }
}

pub mod gate;
