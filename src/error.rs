use actix_web::http::StatusCode;

#[derive(Clone, Debug)]
pub enum GatewayError {
    InvalidSegment(String),
    PathEscape(String),
    MissingService,
    UnknownService(String),
    RepoNotFound(String),
    Unauthorized,
    CredentialRejected,
    MetadataUnavailable(String),
    SpawnFailed(String),
    MissingPipe(&'static str),
    Payload(String),
    Decompression(String),
    ClientGone,
    Io(String),
    Config(String),
}

impl GatewayError {
    /// HTTP status a request failing with this error is answered with.
    ///
    /// Mid-stream variants map to 500 as well, although by the time they occur
    /// the response head has normally been sent already.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidSegment(_)
            | GatewayError::PathEscape(_)
            | GatewayError::MissingService
            | GatewayError::UnknownService(_) => StatusCode::BAD_REQUEST,
            GatewayError::RepoNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Unauthorized
            | GatewayError::CredentialRejected
            | GatewayError::MetadataUnavailable(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Errors meaning the peer went away, which should take the git process down with it.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, GatewayError::ClientGone | GatewayError::Payload(_))
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::InvalidSegment(seg) => write!(f, "Invalid repository path segment: {:?}", seg),
            GatewayError::PathEscape(repo) => write!(f, "Repository path escapes the repository root: {}", repo),
            GatewayError::MissingService => write!(f, "Service parameter is required for smart HTTP protocol"),
            GatewayError::UnknownService(name) => write!(f, "Invalid Git service requested: {}", name),
            GatewayError::RepoNotFound(repo) => write!(f, "Repository not found: {}", repo),
            GatewayError::Unauthorized => write!(f, "Unauthorized"),
            GatewayError::CredentialRejected => write!(f, "Credentials rejected"),
            GatewayError::MetadataUnavailable(msg) => write!(f, "Repository metadata unavailable: {}", msg),
            GatewayError::SpawnFailed(msg) => write!(f, "Failed to start git process: {}", msg),
            GatewayError::MissingPipe(pipe) => write!(f, "Failed to capture git {} pipe", pipe),
            GatewayError::Payload(msg) => write!(f, "Request payload error: {}", msg),
            GatewayError::Decompression(msg) => write!(f, "Failed to inflate gzip request body: {}", msg),
            GatewayError::ClientGone => write!(f, "Client disconnected"),
            GatewayError::Io(msg) => write!(f, "IO error: {}", msg),
            GatewayError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::MetadataUnavailable(err.to_string())
    }
}
