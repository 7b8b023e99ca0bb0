use crate::auth::Credentials;
use crate::callback::{CallBack, body_stream};
use crate::config::http::HttpConfig;
use crate::error::GatewayError;
use crate::serve::AppCore;
use crate::transaction::{BodyEncoding, Transaction, TransactionService};
use actix_web::http::StatusCode;
use actix_web::http::header::{CONTENT_ENCODING, WWW_AUTHENTICATE};
use actix_web::web::{Data, Path, Payload, ServiceConfig, get, head, post, scope};
use actix_web::{App, HttpRequest, HttpResponse};
use tracing::{Instrument, Span, debug, error, info, info_span};
use uuid::Uuid;

pub const GIT_PROTOCOL_HEADER: &str = "Git-Protocol";

#[derive(Clone)]
pub struct HttpServer {
    pub addr: String,
    pub port: u16,
    pub workers: Option<usize>,
    pub core: AppCore,
}

impl HttpServer {
    pub fn new(config: &HttpConfig, core: AppCore) -> Self {
        Self {
            addr: config.host.clone(),
            port: config.port,
            workers: config.workers,
            core,
        }
    }
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
    pub async fn run(&self) -> std::io::Result<()> {
        let core = self.core.clone();
        let mut server = actix_web::HttpServer::new(move || {
            App::new()
                .app_data(Data::new(core.clone()))
                .wrap(actix_web::middleware::Logger::new(
                    "%a %r %s %b bytes in %D microseconds %{git-protocol}i",
                ))
                .configure(configure)
        });
        if let Some(workers) = self.workers {
            server = server.workers(workers);
        }
        info!(addr = %self.bind_addr(), "git smart HTTP gateway listening");
        server.bind(self.bind_addr())?.run().await
    }
}

/// Registers the smart HTTP endpoints. The repo segment may carry a `.git` suffix.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/{owner}/{repo}")
            .route("/info/refs", get().to(refs::info_refs))
            .route("/info/refs", head().to(refs::info_refs))
            .route("/git-upload-pack", post().to(upload::upload_pack))
            .route("/git-receive-pack", post().to(receive::receive_pack)),
    );
}

/// The endpoint a request was routed to, fixed once per request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GitRoute {
    AdvertiseRefs(TransactionService),
    UploadPack,
    ReceivePack,
}

impl GitRoute {
    pub fn service(&self) -> TransactionService {
        match self {
            GitRoute::AdvertiseRefs(service) => *service,
            GitRoute::UploadPack => TransactionService::UploadPack,
            GitRoute::ReceivePack => TransactionService::ReceivePack,
        }
    }

    pub fn is_advertisement(&self) -> bool {
        matches!(self, GitRoute::AdvertiseRefs(_))
    }

    pub fn content_type(&self) -> String {
        match self {
            GitRoute::AdvertiseRefs(service) => service.advertisement_content_type(),
            _ => self.service().result_content_type(),
        }
    }
}

/// Runs the authorization gate for `route` and builds the transaction on success.
pub(crate) async fn open(
    app: &AppCore,
    req: &HttpRequest,
    location: crate::repository::RepositoryLocation,
    route: GitRoute,
) -> Result<Transaction, GatewayError> {
    let service = route.service();
    let credentials = Credentials::from_request(req);
    let ctx = app
        .gate
        .authorize(&location, service.action(), &credentials)
        .await?;
    info!(user = ctx.username(), method = ?ctx.method, action = ?service.action(), "access granted");
    Ok(Transaction {
        service,
        location,
        git: app.git.clone(),
        protocol: req
            .headers()
            .get(GIT_PROTOCOL_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string()),
    })
}

/// Shared body of the `git-upload-pack` and `git-receive-pack` handlers.
pub(crate) async fn service_rpc(
    route: GitRoute,
    req: HttpRequest,
    payload: Payload,
    path: Path<(String, String)>,
    app: Data<AppCore>,
) -> HttpResponse {
    let (owner, repo) = path.into_inner();
    let span = info_span!("git", id = %Uuid::new_v4(), service = %route.service(), %owner, %repo);
    async move {
        match start_rpc(route, &req, payload, &app, &owner, &repo).await {
            Ok(response) => response,
            Err(err) => error_response(&err, &app.realm, true),
        }
    }
    .instrument(span)
    .await
}

async fn start_rpc(
    route: GitRoute,
    req: &HttpRequest,
    payload: Payload,
    app: &AppCore,
    owner: &str,
    repo: &str,
) -> Result<HttpResponse, GatewayError> {
    let location = app.locator.locate(owner, repo)?;
    let transaction = open(app, req, location, route).await?;
    let encoding = BodyEncoding::from_header(
        req.headers()
            .get(CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok()),
    );
    let process = transaction.spawn(route.is_advertisement())?;
    let (call_back, receiver) = CallBack::new(16);
    tokio::task::spawn_local(
        transaction
            .service_rpc(process, payload, encoding, call_back)
            .instrument(Span::current()),
    );
    Ok(HttpResponse::Ok()
        .content_type(route.content_type())
        .streaming(body_stream(receiver)))
}

/// Renders an error raised before any git output was produced.
///
/// A 401 always carries the Basic challenge; `challenge_body` controls whether
/// it also carries a short text body.
pub(crate) fn error_response(err: &GatewayError, realm: &str, challenge_body: bool) -> HttpResponse {
    let status = err.status();
    if status == StatusCode::UNAUTHORIZED {
        let mut builder = HttpResponse::Unauthorized();
        builder.insert_header((WWW_AUTHENTICATE, format!(r#"Basic realm="{}""#, realm)));
        return if challenge_body {
            builder.body("Unauthorized")
        } else {
            builder.finish()
        };
    }
    let body = if status.is_server_error() {
        error!(error = %err, "request failed");
        "Internal server error".to_string()
    } else {
        debug!(error = %err, %status, "request rejected");
        err.to_string()
    };
    HttpResponse::build(status)
        .content_type("text/plain; charset=utf-8")
        .body(body)
}

pub mod receive;
pub mod refs;
pub mod upload;
