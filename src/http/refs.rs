use crate::callback::{CallBack, body_stream};
use crate::error::GatewayError;
use crate::http::{GitRoute, error_response, open};
use crate::serve::AppCore;
use crate::transaction::TransactionService;
use actix_web::http::header::CACHE_CONTROL;
use actix_web::web::{Data, Path, Query};
use actix_web::{HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, Span, info_span};
use uuid::Uuid;

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct RefsQuery {
    service: Option<String>,
}

/// `GET|HEAD /{owner}/{repo}/info/refs?service=...`
///
/// A failed authorization answers 401 with the challenge header and no body,
/// which is what git clients expect from this endpoint.
pub async fn info_refs(
    req: HttpRequest,
    path: Path<(String, String)>,
    query: Query<RefsQuery>,
    app: Data<AppCore>,
) -> HttpResponse {
    let (owner, repo) = path.into_inner();
    let service = query.into_inner().service;
    let span = info_span!("info_refs", id = %Uuid::new_v4(), service = ?service, %owner, %repo);
    async move {
        match advertise(&req, &app, &owner, &repo, service.as_deref()).await {
            Ok(response) => response,
            Err(err) => error_response(&err, &app.realm, false),
        }
    }
    .instrument(span)
    .await
}

async fn advertise(
    req: &HttpRequest,
    app: &AppCore,
    owner: &str,
    repo: &str,
    service: Option<&str>,
) -> Result<HttpResponse, GatewayError> {
    let location = app.locator.locate(owner, repo)?;
    let service = match service {
        None | Some("") => return Err(GatewayError::MissingService),
        Some(name) => TransactionService::from_string(name)
            .ok_or_else(|| GatewayError::UnknownService(name.to_string()))?,
    };
    let route = GitRoute::AdvertiseRefs(service);
    let transaction = open(app, req, location, route).await?;
    let process = transaction.spawn(route.is_advertisement())?;
    let (call_back, receiver) = CallBack::new(16);
    tokio::task::spawn_local(
        transaction
            .advertise_refs(process, call_back)
            .instrument(Span::current()),
    );
    Ok(HttpResponse::Ok()
        .insert_header(("Pragma", "no-cache"))
        .insert_header((CACHE_CONTROL, "no-cache"))
        .insert_header(("Expires", "Fri, 01 Jan 1980 00:00:00 GMT"))
        .content_type(route.content_type())
        .streaming(body_stream(receiver)))
}
