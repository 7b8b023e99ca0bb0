use crate::http::{GitRoute, service_rpc};
use crate::serve::AppCore;
use actix_web::web::{Data, Path, Payload};
use actix_web::{HttpRequest, HttpResponse};

/// `POST /{owner}/{repo}/git-receive-pack`: always requires the owner's credentials.
pub async fn receive_pack(
    req: HttpRequest,
    payload: Payload,
    path: Path<(String, String)>,
    app: Data<AppCore>,
) -> HttpResponse {
    service_rpc(GitRoute::ReceivePack, req, payload, path, app).await
}
