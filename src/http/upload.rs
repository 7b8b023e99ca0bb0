use crate::http::{GitRoute, service_rpc};
use crate::serve::AppCore;
use actix_web::web::{Data, Path, Payload};
use actix_web::{HttpRequest, HttpResponse};

/// `POST /{owner}/{repo}/git-upload-pack`: fetch and clone negotiation.
///
/// The pkt-line request body, inflated when sent with `Content-Encoding: gzip`,
/// is handed to `git upload-pack --stateless-rpc` and its output streamed back
/// as `application/x-git-upload-pack-result`. Public repositories need no
/// credentials; private ones need the owner's.
pub async fn upload_pack(
    req: HttpRequest,
    payload: Payload,
    path: Path<(String, String)>,
    app: Data<AppCore>,
) -> HttpResponse {
    service_rpc(GitRoute::UploadPack, req, payload, path, app).await
}
