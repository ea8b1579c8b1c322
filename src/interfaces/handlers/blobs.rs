use actix_web::{http::header::CONTENT_TYPE, web, HttpRequest, HttpResponse, Responder};
use tracing::instrument;

use crate::{
    entities::image::StagedBlobResponse,
    errors::{AppError, ImageError},
    media::materializer::content_type_for,
    use_cases::extractors::AuthSession,
    AppState,
};

/// Stages the raw request body and returns a `blob:` handle for later use as an image source.
#[instrument(skip(session, state, req, body), fields(user_id = %session.0.user_id, size = body.len()))]
pub async fn stage_blob(
    session: AuthSession,
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<impl Responder, AppError> {
    if body.is_empty() {
        return Err(ImageError::EmptyPayload.into());
    }
    if body.len() > state.max_image_bytes {
        return Err(ImageError::TooLarge { size: body.len(), limit: state.max_image_bytes }.into());
    }

    let reported = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let content_type = content_type_for(reported.as_deref(), &body);
    let size = body.len();

    let handle = state.blobs.stage(session.0.user_id, body.to_vec(), Some(content_type.clone()));
    tracing::info!(%handle, "Blob staged");

    Ok(HttpResponse::Created().json(StagedBlobResponse {
        handle,
        content_type,
        size,
    }))
}
