use actix_web::{web, HttpResponse, Responder};
use tracing::instrument;
use validator::Validate;

use crate::{
    entities::image::{UploadImageRequest, UploadPurpose},
    errors::AppError,
    media::classify,
    use_cases::extractors::AuthSession,
    AppState,
};

fn parse_purpose(raw: &str) -> Result<UploadPurpose, AppError> {
    match raw {
        "avatar" => Ok(UploadPurpose::Avatar),
        "gesture" => Ok(UploadPurpose::Gesture),
        other => Err(AppError::InvalidInput(format!(
            "Destino de envio \"{other}\" inválido. Use avatar ou gesture."
        ))),
    }
}

/// Classifies, materializes and hosts one image. Answers with the upload result
/// itself; a failed upload is a 502 carrying `{success: false, error}`.
#[instrument(skip(session, state, data), fields(user_id = %session.0.user_id))]
pub async fn upload_image(
    session: AuthSession,
    state: web::Data<AppState>,
    purpose: web::Path<String>,
    data: web::Json<UploadImageRequest>,
) -> Result<impl Responder, AppError> {
    let purpose = parse_purpose(&purpose)?;
    let request = data.into_inner();
    request.validate()?;

    let handle = classify(&request.image)?;
    let cancel = state.request_token();
    let result = state
        .gesture_handler
        .pipeline
        .ingest(&session.0.user_id, &handle, purpose, &cancel)
        .await?;

    if result.is_success() {
        Ok(HttpResponse::Created().json(result))
    } else {
        Ok(HttpResponse::BadGateway().json(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purpose_must_be_known() {
        assert_eq!(parse_purpose("avatar").unwrap(), UploadPurpose::Avatar);
        assert_eq!(parse_purpose("gesture").unwrap(), UploadPurpose::Gesture);
        assert!(matches!(parse_purpose("banner"), Err(AppError::InvalidInput(_))));
    }
}
