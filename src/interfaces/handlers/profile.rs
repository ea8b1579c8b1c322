use actix_web::{web, HttpResponse, Responder};
use tracing::instrument;

use crate::{
    entities::{image::UploadImageRequest, profile::UpdateProfileRequest},
    errors::AppError,
    use_cases::extractors::AuthSession,
    AppState,
};

#[instrument(skip(session, state), fields(user_id = %session.0.user_id))]
pub async fn get_profile(
    session: AuthSession,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let profile = state.profile_handler.get_profile(&session.0).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[instrument(skip(session, state, data), fields(user_id = %session.0.user_id))]
pub async fn update_profile(
    session: AuthSession,
    state: web::Data<AppState>,
    data: web::Json<UpdateProfileRequest>,
) -> Result<impl Responder, AppError> {
    let profile = state.profile_handler.update_profile(&session.0, data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[instrument(skip(session, state, data), fields(user_id = %session.0.user_id))]
pub async fn upload_avatar(
    session: AuthSession,
    state: web::Data<AppState>,
    data: web::Json<UploadImageRequest>,
) -> Result<impl Responder, AppError> {
    let cancel = state.request_token();
    let avatar = state
        .profile_handler
        .upload_avatar(&session.0, data.into_inner(), &cancel)
        .await?;

    Ok(HttpResponse::Ok().json(avatar))
}

#[instrument(skip(session, state), fields(user_id = %session.0.user_id))]
pub async fn remove_avatar(
    session: AuthSession,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let avatar = state.profile_handler.remove_avatar(&session.0).await?;
    Ok(HttpResponse::Ok().json(avatar))
}
