use actix_web::{web, HttpResponse, Responder};
use tracing::instrument;

use crate::{
    entities::gesture::{GestureSearchQuery, NewGestureRequest, UpdateGestureRequest},
    errors::AppError,
    use_cases::extractors::AuthSession,
    AppState,
};

#[instrument(skip(session, state, data), fields(user_id = %session.0.user_id))]
pub async fn create_gesture(
    session: AuthSession,
    state: web::Data<AppState>,
    data: web::Json<NewGestureRequest>,
) -> Result<impl Responder, AppError> {
    let cancel = state.request_token();
    let saved = state
        .gesture_handler
        .save_gesture(&session.0, data.into_inner(), &cancel)
        .await?;

    Ok(HttpResponse::Created().json(saved))
}

#[instrument(skip(session, state), fields(user_id = %session.0.user_id))]
pub async fn list_gestures(
    session: AuthSession,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let gestures = state.gesture_handler.list_gestures(&session.0).await?;
    Ok(HttpResponse::Ok().json(gestures))
}

#[instrument(skip(session, state, query), fields(user_id = %session.0.user_id))]
pub async fn search_gestures(
    session: AuthSession,
    state: web::Data<AppState>,
    query: web::Query<GestureSearchQuery>,
) -> Result<impl Responder, AppError> {
    let gestures = state.gesture_handler.search(&session.0, &query.nome).await?;
    Ok(HttpResponse::Ok().json(gestures))
}

#[instrument(skip(session, state), fields(user_id = %session.0.user_id))]
pub async fn count_by_category(
    session: AuthSession,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let counts = state.gesture_handler.count_by_category(&session.0).await?;
    Ok(HttpResponse::Ok().json(counts))
}

#[instrument(skip(session, state), fields(user_id = %session.0.user_id))]
pub async fn list_by_category(
    session: AuthSession,
    state: web::Data<AppState>,
    category: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let gestures = state.gesture_handler.list_by_category(&session.0, &category).await?;
    Ok(HttpResponse::Ok().json(gestures))
}

#[instrument(skip(session, state), fields(user_id = %session.0.user_id))]
pub async fn get_gesture(
    session: AuthSession,
    state: web::Data<AppState>,
    gesture_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let gesture = state.gesture_handler.get_gesture(&session.0, gesture_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(gesture))
}

#[instrument(skip(session, state, data), fields(user_id = %session.0.user_id))]
pub async fn update_gesture(
    session: AuthSession,
    state: web::Data<AppState>,
    gesture_id: web::Path<i64>,
    data: web::Json<UpdateGestureRequest>,
) -> Result<impl Responder, AppError> {
    let cancel = state.request_token();
    let saved = state
        .gesture_handler
        .update_gesture(&session.0, gesture_id.into_inner(), data.into_inner(), &cancel)
        .await?;

    Ok(HttpResponse::Ok().json(saved))
}

#[instrument(skip(session, state), fields(user_id = %session.0.user_id))]
pub async fn delete_gesture(
    session: AuthSession,
    state: web::Data<AppState>,
    gesture_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    state.gesture_handler.delete_gesture(&session.0, gesture_id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
