use actix_web::{http::StatusCode, HttpResponse};

pub fn json_error(status: StatusCode, error: &str, code: &str) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({
        "error": error,
        "code": code
    }))
}

/// Fallback for unmatched routes.
pub async fn not_found() -> HttpResponse {
    json_error(StatusCode::NOT_FOUND, "Recurso não encontrado", "not_found")
}
