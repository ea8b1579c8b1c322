use actix_web::{
    web,
    http::StatusCode,
    ResponseError,
    HttpResponse,
    error::{JsonPayloadError, PayloadError},
};
use serde_json::json;

/// Inline images travel base64-encoded, which inflates them by a third.
const JSON_OVERHEAD_BYTES: usize = 64 * 1024;

/// JSON and raw body limits sized for `max_image_bytes`, with JSON errors in the API's shape.
pub fn body_limits(max_image_bytes: usize) -> impl Fn(&mut web::ServiceConfig) + Clone {
    move |cfg: &mut web::ServiceConfig| {
        let json_limit = max_image_bytes / 3 * 4 + JSON_OVERHEAD_BYTES;
        cfg.app_data(
            web::JsonConfig::default()
                .limit(json_limit)
                .error_handler(|err, _req| JsonError::from(err).into()),
        );
        cfg.app_data(web::PayloadConfig::new(max_image_bytes));
    }
}

#[derive(Debug)]
pub struct JsonError {
    message: String,
    details: String,
    status: StatusCode,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.message, self.details)
    }
}

impl ResponseError for JsonError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status).json(json!({
            "error": self.message,
            "code": "invalid_json",
            "details": self.details
        }))
    }
}

impl From<JsonPayloadError> for JsonError {
    fn from(err: JsonPayloadError) -> Self {
        let status = match &err {
            JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            JsonPayloadError::Payload(PayloadError::Overflow) => StatusCode::PAYLOAD_TOO_LARGE,
            JsonPayloadError::ContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        };
        let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "A requisição é grande demais."
        } else {
            "Corpo da requisição inválido."
        };

        JsonError {
            message: message.to_string(),
            details: err.to_string(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_maps_to_payload_too_large() {
        let err = JsonError::from(JsonPayloadError::OverflowKnownLength { length: 10, limit: 5 });
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

        let err = JsonError::from(JsonPayloadError::ContentType);
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
