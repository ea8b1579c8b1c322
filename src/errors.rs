use std::borrow::Cow;
use std::fmt;

use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse
};
use jsonwebtoken::errors::{ErrorKind, Error as JwtError};
use derive_more::Display;
use serde::Serialize;
use validator::ValidationErrors;

#[derive(Debug)]
pub enum AppError {
    ValidationError(Vec<FieldError>),
    InvalidInput(String),
    NotFound(String),
    Conflict(String),
    Auth(AuthError),
    Image(ImageError),
    UploadFailed(String),
    Cancelled,
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ValidationError(errors) => {
                let messages = errors.iter()
                    .map(|e| format!("{}:{}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "validation error: {}", messages)
            }
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Auth(e) => write!(f, "Authentication error: {}", e),
            AppError::Image(e) => write!(f, "Image error: {}", e),
            AppError::UploadFailed(msg) => write!(f, "Upload failed: {}", msg),
            AppError::Cancelled => write!(f, "Operation cancelled"),
            AppError::InternalError(msg) => write!(f, "Internal server error: {}", msg)
        }
    }
}

impl AppError {
    /// Message safe to show to the end user. Backend detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::ValidationError(_) => "Verifique os campos informados.".to_string(),
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::Auth(e) => e.public_message().to_string(),
            AppError::Image(e) => e.public_message().to_string(),
            AppError::UploadFailed(_) => "Não foi possível enviar a imagem. Tente novamente.".to_string(),
            AppError::Cancelled => "Operação cancelada.".to_string(),
            AppError::InternalError(_) => "Erro interno. Tente novamente mais tarde.".to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Auth(e) => e.code(),
            AppError::Image(ImageError::UnsupportedScheme(_)) => "unsupported_image_source",
            AppError::Image(_) => "image_unreadable",
            AppError::UploadFailed(_) => "upload_failed",
            AppError::Cancelled => "cancelled",
            AppError::InternalError(_) => "internal_error",
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        if matches!(self, AppError::InternalError(_) | AppError::UploadFailed(_)) {
            tracing::error!(error = %self, "Request failed");
        }

        let body = match self {
            AppError::ValidationError(errors) => {
                serde_json::json!({
                    "error": self.public_message(),
                    "code": self.code(),
                    "details": errors
                })
            }
            _ => {
                serde_json::json!({
                    "error": self.public_message(),
                    "code": self.code()
                })
            }
        };
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Auth(e) => e.status_code(),
            AppError::Image(ImageError::UnsupportedScheme(_)) => StatusCode::BAD_REQUEST,
            AppError::Image(ImageError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Image(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UploadFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut field_errors: Vec<FieldError> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(|e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "Valor inválido".to_string()),
                })
            })
            .collect();

        field_errors.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::ValidationError(field_errors)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Registro não encontrado".into()),
            sqlx::Error::Database(e) if e.code() == Some(Cow::Borrowed("23505")) => {
                AppError::Conflict("Registro já existe".into())
            }
            sqlx::Error::Database(e) if e.code() == Some(Cow::Borrowed("23503")) => {
                AppError::Conflict("Registro possui dependências".into())
            }
            _ => AppError::InternalError(format!("Database error: {}", err))
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Cancelled => AppError::Cancelled,
            other => AppError::Image(other),
        }
    }
}

#[derive(Debug, Display, Clone, PartialEq)]
pub enum AuthError {
    #[display("Invalid token")]
    InvalidToken,

    #[display("Session expired")]
    SessionExpired,

    #[display("Missing credentials")]
    MissingCredentials,

    #[display("Invalid user ID")]
    InvalidUserId,
}

impl AuthError {
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::SessionExpired => "Sua sessão expirou. Faça login novamente.",
            _ => "Você precisa estar logado para continuar.",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::SessionExpired => "session_expired",
            _ => "unauthenticated",
        }
    }
}

impl ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({
                "error": self.public_message(),
                "code": self.code()
            }))
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::SessionExpired => StatusCode::UNAUTHORIZED,
            AuthError::MissingCredentials => StatusCode::UNAUTHORIZED,
            AuthError::InvalidUserId => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::SessionExpired,
            _ => AuthError::InvalidToken,
        }
    }
}

/// Failures while turning an image handle into bytes.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum ImageError {
    #[display("Unsupported image source: {_0}")]
    UnsupportedScheme(String),

    #[display("Malformed inline data: {_0}")]
    MalformedInlineData(String),

    #[display("Ephemeral handle not found or already released")]
    BlobNotFound,

    #[display("Path outside media root: {_0}")]
    ForbiddenPath(String),

    #[display("Remote host not allowed: {_0}")]
    ForbiddenHost(String),

    #[display("Read failed: {_0}")]
    ReadFailed(String),

    #[display("Image payload is empty")]
    EmptyPayload,

    #[display("Image is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[display("Cancelled")]
    Cancelled,
}

impl ImageError {
    pub fn public_message(&self) -> &'static str {
        match self {
            ImageError::UnsupportedScheme(_) => "Formato de imagem não suportado.",
            ImageError::TooLarge { .. } => "A imagem é muito grande.",
            ImageError::Cancelled => "Operação cancelada.",
            _ => "Não foi possível ler a imagem selecionada.",
        }
    }
}

/// Failures reported by the object store.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum StorageError {
    #[display("Storage rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[display("Storage unreachable: {_0}")]
    Transport(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Transport(err.to_string())
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}
