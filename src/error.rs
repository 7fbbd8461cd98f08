use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::bottle::BottleError;
use crate::repo::RepoError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub success: bool,
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")] BadRequest(String),
    #[error("{0}")] Unauthorized(String),
    #[error("{0}")] Forbidden(String),
    #[error("{0}")] NotFound(String),
    #[error("internal error")] Internal,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self { ApiError::BadRequest(msg.into()) }
    pub fn not_found(msg: impl Into<String>) -> Self { ApiError::NotFound(msg.into()) }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::not_found("not found"),
            RepoError::Conflict => ApiError::bad_request("conflict"),
            RepoError::Internal(msg) => {
                tracing::error!(error = %msg, "storage failure");
                ApiError::Internal
            }
        }
    }
}

impl From<BottleError> for ApiError {
    fn from(e: BottleError) -> Self {
        match e {
            BottleError::Storage(inner) => inner.into(),
            validation => ApiError::BadRequest(validation.to_string()),
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        HttpResponse::build(status).json(ApiErrorBody { success: false, error: self.to_string() })
    }
}
