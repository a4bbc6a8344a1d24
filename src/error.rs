use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ports::{GatewayError, RepositoryError};
use crate::services::ServiceError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => AppError::Validation(e.to_string()),
            ServiceError::InvalidTransition(e) => AppError::Conflict(e.to_string()),
            ServiceError::OrderNotFound(reference) => {
                AppError::NotFound(format!("Order {} not found", reference))
            }
            ServiceError::Persistence(RepositoryError::NotFound(reference)) => {
                AppError::NotFound(format!("Order {} not found", reference))
            }
            ServiceError::Persistence(RepositoryError::Conflict(message)) => {
                AppError::Conflict(message)
            }
            ServiceError::Persistence(e) => AppError::DatabaseError(e.to_string()),
            ServiceError::Gateway(GatewayError::InvalidSessionId(id)) => {
                AppError::BadRequest(format!("Invalid session ID {:?}", id))
            }
            ServiceError::Gateway(e) => AppError::Gateway(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
