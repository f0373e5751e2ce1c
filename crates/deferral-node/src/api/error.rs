//! Mapping of ledger errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use deferral_core::DeferralError;
use serde::{Deserialize, Serialize};

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub error: DeferralError,
}

/// A [`DeferralError`] on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub DeferralError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DeferralError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            DeferralError::NotFound { .. } => StatusCode::NOT_FOUND,
            DeferralError::AlreadyExecuted { .. } => StatusCode::CONFLICT,
            DeferralError::DeadlineExpired { .. }
            | DeferralError::CostExceeded { .. }
            | DeferralError::InvalidDeadline { .. }
            | DeferralError::InvalidTarget
            | DeferralError::InvalidAuthority => StatusCode::UNPROCESSABLE_ENTITY,
            DeferralError::Malformed { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DeferralError> for ApiError {
    fn from(err: DeferralError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            message: self.0.to_string(),
            error: self.0,
        };
        (status, Json(body)).into_response()
    }
}
