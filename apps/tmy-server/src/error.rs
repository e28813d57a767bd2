use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::pvgis::PvgisError;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<PvgisError> for AppError {
    fn from(err: PvgisError) -> Self {
        tracing::error!(error = %err, "TMY upstream fetch failed");
        AppError::bad_gateway(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
