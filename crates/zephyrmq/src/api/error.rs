use axum::{
    response::{IntoResponse, Response},
    Json,
};

use crate::service::{ErrorModel, ZephyrError};

/// Wraps [`ZephyrError`] so it can be returned directly from an axum
/// handler. Kept separate from the storage-contract error type itself so
/// `service::error` never has to depend on axum.
pub struct ApiError(pub ZephyrError);

impl From<ZephyrError> for ApiError {
    fn from(err: ZephyrError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }
        let model = ErrorModel::from(&self.0);
        (status, Json(model)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
