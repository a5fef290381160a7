use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{abort_coordinator::AbortError, workspace_copy::WorkspaceCopyError};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error, ts_rs::TS)]
#[ts(type = "string")]
pub enum ApiError {
    #[error(transparent)]
    WorkspaceCopy(#[from] WorkspaceCopyError),
    #[error(transparent)]
    Abort(#[from] AbortError),
}

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::WorkspaceCopy(err) => match err {
                WorkspaceCopyError::SameWorkspace(_) => {
                    (StatusCode::BAD_REQUEST, "WorkspaceCopyError")
                }
                WorkspaceCopyError::WorkspaceNotFound(_) => {
                    (StatusCode::NOT_FOUND, "WorkspaceCopyError")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "WorkspaceCopyError"),
            },
            ApiError::Abort(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AbortError"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = self.status();

        let error_message = match &self {
            ApiError::WorkspaceCopy(
                WorkspaceCopyError::SameWorkspace(_) | WorkspaceCopyError::WorkspaceNotFound(_),
            ) => self.to_string(),
            _ => format!("{}: {}", error_type, self),
        };

        if status_code.is_server_error() {
            tracing::error!("{}", error_message);
        }

        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}
