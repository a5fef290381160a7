use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::post,
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::workspace_copy::CopySummary;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct CopyWorkspaceRequest {
    pub destination_workspace_id: Uuid,
}

pub async fn copy_workspace(
    State(deployment): State<DeploymentImpl>,
    Path(source_workspace_id): Path<Uuid>,
    Json(payload): Json<CopyWorkspaceRequest>,
) -> Result<ResponseJson<ApiResponse<CopySummary>>, ApiError> {
    let summary = deployment
        .workspace_copy()
        .copy_workspace(source_workspace_id, payload.destination_workspace_id)
        .await?;

    Ok(ResponseJson(ApiResponse::success(summary)))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new().route("/{source_workspace_id}/copy", post(copy_workspace))
}
