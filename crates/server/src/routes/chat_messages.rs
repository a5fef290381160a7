use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::put,
};
use deployment::Deployment;
use services::services::execution_registry::ExecutionKey;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

/// Stop the prediction answering `chat_id` on `chatflow_id`, wherever it runs. Succeeds even
/// when nothing is running.
pub async fn abort_chat_message(
    State(deployment): State<DeploymentImpl>,
    Path((chatflow_id, chat_id)): Path<(Uuid, String)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let key = ExecutionKey::new(chatflow_id, chat_id);
    deployment
        .abort_coordinator()
        .abort(&key.execution_id())
        .await?;

    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new().route("/abort/{chatflow_id}/{chat_id}", put(abort_chat_message))
}
