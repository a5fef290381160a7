use axum::{
    Router,
    routing::{IntoMakeService, get},
};
use tower_http::cors::{Any, CorsLayer};

use crate::DeploymentImpl;

pub mod chat_messages;
pub mod health;
pub mod workspaces;

/// All `/api` routes with state applied.
pub fn app(deployment: DeploymentImpl) -> Router {
    let base_routes = Router::new()
        .route("/health", get(health::health_check))
        .nest("/workspaces", workspaces::router())
        .nest("/chat-messages", chat_messages::router())
        .with_state(deployment);

    Router::new().nest("/api", base_routes).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

pub fn router(deployment: DeploymentImpl) -> IntoMakeService<Router> {
    app(deployment).into_make_service()
}
