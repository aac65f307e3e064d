pub mod agents;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /agents                                          list, create
/// /agents/{name}/run                               run an agent (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/agents", agents::router())
}
