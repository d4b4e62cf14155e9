pub mod auth;
pub mod social;

use axum::Router;
use std::sync::Arc;

use crate::AppState;

/// Build all routes for the API
pub fn build_routes() -> Router<Arc<AppState>> {
    Router::new().merge(auth::routes()).merge(social::routes())
}
