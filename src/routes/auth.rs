//! Request identity: extractor + identity echo endpoint
//!
//! Sessions are minted by the external identity provider with the shared
//! `JWT_SECRET`; this module only validates them and hands every handler an
//! explicit `AuthUser` value.

use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::request::Parts,
    routing::get,
};
use axum_extra::extract::CookieJar;
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;
use crate::domain::users::{self, UserRole};
use crate::services::error::{ApiError, LogErr};
use crate::services::session;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/me", get(get_me))
}

// ============================================================================
// Auth Extractor - validates the session token and extracts the user id
// ============================================================================

/// Extractor carrying the authenticated user's identity. Accepts a bearer
/// token (API clients) or the `access_token` cookie (browser sessions).
pub struct AuthUser(pub String);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
        {
            let user_id = session::validate_access_token(token, &state.jwt_secret)
                .map_err(|_| ApiError::Unauthorized)?;
            return Ok(AuthUser(user_id));
        }

        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Unauthorized)?;

        let token = jar
            .get("access_token")
            .map(|c| c.value())
            .ok_or(ApiError::Unauthorized)?;

        let user_id = session::validate_access_token(token, &state.jwt_secret)
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(AuthUser(user_id))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    user_id: String,
    role: UserRole,
}

/// GET /auth/me - Identity and resolved role of the current session
async fn get_me(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MeResponse>, ApiError> {
    let role = users::get_user_role(&state.db, &user_id, &state.bootstrap_admins)
        .await
        .log_500("Get user role error")?;

    Ok(Json(MeResponse { user_id, role }))
}
