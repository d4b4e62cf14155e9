//! Account registry endpoints (/social/accounts*)

use axum::{Json, Router, extract::State, routing::get, routing::post};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use uuid::Uuid;

use super::dto::ConnectionResponse;
use crate::AppState;
use crate::constants::DEFAULT_CONNECT_PLATFORMS;
use crate::domain::social::{Ownership, connections};
use crate::domain::users::{self, ConnectPermissions, UserRole};
use crate::routes::auth::AuthUser;
use crate::services::error::{ApiError, LogErr};
use crate::services::upload_post::ConnectUrlRequest;

pub fn routes() -> Router<Arc<AppState>> {
    // The connect hand-off provisions upstream profiles; keep it from being hammered
    let rate_limit_config = GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(5)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .expect("Failed to build rate limit config");

    let connect = Router::new()
        .route("/social/accounts/connect-start", post(connect_start))
        .layer(GovernorLayer {
            config: rate_limit_config.into(),
        });

    Router::new()
        .route("/social/accounts", get(list_accounts))
        .route("/social/accounts/disconnect", post(disconnect_account))
        .merge(connect)
}

// ============================================================================
// Listing
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountsResponse {
    accounts: Vec<ConnectionResponse>,
    permissions: ConnectPermissions,
    user_role: UserRole,
}

/// GET /social/accounts - Accounts the requester can publish through:
/// their own personal connections plus every org connection, org first
async fn list_accounts(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<AccountsResponse>, ApiError> {
    let role = users::get_user_role(&state.db, &user_id, &state.bootstrap_admins)
        .await
        .log_500("Get user role error")?;

    let accounts = connections::list_accessible(&state.db, &user_id)
        .await
        .log_500("List connections error")?;

    Ok(Json(AccountsResponse {
        accounts: accounts.into_iter().map(Into::into).collect(),
        permissions: users::resolve_permissions(role),
        user_role: role,
    }))
}

// ============================================================================
// Disconnect
// ============================================================================

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct DisconnectRequest {
    connection_id: Option<Uuid>,
}

#[derive(Serialize)]
struct DisconnectResponse {
    success: bool,
}

/// POST /social/accounts/disconnect - Soft-delete a connection.
/// Personal accounts: the owner. Org accounts: super admins only.
async fn disconnect_account(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<DisconnectRequest>,
) -> Result<Json<DisconnectResponse>, ApiError> {
    let connection_id = body
        .connection_id
        .ok_or_else(|| ApiError::Validation("Connection ID is required".to_string()))?;

    let connection = connections::get_connection(&state.db, connection_id)
        .await
        .log_500("Get connection error")?
        .ok_or_else(|| ApiError::NotFound("Connection not found".to_string()))?;

    let role = users::get_user_role(&state.db, &user_id, &state.bootstrap_admins)
        .await
        .log_500("Get user role error")?;

    let can_disconnect = match connection.ownership {
        Ownership::Org => role == UserRole::SuperAdmin,
        Ownership::Personal => connection.user_id == user_id,
    };

    if !can_disconnect {
        return Err(ApiError::Forbidden(
            "You do not have permission to disconnect this account".to_string(),
        ));
    }

    connections::deactivate(&state.db, connection_id)
        .await
        .log_500("Deactivate connection error")?;

    Ok(Json(DisconnectResponse { success: true }))
}

// ============================================================================
// Connect hand-off
// ============================================================================

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ConnectStartRequest {
    ownership: Option<Ownership>,
    platforms: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectStartResponse {
    success: bool,
    connect_url: String,
    expires_in: String,
    external_username: String,
}

/// POST /social/accounts/connect-start - Begin the OAuth hand-off: make
/// sure the aggregation-side profile exists, get its hosted connect URL,
/// and leave a pending placeholder for the next sync to resolve
async fn connect_start(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<ConnectStartRequest>,
) -> Result<Json<ConnectStartResponse>, ApiError> {
    let client = state.upload_post.as_ref().ok_or_else(|| {
        ApiError::Configuration(
            "Upload-Post API key not configured. Add UPLOAD_POST_API_KEY to your environment."
                .to_string(),
        )
    })?;

    let ownership = body.ownership.unwrap_or(Ownership::Personal);

    let role = users::get_user_role(&state.db, &user_id, &state.bootstrap_admins)
        .await
        .log_500("Get user role error")?;
    let permissions = users::resolve_permissions(role);

    if ownership == Ownership::Org && !permissions.can_connect_org {
        return Err(ApiError::Forbidden(
            "Only super admins can create org-level connections".to_string(),
        ));
    }
    if !permissions.can_connect_personal {
        return Err(ApiError::Forbidden(
            "You do not have permission to connect social accounts".to_string(),
        ));
    }

    let external_username = ownership.external_username(&user_id);

    // The profile may already exist; failure here is not fatal because the
    // connect-URL request will surface a real problem anyway.
    if let Err(e) = client.ensure_profile(&external_username).await {
        eprintln!("Upload-Post create user error: {}", e);
    }

    let platforms = match body.platforms {
        Some(platforms) if !platforms.is_empty() => platforms,
        _ => DEFAULT_CONNECT_PLATFORMS
            .iter()
            .map(|p| p.to_string())
            .collect(),
    };

    let redirect_url = format!(
        "{}/admin/social/connections?connected=true&ownership={}",
        state.public_base_url,
        ownership.as_str()
    );

    let connect_url = client
        .generate_connect_url(&ConnectUrlRequest {
            username: external_username.clone(),
            redirect_url,
            redirect_button_text: "Return to Admin".to_string(),
            connect_title: "Connect Your Social Accounts".to_string(),
            connect_description: match ownership {
                Ownership::Org => "Connect organization social media accounts".to_string(),
                Ownership::Personal => "Connect your personal social media accounts".to_string(),
            },
            platforms: platforms.clone(),
        })
        .await
        .log_upstream("Upload-Post generate connect URL error")?;

    let placeholder = json!({
        "jwt_generated_at": Utc::now().to_rfc3339(),
        "requested_platforms": platforms,
    });
    connections::upsert_pending(
        &state.db,
        &user_id,
        ownership,
        &external_username,
        &placeholder,
    )
    .await
    .log_500("Record pending connection error")?;

    Ok(Json(ConnectStartResponse {
        success: true,
        connect_url,
        expires_in: "48 hours".to_string(),
        external_username,
    }))
}
