//! Sync engine endpoints (/social/accounts/sync)
//!
//! Pulls the connected-platform lists from the aggregation service and
//! reconciles them into local connections. Per-profile problems are
//! reported, never fatal: a 404 just means the user hasn't finished the
//! OAuth hand-off for that ownership yet.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::AppState;
use crate::domain::social::{Ownership, connections};
use crate::domain::users::{self, UserRole};
use crate::routes::auth::AuthUser;
use crate::services::error::{ApiError, LogErr};
use crate::services::upload_post::{UploadPostClient, extract_connected_platforms};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/social/accounts/sync",
        post(sync_accounts).get(sync_check),
    )
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct SyncRequest {
    ownership: Option<Ownership>,
}

#[derive(Serialize)]
struct SyncOutcome {
    platform: String,
    ownership: Ownership,
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
}

#[derive(Serialize)]
struct SyncResponse {
    success: bool,
    synced: Vec<SyncOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

/// POST /social/accounts/sync - Reconcile local connections against the
/// aggregation service. Personal accounts always sync; org accounts sync
/// for super admins, or when explicitly requested via the ownership filter.
async fn sync_accounts(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<SyncRequest>,
) -> Result<Json<SyncResponse>, ApiError> {
    let client = state.upload_post.as_ref().ok_or_else(|| {
        ApiError::Configuration("Upload-Post API key not configured".to_string())
    })?;

    let role = users::get_user_role(&state.db, &user_id, &state.bootstrap_admins)
        .await
        .log_500("Get user role error")?;

    let ownerships: Vec<Ownership> = match body.ownership {
        Some(ownership) => vec![ownership],
        None if role == UserRole::SuperAdmin => vec![Ownership::Personal, Ownership::Org],
        None => vec![Ownership::Personal],
    };

    let mut synced = Vec::new();
    let mut errors = Vec::new();

    for ownership in ownerships {
        let external_username = ownership.external_username(&user_id);

        let profile = match client.fetch_profile(&external_username).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                // Not an error: the OAuth hand-off was never completed
                errors.push(format!(
                    "User {} not found in Upload-Post. Make sure you completed the OAuth flow.",
                    external_username
                ));
                continue;
            }
            Err(e) => {
                errors.push(format!("Error syncing {}: {}", external_username, e));
                continue;
            }
        };

        let platforms = extract_connected_platforms(&profile);
        if platforms.is_empty() {
            continue;
        }

        for platform in &platforms {
            // Human-readable names beat the opaque internal ids the API
            // often puts in `username`
            let display_name = platform
                .display_name
                .clone()
                .or_else(|| platform.username.clone());
            let platform_user_id = platform
                .external_id
                .clone()
                .or_else(|| platform.username.clone());

            let account = connections::SyncedAccount {
                user_id: &user_id,
                platform: &platform.platform,
                ownership,
                external_username: &external_username,
                platform_username: display_name.as_deref(),
                platform_user_id: platform_user_id.as_deref(),
                profile_data: &platform.raw,
            };

            match connections::upsert_synced(&state.db, &account).await {
                Ok(action) => synced.push(SyncOutcome {
                    platform: platform.platform.clone(),
                    ownership,
                    action,
                    username: display_name,
                }),
                Err(e) => {
                    errors.push(format!("Failed to sync {}: {}", platform.platform, e));
                }
            }
        }

        if let Err(e) = connections::delete_pending(&state.db, &user_id, ownership).await {
            eprintln!("Delete pending connection error: {}", e);
        }
    }

    Ok(Json(SyncResponse {
        success: true,
        synced,
        errors,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncCheckResponse {
    success: bool,
    upload_post_status: Value,
}

/// GET /social/accounts/sync - Read-only connection check against the
/// aggregation service for both ownerships; writes nothing
async fn sync_check(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<SyncCheckResponse>, ApiError> {
    let client = state.upload_post.as_ref().ok_or_else(|| {
        ApiError::Configuration("Upload-Post API key not configured".to_string())
    })?;

    let mut status = serde_json::Map::new();
    for ownership in [Ownership::Personal, Ownership::Org] {
        let external_username = ownership.external_username(&user_id);
        status.insert(
            ownership.as_str().to_string(),
            ownership_check(client, &external_username).await,
        );
    }

    Ok(Json(SyncCheckResponse {
        success: true,
        upload_post_status: Value::Object(status),
    }))
}

async fn ownership_check(client: &UploadPostClient, external_username: &str) -> Value {
    match client.fetch_profile(external_username).await {
        Ok(Some(profile)) => {
            let platforms: Vec<String> = extract_connected_platforms(&profile)
                .into_iter()
                .map(|p| p.platform)
                .collect();
            json!({ "exists": true, "platforms": platforms })
        }
        Ok(None) => json!({ "exists": false, "platforms": [] }),
        Err(e) => json!({ "error": e.to_string() }),
    }
}
