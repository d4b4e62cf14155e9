//! Status reconciler endpoint (/social/status/{id})
//!
//! Polls the aggregation service for the outcome of a dispatched job and
//! applies the authoritative result: the draft's terminal status, corrected
//! per-platform result rows, and connection health markers. Safe to call
//! repeatedly; a terminal draft is served from the database without a poll,
//! and an upstream outage leaves the stored status untouched.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use super::dto::PublishResultResponse;
use crate::AppState;
use crate::domain::social::{DraftStatus, connections, drafts, publish_results};
use crate::routes::auth::AuthUser;
use crate::services::error::{ApiError, LogErr};
use crate::services::upload_post::{JobState, PlatformResult, parse_platform_results};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/social/status/{id}", get(poll_status))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status: DraftStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    published_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upload_post_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    results: Vec<PublishResultResponse>,
}

/// Draft status implied by an aggregation job state, plus whether to stamp
/// `published_at`. `None` means the job is still in flight and the draft
/// keeps its current status.
fn reconcile_outcome(job_state: JobState) -> Option<(DraftStatus, bool)> {
    match job_state {
        JobState::Completed => Some((DraftStatus::Published, true)),
        JobState::Failed => Some((DraftStatus::Failed, false)),
        JobState::Partial => Some((DraftStatus::PartiallyPublished, true)),
        JobState::Pending => None,
    }
}

/// GET /social/status/{id} - Current publish status of a draft
async fn poll_status(
    State(state): State<Arc<AppState>>,
    AuthUser(_user_id): AuthUser,
    Path(draft_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    let draft = drafts::get_draft(&state.db, draft_id)
        .await
        .log_500("Get draft error")?
        .ok_or_else(|| ApiError::NotFound("Draft not found".to_string()))?;

    // Nothing was ever dispatched: report the stored status
    let Some(job_ref) = draft.upload_job_ref.clone() else {
        return Ok(Json(StatusResponse {
            status: draft.status,
            published_at: draft.published_at,
            upload_post_status: None,
            message: Some("No publish request found".to_string()),
            results: Vec::new(),
        }));
    };

    // Terminal outcomes are cached; repeated polls read the same rows
    if draft.status.is_terminal() {
        let results = publish_results::list_for_draft(&state.db, draft_id)
            .await
            .log_500("List publish results error")?;

        return Ok(Json(StatusResponse {
            status: draft.status,
            published_at: draft.published_at,
            upload_post_status: None,
            message: None,
            results: results.into_iter().map(Into::into).collect(),
        }));
    }

    let client = state.upload_post.as_ref().ok_or_else(|| {
        ApiError::Configuration("Upload-Post API key not configured".to_string())
    })?;

    let body = match client.job_status(&job_ref).await {
        Ok(body) => body,
        Err(e) => {
            // Transient upstream failure must never rewrite the draft; the
            // caller gets the last-known status and can poll again.
            eprintln!("Upload-Post status check error: {}", e);
            let results = publish_results::list_for_draft(&state.db, draft_id)
                .await
                .log_500("List publish results error")?;

            return Ok(Json(StatusResponse {
                status: draft.status,
                published_at: draft.published_at,
                upload_post_status: None,
                message: Some("Unable to fetch status from Upload-Post".to_string()),
                results: results.into_iter().map(Into::into).collect(),
            }));
        }
    };

    let token = body
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("pending")
        .to_string();

    let mut status = draft.status;
    let mut published_at = draft.published_at;

    if let Some((new_status, stamp)) = reconcile_outcome(JobState::from_token(&token)) {
        if new_status != draft.status {
            if stamp {
                published_at = Some(Utc::now());
            }

            drafts::apply_reconciled(
                &state.db,
                draft_id,
                new_status,
                if stamp { published_at } else { None },
            )
            .await
            .log_500("Apply reconciled status error")?;
            status = new_status;

            for result in parse_platform_results(&body) {
                apply_platform_result(&state, draft_id, &result).await;
            }
        }
    }

    let results = publish_results::list_for_draft(&state.db, draft_id)
        .await
        .log_500("List publish results error")?;

    Ok(Json(StatusResponse {
        status,
        published_at,
        upload_post_status: Some(token),
        message: None,
        results: results.into_iter().map(Into::into).collect(),
    }))
}

/// Correct one platform's result row and propagate health to the
/// connection it was dispatched through
async fn apply_platform_result(state: &AppState, draft_id: Uuid, result: &PlatformResult) {
    let account_ids = match publish_results::correct_result(
        &state.db,
        draft_id,
        &result.platform,
        result.success,
        result.post_id.as_deref(),
        result.post_url.as_deref(),
        result.error.as_deref(),
        &result.raw,
    )
    .await
    {
        Ok(ids) => ids,
        Err(e) => {
            eprintln!("Correct publish result error ({}): {}", result.platform, e);
            return;
        }
    };

    if account_ids.is_empty() {
        return;
    }

    let outcome = if result.success {
        connections::record_post_success(&state.db, &account_ids).await
    } else {
        let error = result.error.as_deref().unwrap_or("Publish failed");
        connections::record_post_error(&state.db, &account_ids, error).await
    };

    if let Err(e) = outcome {
        eprintln!("Update connection health error ({}): {}", result.platform, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_outcome_mapping() {
        assert_eq!(
            reconcile_outcome(JobState::Completed),
            Some((DraftStatus::Published, true))
        );
        assert_eq!(
            reconcile_outcome(JobState::Failed),
            Some((DraftStatus::Failed, false))
        );
        assert_eq!(
            reconcile_outcome(JobState::Partial),
            Some((DraftStatus::PartiallyPublished, true))
        );
        assert_eq!(reconcile_outcome(JobState::Pending), None);
    }
}
