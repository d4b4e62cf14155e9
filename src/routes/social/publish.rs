//! Publish dispatcher endpoint (/social/publish)
//!
//! Fans a draft out to its target platforms through the aggregation
//! service. The status transition to `publishing` is written before the
//! submission call so a concurrent dispatch of the same draft loses the
//! compare-and-set and is rejected instead of double-submitting.

use axum::{Json, Router, extract::State, routing::post};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use uuid::Uuid;

use crate::AppState;
use crate::constants::{DEFAULT_POST_TITLE, MAX_TITLE_LEN};
use crate::domain::social::{
    Connection, ContentShape, Draft, DraftStatus, classify_content, connections, drafts,
    publish_results,
};
use crate::routes::auth::AuthUser;
use crate::services::error::{ApiError, LogErr};
use crate::services::upload_post::{
    UploadJobRequest, UploadPayload, extract_job_reference,
};

pub fn routes() -> Router<Arc<AppState>> {
    // Each dispatch hits the aggregation service; keep bursts in check
    let rate_limit_config = GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(5)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .expect("Failed to build rate limit config");

    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config.into(),
    };

    Router::new()
        .route("/social/publish", post(publish_draft))
        .layer(rate_limit_layer)
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PublishRequest {
    draft_id: Option<Uuid>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    success: bool,
    request_id: Option<String>,
    message: String,
}

/// POST /social/publish - Dispatch a draft to the aggregation service
async fn publish_draft(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<PublishRequest>,
) -> Result<Json<PublishResponse>, ApiError> {
    let client = state.upload_post.as_ref().ok_or_else(|| {
        ApiError::Configuration("Upload-Post API key not configured".to_string())
    })?;

    let draft_id = body
        .draft_id
        .ok_or_else(|| ApiError::Validation("Draft ID is required".to_string()))?;

    let draft = drafts::get_draft(&state.db, draft_id)
        .await
        .log_500("Get draft error")?
        .ok_or_else(|| ApiError::NotFound("Draft not found".to_string()))?;

    if draft.author_id != user_id {
        return Err(ApiError::Forbidden(
            "You can only publish your own drafts".to_string(),
        ));
    }

    // Everything below this block is a side effect; all local checks come first.
    if !draft.status.can_dispatch() {
        return Err(ApiError::InvalidState(
            "This draft is already published or publishing".to_string(),
        ));
    }

    if draft.target_platforms.is_empty() {
        return Err(ApiError::Validation(
            "No target platforms selected".to_string(),
        ));
    }

    if !draft.has_content() {
        return Err(ApiError::Validation(
            "Post must have either text content or media".to_string(),
        ));
    }

    let accounts = connections::get_active_by_ids(&state.db, &draft.target_accounts)
        .await
        .log_500("Resolve target accounts error")?;

    if accounts.is_empty() {
        return Err(ApiError::Validation(
            "No valid social accounts selected".to_string(),
        ));
    }

    let Some(upload_user) = accounts
        .iter()
        .find_map(|a| a.external_username.clone())
    else {
        return Err(ApiError::Validation(
            "No Upload-Post users configured for selected accounts. \
             Go to Social Connections to set up your accounts."
                .to_string(),
        ));
    };

    // Happens-before edge: publishing is durable before the submission
    // starts, so a concurrent dispatch observes an ineligible status.
    let won = drafts::try_mark_publishing(&state.db, draft_id)
        .await
        .log_500("Mark publishing error")?;
    if !won {
        return Err(ApiError::InvalidState(
            "This draft is already published or publishing".to_string(),
        ));
    }

    let request = build_upload_request(&draft, &upload_user);

    match client.submit(&request).await {
        Ok(response) => {
            let request_id = extract_job_reference(&response);

            // Accepted submissions are optimistically terminal: scheduled
            // posts stay scheduled, immediate posts read as published until
            // the reconciler confirms or corrects.
            let (new_status, published_at) = if draft.scheduled_at.is_some() {
                (DraftStatus::Scheduled, None)
            } else {
                (DraftStatus::Published, Some(Utc::now()))
            };

            drafts::record_dispatch_accepted(
                &state.db,
                draft_id,
                request_id.as_deref(),
                new_status,
                published_at,
            )
            .await
            .log_500("Record dispatch error")?;

            record_results(&state, draft_id, &accounts, true, None, Some(&response)).await;

            let account_ids: Vec<Uuid> = accounts.iter().map(|a| a.id).collect();
            if let Err(e) = connections::record_post_success(&state.db, &account_ids).await {
                eprintln!("Record post success error: {}", e);
            }

            Ok(Json(PublishResponse {
                success: true,
                request_id,
                message: if draft.scheduled_at.is_some() {
                    "Post scheduled successfully".to_string()
                } else {
                    "Post is being published".to_string()
                },
            }))
        }
        Err(upload_error) => {
            eprintln!("Upload-Post error: {}", upload_error);
            let message = upload_error.to_string();

            if let Err(e) = drafts::mark_dispatch_failed(&state.db, draft_id).await {
                eprintln!("Mark dispatch failed error: {}", e);
            }

            record_results(&state, draft_id, &accounts, false, Some(&message), None).await;

            let account_ids: Vec<Uuid> = accounts.iter().map(|a| a.id).collect();
            if let Err(e) =
                connections::record_post_error(&state.db, &account_ids, &message).await
            {
                eprintln!("Record post error error: {}", e);
            }

            Err(ApiError::Upstream(message))
        }
    }
}

/// Insert one publish-result row per target account for this attempt
async fn record_results(
    state: &AppState,
    draft_id: Uuid,
    accounts: &[Connection],
    success: bool,
    error_message: Option<&str>,
    raw_response: Option<&serde_json::Value>,
) {
    for account in accounts {
        let row = publish_results::NewPublishResult {
            draft_id,
            platform: &account.platform,
            account_id: account.id,
            success,
            error_message,
            raw_response,
        };
        if let Err(e) = publish_results::insert_result(&state.db, &row).await {
            eprintln!("Insert publish result error ({}): {}", account.platform, e);
        }
    }
}

/// Shape a draft into one aggregation-service request. The content shape
/// picks the endpoint; text-only posts ride the photo endpoint with no
/// media and carry the link when present.
fn build_upload_request(draft: &Draft, upload_user: &str) -> UploadJobRequest {
    let text = draft
        .text_content
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_string();

    // The aggregation service requires a title
    let title = if text.is_empty() {
        DEFAULT_POST_TITLE.to_string()
    } else {
        text.clone()
    };

    let (payload, title) = match classify_content(&draft.media_urls) {
        ContentShape::Video => (
            UploadPayload::Video {
                url: draft.media_urls[0].clone(),
            },
            title.chars().take(MAX_TITLE_LEN).collect(),
        ),
        ContentShape::Photo => (
            UploadPayload::Photos {
                urls: draft.media_urls.clone(),
            },
            title,
        ),
        ContentShape::Text => (
            UploadPayload::Text {
                link: draft.link_url.clone(),
            },
            title,
        ),
    };

    UploadJobRequest {
        user: upload_user.to_string(),
        platforms: draft.target_platforms.clone(),
        title,
        description: text,
        scheduled_date: draft.scheduled_at,
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft_with(text: Option<&str>, media: &[&str], link: Option<&str>) -> Draft {
        let now = Utc::now();
        Draft {
            id: Uuid::new_v4(),
            author_id: "user_1".to_string(),
            text_content: text.map(str::to_string),
            media_urls: media.iter().map(|s| s.to_string()).collect(),
            link_url: link.map(str::to_string),
            target_platforms: vec!["x".to_string(), "linkedin".to_string()],
            target_accounts: vec![],
            scheduled_at: None,
            status: DraftStatus::Draft,
            upload_job_ref: None,
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_video_request() {
        let draft = draft_with(Some("Clip day"), &["b.mp4", "a.jpg"], None);
        let req = build_upload_request(&draft, "personal_u1");

        assert_eq!(req.endpoint_path(), "/upload");
        assert_eq!(
            req.payload,
            UploadPayload::Video {
                url: "b.mp4".to_string()
            }
        );
        assert_eq!(req.title, "Clip day");
        assert_eq!(req.platforms, vec!["x", "linkedin"]);
    }

    #[test]
    fn test_photo_request() {
        let draft = draft_with(Some("Pics"), &["a.jpg", "b.png"], None);
        let req = build_upload_request(&draft, "personal_u1");

        assert_eq!(req.endpoint_path(), "/upload_photos");
        assert_eq!(
            req.payload,
            UploadPayload::Photos {
                urls: vec!["a.jpg".to_string(), "b.png".to_string()]
            }
        );
    }

    #[test]
    fn test_text_request_gets_default_title_and_link() {
        let draft = draft_with(None, &[], Some("https://example.org/post"));
        let req = build_upload_request(&draft, "personal_u1");

        assert_eq!(req.endpoint_path(), "/upload_photos");
        assert_eq!(
            req.payload,
            UploadPayload::Text {
                link: Some("https://example.org/post".to_string())
            }
        );
        assert_eq!(req.title, DEFAULT_POST_TITLE);
        assert_eq!(req.description, "");
    }

    #[test]
    fn test_video_title_truncated() {
        let long = "x".repeat(400);
        let draft = draft_with(Some(&long), &["clip.mp4"], None);
        let req = build_upload_request(&draft, "personal_u1");

        assert_eq!(req.title.chars().count(), MAX_TITLE_LEN);
        // description keeps the full text
        assert_eq!(req.description.len(), 400);
    }
}
