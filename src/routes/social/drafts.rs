//! Draft endpoints (/social/drafts, /social/calendar)

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::dto::{CalendarPost, DraftResponse};
use crate::AppState;
use crate::domain::social::{Draft, DraftStatus, drafts, status_for_schedule};
use crate::routes::auth::AuthUser;
use crate::services::error::{ApiError, LogErr};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/social/drafts",
            get(list_drafts)
                .post(create_draft)
                .put(update_draft)
                .delete(delete_draft),
        )
        .route("/social/calendar", get(calendar))
}

/// Distinguishes "field absent" (outer None) from "field set to null"
/// (Some(None)) in partial updates
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Serialize)]
struct DraftEnvelope {
    success: bool,
    draft: DraftResponse,
}

// ============================================================================
// List
// ============================================================================

#[derive(Deserialize)]
struct ListDraftsQuery {
    status: Option<String>,
}

#[derive(Serialize)]
struct ListDraftsResponse {
    drafts: Vec<DraftResponse>,
}

/// GET /social/drafts - List the requester's drafts, newest first
async fn list_drafts(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ListDraftsQuery>,
) -> Result<Json<ListDraftsResponse>, ApiError> {
    let status = query.status.as_deref().map(DraftStatus::from_str);

    let drafts = drafts::list_drafts(&state.db, &user_id, status.as_ref())
        .await
        .log_500("List drafts error")?;

    Ok(Json(ListDraftsResponse {
        drafts: drafts.into_iter().map(DraftResponse::from).collect(),
    }))
}

// ============================================================================
// Create
// ============================================================================

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct CreateDraftRequest {
    text_content: Option<String>,
    media_urls: Option<Vec<String>>,
    link_url: Option<String>,
    target_platforms: Option<Vec<String>>,
    target_accounts: Option<Vec<Uuid>>,
    scheduled_at: Option<DateTime<Utc>>,
}

/// POST /social/drafts - Create a draft; scheduled iff the timestamp is in
/// the future
async fn create_draft(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateDraftRequest>,
) -> Result<(StatusCode, Json<DraftEnvelope>), ApiError> {
    let text_content = body.text_content.filter(|t| !t.trim().is_empty());
    let media_urls = body.media_urls.unwrap_or_default();

    if text_content.is_none() && media_urls.is_empty() {
        return Err(ApiError::Validation(
            "Post must have text content or media".to_string(),
        ));
    }

    let new = drafts::NewDraft {
        author_id: user_id,
        text_content,
        media_urls,
        link_url: body.link_url.filter(|l| !l.is_empty()),
        target_platforms: body.target_platforms.unwrap_or_default(),
        target_accounts: body.target_accounts.unwrap_or_default(),
        scheduled_at: body.scheduled_at,
        status: status_for_schedule(body.scheduled_at, Utc::now()),
    };

    let draft = drafts::create_draft(&state.db, &new)
        .await
        .log_500("Create draft error")?;

    Ok((
        StatusCode::CREATED,
        Json(DraftEnvelope {
            success: true,
            draft: draft.into(),
        }),
    ))
}

// ============================================================================
// Update
// ============================================================================

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct UpdateDraftRequest {
    id: Option<Uuid>,
    #[serde(deserialize_with = "double_option")]
    text_content: Option<Option<String>>,
    media_urls: Option<Vec<String>>,
    #[serde(deserialize_with = "double_option")]
    link_url: Option<Option<String>>,
    target_platforms: Option<Vec<String>>,
    target_accounts: Option<Vec<Uuid>>,
    #[serde(deserialize_with = "double_option")]
    scheduled_at: Option<Option<DateTime<Utc>>>,
}

/// PUT /social/drafts - Partial update of an unpublished draft.
/// Only the author may edit; publishing/published content is immutable.
async fn update_draft(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<UpdateDraftRequest>,
) -> Result<Json<DraftEnvelope>, ApiError> {
    let id = body
        .id
        .ok_or_else(|| ApiError::Validation("Draft ID is required".to_string()))?;

    let mut draft = drafts::get_draft(&state.db, id)
        .await
        .log_500("Get draft error")?
        .ok_or_else(|| ApiError::NotFound("Draft not found".to_string()))?;

    if draft.author_id != user_id {
        return Err(ApiError::Forbidden(
            "You can only edit your own drafts".to_string(),
        ));
    }

    if !draft.status.can_edit() {
        return Err(ApiError::InvalidState(
            "Cannot edit a published or publishing post".to_string(),
        ));
    }

    apply_changes(&mut draft, body, Utc::now());

    if !draft.has_content() {
        return Err(ApiError::Validation(
            "Post must have text content or media".to_string(),
        ));
    }

    let draft = drafts::update_draft(&state.db, &draft)
        .await
        .log_500("Update draft error")?;

    Ok(Json(DraftEnvelope {
        success: true,
        draft: draft.into(),
    }))
}

/// Merge a partial update into a fetched draft. Setting a future schedule
/// moves it to scheduled; clearing the schedule of a scheduled draft
/// reverts it to draft.
fn apply_changes(draft: &mut Draft, body: UpdateDraftRequest, now: DateTime<Utc>) {
    if let Some(text) = body.text_content {
        draft.text_content = text.filter(|t| !t.trim().is_empty());
    }
    if let Some(media) = body.media_urls {
        draft.media_urls = media;
    }
    if let Some(link) = body.link_url {
        draft.link_url = link.filter(|l| !l.is_empty());
    }
    if let Some(platforms) = body.target_platforms {
        draft.target_platforms = platforms;
    }
    if let Some(accounts) = body.target_accounts {
        draft.target_accounts = accounts;
    }
    if let Some(scheduled_at) = body.scheduled_at {
        draft.scheduled_at = scheduled_at;
        match scheduled_at {
            Some(at) if at > now => draft.status = DraftStatus::Scheduled,
            Some(_) => {}
            None => {
                if draft.status == DraftStatus::Scheduled {
                    draft.status = DraftStatus::Draft;
                }
            }
        }
    }
}

// ============================================================================
// Delete
// ============================================================================

#[derive(Deserialize)]
struct DeleteDraftRequest {
    id: Option<Uuid>,
}

#[derive(Serialize)]
struct DeleteDraftResponse {
    success: bool,
}

/// DELETE /social/drafts - Delete a draft; rejected mid-publish because the
/// upstream job cannot be recalled
async fn delete_draft(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<DeleteDraftRequest>,
) -> Result<Json<DeleteDraftResponse>, ApiError> {
    let id = body
        .id
        .ok_or_else(|| ApiError::Validation("Draft ID is required".to_string()))?;

    let draft = drafts::get_draft(&state.db, id)
        .await
        .log_500("Get draft error")?
        .ok_or_else(|| ApiError::NotFound("Draft not found".to_string()))?;

    if draft.author_id != user_id {
        return Err(ApiError::Forbidden(
            "You can only delete your own drafts".to_string(),
        ));
    }

    if !draft.status.can_delete() {
        return Err(ApiError::InvalidState(
            "Cannot delete a post that is currently publishing".to_string(),
        ));
    }

    let deleted = drafts::delete_draft(&state.db, id)
        .await
        .log_500("Delete draft error")?;
    if !deleted {
        // the row moved into publishing between the check and the delete
        return Err(ApiError::InvalidState(
            "Cannot delete a post that is currently publishing".to_string(),
        ));
    }

    Ok(Json(DeleteDraftResponse { success: true }))
}

// ============================================================================
// Calendar
// ============================================================================

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct CalendarQuery {
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    /// Comma-separated status filter
    status: Option<String>,
}

#[derive(Serialize)]
struct CalendarResponse {
    success: bool,
    posts: Vec<CalendarPost>,
    count: usize,
}

/// GET /social/calendar - Org-wide posts by effective date, for the
/// calendar view. Any authenticated admin sees all posts.
async fn calendar(
    State(state): State<Arc<AppState>>,
    AuthUser(_user_id): AuthUser,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarResponse>, ApiError> {
    let statuses = query.status.map(|s| {
        s.split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
    });

    let posts = drafts::list_calendar(&state.db, query.start_date, query.end_date, statuses)
        .await
        .log_500("Calendar query error")?;

    let posts: Vec<CalendarPost> = posts.into_iter().map(CalendarPost::from).collect();
    let count = posts.len();

    Ok(Json(CalendarResponse {
        success: true,
        posts,
        count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base_draft(now: DateTime<Utc>) -> Draft {
        Draft {
            id: Uuid::new_v4(),
            author_id: "user_1".to_string(),
            text_content: Some("Hello".to_string()),
            media_urls: vec![],
            link_url: None,
            target_platforms: vec!["x".to_string()],
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
    fn test_schedule_round_trip() {
        let now = Utc::now();
        let mut draft = base_draft(now);

        // setting a future schedule moves the draft to scheduled
        apply_changes(
            &mut draft,
            UpdateDraftRequest {
                scheduled_at: Some(Some(now + Duration::hours(1))),
                ..Default::default()
            },
            now,
        );
        assert_eq!(draft.status, DraftStatus::Scheduled);

        // clearing it while still scheduled reverts to draft
        apply_changes(
            &mut draft,
            UpdateDraftRequest {
                scheduled_at: Some(None),
                ..Default::default()
            },
            now,
        );
        assert_eq!(draft.status, DraftStatus::Draft);
        assert_eq!(draft.scheduled_at, None);
    }

    #[test]
    fn test_absent_schedule_leaves_status_alone() {
        let now = Utc::now();
        let mut draft = base_draft(now);
        draft.status = DraftStatus::Scheduled;
        draft.scheduled_at = Some(now + Duration::hours(2));

        apply_changes(
            &mut draft,
            UpdateDraftRequest {
                text_content: Some(Some("Updated".to_string())),
                ..Default::default()
            },
            now,
        );

        assert_eq!(draft.status, DraftStatus::Scheduled);
        assert_eq!(draft.text_content.as_deref(), Some("Updated"));
    }

    #[test]
    fn test_empty_text_clears_content() {
        let now = Utc::now();
        let mut draft = base_draft(now);

        apply_changes(
            &mut draft,
            UpdateDraftRequest {
                text_content: Some(Some("   ".to_string())),
                media_urls: Some(vec!["a.jpg".to_string()]),
                ..Default::default()
            },
            now,
        );

        assert_eq!(draft.text_content, None);
        assert!(draft.has_content());
    }
}
