//! API response DTOs for the social publishing surface

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::social::{Connection, Draft, DraftStatus, Ownership, PublishResult};

/// Draft API response
#[derive(Debug, Clone, Serialize)]
pub struct DraftResponse {
    pub id: Uuid,
    pub author_id: String,
    pub text_content: Option<String>,
    pub media_urls: Vec<String>,
    pub link_url: Option<String>,
    pub target_platforms: Vec<String>,
    pub target_accounts: Vec<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: DraftStatus,
    pub upload_job_ref: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Draft> for DraftResponse {
    fn from(d: Draft) -> Self {
        Self {
            id: d.id,
            author_id: d.author_id,
            text_content: d.text_content,
            media_urls: d.media_urls,
            link_url: d.link_url,
            target_platforms: d.target_platforms,
            target_accounts: d.target_accounts,
            scheduled_at: d.scheduled_at,
            status: d.status,
            upload_job_ref: d.upload_job_ref,
            published_at: d.published_at,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

/// Connection API response
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionResponse {
    pub id: Uuid,
    pub user_id: String,
    pub platform: String,
    pub ownership: Ownership,
    pub external_username: Option<String>,
    pub platform_username: Option<String>,
    pub platform_user_id: Option<String>,
    pub active: bool,
    pub connected_at: DateTime<Utc>,
    pub last_successful_post_at: Option<DateTime<Utc>>,
    pub last_error_message: Option<String>,
}

impl From<Connection> for ConnectionResponse {
    fn from(c: Connection) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            platform: c.platform,
            ownership: c.ownership,
            external_username: c.external_username,
            platform_username: c.platform_username,
            platform_user_id: c.platform_user_id,
            active: c.active,
            connected_at: c.connected_at,
            last_successful_post_at: c.last_successful_post_at,
            last_error_message: c.last_error_message,
        }
    }
}

/// Per-platform publish outcome API response
#[derive(Debug, Clone, Serialize)]
pub struct PublishResultResponse {
    pub id: Uuid,
    pub draft_id: Uuid,
    pub platform: String,
    pub account_id: Uuid,
    pub success: bool,
    pub platform_post_id: Option<String>,
    pub platform_post_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PublishResult> for PublishResultResponse {
    fn from(r: PublishResult) -> Self {
        Self {
            id: r.id,
            draft_id: r.draft_id,
            platform: r.platform,
            account_id: r.account_id,
            success: r.success,
            platform_post_id: r.platform_post_id,
            platform_post_url: r.platform_post_url,
            error_message: r.error_message,
            created_at: r.created_at,
        }
    }
}

/// Calendar-friendly projection of a draft: one effective date, the primary
/// platform pulled out for compact rendering
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarPost {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub platform: String,
    pub platforms: Vec<String>,
    pub content: String,
    pub media: Vec<String>,
    pub link_url: Option<String>,
    pub status: DraftStatus,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Draft> for CalendarPost {
    fn from(d: Draft) -> Self {
        Self {
            id: d.id,
            date: d.scheduled_at.unwrap_or(d.created_at),
            platform: d
                .target_platforms
                .first()
                .cloned()
                .unwrap_or_else(|| "unknown".to_string()),
            platforms: d.target_platforms,
            content: d.text_content.unwrap_or_default(),
            media: d.media_urls,
            link_url: d.link_url,
            status: d.status,
            author_id: d.author_id,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}
