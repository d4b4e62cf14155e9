//! Publish result model definitions

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Per-platform outcome of one dispatch attempt.
///
/// Rows are inserted optimistically at dispatch time (`success = true`,
/// no platform post id yet) and corrected once the reconciler sees the
/// aggregation service's real outcome.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PublishResult {
    pub id: Uuid,
    pub draft_id: Uuid,
    pub platform: String,
    pub account_id: Uuid,
    pub success: bool,
    pub platform_post_id: Option<String>,
    pub platform_post_url: Option<String>,
    pub error_message: Option<String>,
    pub raw_response: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
