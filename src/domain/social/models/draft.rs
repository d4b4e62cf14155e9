//! Draft model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, Postgres, Type};
use uuid::Uuid;

use crate::constants::VIDEO_EXTENSIONS;

/// Draft lifecycle status.
///
/// Legal transitions:
/// - draft <-> scheduled (schedule set to a future time / cleared)
/// - draft/scheduled -> publishing (dispatch)
/// - publishing -> published | partially_published | failed (reconciler,
///   or the dispatcher's optimistic/failure writes)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Draft,
    Scheduled,
    Publishing,
    Published,
    PartiallyPublished,
    Failed,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Draft => "draft",
            DraftStatus::Scheduled => "scheduled",
            DraftStatus::Publishing => "publishing",
            DraftStatus::Published => "published",
            DraftStatus::PartiallyPublished => "partially_published",
            DraftStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "scheduled" => DraftStatus::Scheduled,
            "publishing" => DraftStatus::Publishing,
            "published" => DraftStatus::Published,
            "partially_published" => DraftStatus::PartiallyPublished,
            "failed" => DraftStatus::Failed,
            _ => DraftStatus::Draft,
        }
    }

    /// Terminal states: only a fresh draft can follow
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DraftStatus::Published | DraftStatus::PartiallyPublished | DraftStatus::Failed
        )
    }

    /// Content edits are rejected once a draft is in flight or out the door
    pub fn can_edit(&self) -> bool {
        !matches!(self, DraftStatus::Publishing | DraftStatus::Published)
    }

    /// Deleting is rejected only mid-publish: the upstream job can't be recalled
    pub fn can_delete(&self) -> bool {
        *self != DraftStatus::Publishing
    }

    /// Dispatch eligibility
    pub fn can_dispatch(&self) -> bool {
        matches!(self, DraftStatus::Draft | DraftStatus::Scheduled)
    }
}

// sqlx Type/Decode/Encode for DraftStatus to enable FromRow on Draft
impl Type<Postgres> for DraftStatus {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for DraftStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <String as Decode<Postgres>>::decode(value)?;
        Ok(DraftStatus::from_str(&s))
    }
}

impl Encode<'_, Postgres> for DraftStatus {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <String as Encode<Postgres>>::encode_by_ref(&self.as_str().to_owned(), buf)
    }
}

/// A unit of content intended for publication
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Draft {
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

impl Draft {
    /// A draft must carry text or at least one media URL
    pub fn has_content(&self) -> bool {
        self.text_content
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
            || !self.media_urls.is_empty()
    }
}

/// Content shape of a draft, decided by its media URLs. The three shapes
/// are mutually exclusive and select the aggregation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentShape {
    Video,
    Photo,
    Text,
}

/// Classify by file extension: any video extension makes the whole post a
/// video post, any other media is a photo post, no media is text-only
pub fn classify_content(media_urls: &[String]) -> ContentShape {
    if media_urls.is_empty() {
        return ContentShape::Text;
    }

    let has_video = media_urls.iter().any(|url| {
        let lower = url.to_lowercase();
        VIDEO_EXTENSIONS.iter().any(|ext| lower.contains(ext))
    });

    if has_video {
        ContentShape::Video
    } else {
        ContentShape::Photo
    }
}

/// Status a draft gets from its schedule: a future timestamp means
/// scheduled, anything else is a plain draft
pub fn status_for_schedule(
    scheduled_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> DraftStatus {
    match scheduled_at {
        Some(at) if at > now => DraftStatus::Scheduled,
        _ => DraftStatus::Draft,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_content_classification() {
        assert_eq!(
            classify_content(&urls(&["a.jpg", "b.mp4"])),
            ContentShape::Video
        );
        assert_eq!(classify_content(&urls(&["a.jpg"])), ContentShape::Photo);
        assert_eq!(classify_content(&[]), ContentShape::Text);
        // extension match is case-insensitive and position-independent
        assert_eq!(
            classify_content(&urls(&["https://cdn/clip.MOV?sig=abc"])),
            ContentShape::Video
        );
    }

    #[test]
    fn test_status_for_schedule() {
        let now = Utc::now();
        assert_eq!(
            status_for_schedule(Some(now + Duration::hours(1)), now),
            DraftStatus::Scheduled
        );
        assert_eq!(
            status_for_schedule(Some(now - Duration::hours(1)), now),
            DraftStatus::Draft
        );
        assert_eq!(status_for_schedule(None, now), DraftStatus::Draft);
    }

    #[test]
    fn test_transition_predicates() {
        assert!(DraftStatus::Draft.can_dispatch());
        assert!(DraftStatus::Scheduled.can_dispatch());
        assert!(!DraftStatus::Publishing.can_dispatch());
        assert!(!DraftStatus::Published.can_dispatch());
        assert!(!DraftStatus::Failed.can_dispatch());

        assert!(!DraftStatus::Publishing.can_edit());
        assert!(!DraftStatus::Published.can_edit());
        assert!(DraftStatus::Failed.can_edit());
        assert!(DraftStatus::PartiallyPublished.can_edit());

        assert!(!DraftStatus::Publishing.can_delete());
        assert!(DraftStatus::Published.can_delete());

        assert!(DraftStatus::Published.is_terminal());
        assert!(DraftStatus::PartiallyPublished.is_terminal());
        assert!(DraftStatus::Failed.is_terminal());
        assert!(!DraftStatus::Publishing.is_terminal());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            DraftStatus::Draft,
            DraftStatus::Scheduled,
            DraftStatus::Publishing,
            DraftStatus::Published,
            DraftStatus::PartiallyPublished,
            DraftStatus::Failed,
        ] {
            assert_eq!(DraftStatus::from_str(status.as_str()), status);
        }
        assert_eq!(DraftStatus::from_str("bogus"), DraftStatus::Draft);
    }
}
