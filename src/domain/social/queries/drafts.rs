//! Draft domain - DB queries for social drafts
//!
//! All functions use the generic Executor pattern, allowing them to work with
//! both `&PgPool` (for standalone queries) and `&mut PgConnection` (for
//! transactions). Lifecycle transitions are row-scoped conditional updates:
//! the WHERE clause carries the state precondition and `rows_affected` tells
//! the caller whether the transition won.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use super::super::models::{Draft, DraftStatus};

const DRAFT_COLUMNS: &str = "id, author_id, text_content, media_urls, link_url, \
     target_platforms, target_accounts, scheduled_at, status, upload_job_ref, \
     published_at, created_at, updated_at";

/// Fields of a new draft; id and timestamps are assigned here
#[derive(Debug, Clone)]
pub struct NewDraft {
    pub author_id: String,
    pub text_content: Option<String>,
    pub media_urls: Vec<String>,
    pub link_url: Option<String>,
    pub target_platforms: Vec<String>,
    pub target_accounts: Vec<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: DraftStatus,
}

pub async fn create_draft<'e, E>(executor: E, new: &NewDraft) -> Result<Draft, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        r#"
        INSERT INTO social_drafts
            (id, author_id, text_content, media_urls, link_url,
             target_platforms, target_accounts, scheduled_at, status,
             created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW())
        RETURNING {}
        "#,
        DRAFT_COLUMNS
    );

    sqlx::query_as(&query)
        .bind(Uuid::new_v4())
        .bind(&new.author_id)
        .bind(&new.text_content)
        .bind(&new.media_urls)
        .bind(&new.link_url)
        .bind(&new.target_platforms)
        .bind(&new.target_accounts)
        .bind(new.scheduled_at)
        .bind(new.status)
        .fetch_one(executor)
        .await
}

pub async fn get_draft<'e, E>(executor: E, id: Uuid) -> Result<Option<Draft>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!("SELECT {} FROM social_drafts WHERE id = $1", DRAFT_COLUMNS);

    sqlx::query_as(&query).bind(id).fetch_optional(executor).await
}

/// List an author's drafts, most recently touched first, optionally
/// filtered by status
pub async fn list_drafts<'e, E>(
    executor: E,
    author_id: &str,
    status: Option<&DraftStatus>,
) -> Result<Vec<Draft>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        r#"
        SELECT {} FROM social_drafts
        WHERE author_id = $1 AND ($2::text IS NULL OR status = $2)
        ORDER BY updated_at DESC
        "#,
        DRAFT_COLUMNS
    );

    sqlx::query_as(&query)
        .bind(author_id)
        .bind(status.map(DraftStatus::as_str))
        .fetch_all(executor)
        .await
}

/// Calendar feed: all drafts org-wide, ordered by effective date
/// (schedule, falling back to creation time), optional inclusive range and
/// status filters
pub async fn list_calendar<'e, E>(
    executor: E,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    statuses: Option<Vec<String>>,
) -> Result<Vec<Draft>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        r#"
        SELECT {} FROM social_drafts
        WHERE ($1::timestamptz IS NULL OR COALESCE(scheduled_at, created_at) >= $1)
          AND ($2::timestamptz IS NULL OR COALESCE(scheduled_at, created_at) <= $2)
          AND ($3::text[] IS NULL OR status = ANY($3))
        ORDER BY COALESCE(scheduled_at, created_at) ASC
        "#,
        DRAFT_COLUMNS
    );

    sqlx::query_as(&query)
        .bind(start)
        .bind(end)
        .bind(statuses)
        .fetch_all(executor)
        .await
}

/// Persist edited content fields plus any derived status change.
/// The caller is expected to have fetched the row and run the lifecycle
/// checks; this writes the merged result back by id.
pub async fn update_draft<'e, E>(executor: E, draft: &Draft) -> Result<Draft, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        r#"
        UPDATE social_drafts
        SET text_content = $2, media_urls = $3, link_url = $4,
            target_platforms = $5, target_accounts = $6, scheduled_at = $7,
            status = $8, updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        DRAFT_COLUMNS
    );

    sqlx::query_as(&query)
        .bind(draft.id)
        .bind(&draft.text_content)
        .bind(&draft.media_urls)
        .bind(&draft.link_url)
        .bind(&draft.target_platforms)
        .bind(&draft.target_accounts)
        .bind(draft.scheduled_at)
        .bind(draft.status)
        .fetch_one(executor)
        .await
}

/// Compare-and-set transition into `publishing`, the happens-before edge of
/// dispatch: of two concurrent dispatchers only one sees rows_affected = 1,
/// and the write lands before any network submission begins.
pub async fn try_mark_publishing<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE social_drafts
        SET status = 'publishing', updated_at = NOW()
        WHERE id = $1 AND status IN ('draft', 'scheduled')
        "#,
    )
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Record an accepted submission: job reference plus the optimistic status
/// (scheduled for future posts, published for immediate ones)
pub async fn record_dispatch_accepted<'e, E>(
    executor: E,
    id: Uuid,
    job_ref: Option<&str>,
    status: DraftStatus,
    published_at: Option<DateTime<Utc>>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        UPDATE social_drafts
        SET upload_job_ref = $2, status = $3, published_at = $4, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(job_ref)
    .bind(status)
    .bind(published_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn mark_dispatch_failed<'e, E>(executor: E, id: Uuid) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        "UPDATE social_drafts SET status = 'failed', updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Apply the reconciler's authoritative status. `published_at` is only ever
/// stamped, never cleared.
pub async fn apply_reconciled<'e, E>(
    executor: E,
    id: Uuid,
    status: DraftStatus,
    published_at: Option<DateTime<Utc>>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        UPDATE social_drafts
        SET status = $2, published_at = COALESCE($3, published_at), updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(published_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Delete a draft. The status guard backs up the handler check: a draft
/// that slipped into `publishing` concurrently is never deleted.
pub async fn delete_draft<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        "DELETE FROM social_drafts WHERE id = $1 AND status <> 'publishing'",
    )
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}
