//! Publish result domain - DB queries for per-platform publish outcomes

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use super::super::models::PublishResult;

const RESULT_COLUMNS: &str = "id, draft_id, platform, account_id, success, platform_post_id, \
     platform_post_url, error_message, raw_response, created_at";

/// A placeholder row written at dispatch time, one per (draft, platform)
/// for the attempt
#[derive(Debug, Clone)]
pub struct NewPublishResult<'a> {
    pub draft_id: Uuid,
    pub platform: &'a str,
    pub account_id: Uuid,
    pub success: bool,
    pub error_message: Option<&'a str>,
    pub raw_response: Option<&'a serde_json::Value>,
}

pub async fn insert_result<'e, E>(
    executor: E,
    result: &NewPublishResult<'_>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO social_publish_results
            (id, draft_id, platform, account_id, success, error_message,
             raw_response, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(result.draft_id)
    .bind(result.platform)
    .bind(result.account_id)
    .bind(result.success)
    .bind(result.error_message)
    .bind(result.raw_response)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn list_for_draft<'e, E>(
    executor: E,
    draft_id: Uuid,
) -> Result<Vec<PublishResult>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        "SELECT {} FROM social_publish_results WHERE draft_id = $1 ORDER BY created_at ASC",
        RESULT_COLUMNS
    );

    sqlx::query_as(&query).bind(draft_id).fetch_all(executor).await
}

/// Correct placeholder rows with the aggregation service's real outcome,
/// matched on (draft, platform). Post id/url are only ever filled in, not
/// cleared. Returns the account ids of the touched rows so the caller can
/// update connection health.
pub async fn correct_result<'e, E>(
    executor: E,
    draft_id: Uuid,
    platform: &str,
    success: bool,
    post_id: Option<&str>,
    post_url: Option<&str>,
    error: Option<&str>,
    raw: &serde_json::Value,
) -> Result<Vec<Uuid>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        UPDATE social_publish_results
        SET success = $3,
            platform_post_id = COALESCE($4, platform_post_id),
            platform_post_url = COALESCE($5, platform_post_url),
            error_message = $6,
            raw_response = $7
        WHERE draft_id = $1 AND platform = $2
        RETURNING account_id
        "#,
    )
    .bind(draft_id)
    .bind(platform)
    .bind(success)
    .bind(post_id)
    .bind(post_url)
    .bind(error)
    .bind(raw)
    .fetch_all(executor)
    .await?;

    let mut ids: Vec<Uuid> = rows.into_iter().map(|(id,)| id).collect();
    ids.dedup();
    Ok(ids)
}
