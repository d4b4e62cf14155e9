//! Connection domain - DB queries for social connections
//!
//! All functions use the generic Executor pattern except the upserts, which
//! run two statements and take `&PgPool` directly.

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use super::super::models::{Connection, Ownership};

/// Placeholder platform for connections awaiting their first sync
const PENDING_PLATFORM: &str = "pending";

const CONNECTION_COLUMNS: &str = "id, user_id, platform, ownership, external_username, \
     platform_username, platform_user_id, active, connected_at, \
     last_successful_post_at, last_error_message, profile_data";

/// Active connections a user may publish through: their own plus all
/// org-owned ones. Org rows sort first ('org' < 'personal'), then most
/// recently connected.
pub async fn list_accessible<'e, E>(
    executor: E,
    user_id: &str,
) -> Result<Vec<Connection>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        r#"
        SELECT {} FROM social_connections
        WHERE active = TRUE AND (user_id = $1 OR ownership = 'org')
        ORDER BY ownership ASC, connected_at DESC
        "#,
        CONNECTION_COLUMNS
    );

    sqlx::query_as(&query).bind(user_id).fetch_all(executor).await
}

pub async fn get_connection<'e, E>(
    executor: E,
    id: Uuid,
) -> Result<Option<Connection>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        "SELECT {} FROM social_connections WHERE id = $1",
        CONNECTION_COLUMNS
    );

    sqlx::query_as(&query).bind(id).fetch_optional(executor).await
}

/// Resolve dispatch targets: only active rows count
pub async fn get_active_by_ids<'e, E>(
    executor: E,
    ids: &[Uuid],
) -> Result<Vec<Connection>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        "SELECT {} FROM social_connections WHERE id = ANY($1) AND active = TRUE",
        CONNECTION_COLUMNS
    );

    sqlx::query_as(&query).bind(ids).fetch_all(executor).await
}

/// Soft delete: the row survives for publish-result history
pub async fn deactivate<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("UPDATE social_connections SET active = FALSE WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// A connection as reported by an aggregation-service sync pass
#[derive(Debug, Clone)]
pub struct SyncedAccount<'a> {
    pub user_id: &'a str,
    pub platform: &'a str,
    pub ownership: Ownership,
    pub external_username: &'a str,
    pub platform_username: Option<&'a str>,
    pub platform_user_id: Option<&'a str>,
    pub profile_data: &'a serde_json::Value,
}

/// Upsert on the (user, platform, ownership) key. Returns "created" or
/// "updated" for the sync report.
pub async fn upsert_synced(
    db: &PgPool,
    acct: &SyncedAccount<'_>,
) -> Result<&'static str, sqlx::Error> {
    let existing: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT id FROM social_connections
        WHERE user_id = $1 AND platform = $2 AND ownership = $3
        "#,
    )
    .bind(acct.user_id)
    .bind(acct.platform)
    .bind(acct.ownership)
    .fetch_optional(db)
    .await?;

    if let Some((id,)) = existing {
        sqlx::query(
            r#"
            UPDATE social_connections
            SET external_username = $2, platform_username = $3, platform_user_id = $4,
                active = TRUE, connected_at = NOW(), last_error_message = NULL,
                profile_data = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(acct.external_username)
        .bind(acct.platform_username)
        .bind(acct.platform_user_id)
        .bind(acct.profile_data)
        .execute(db)
        .await?;

        Ok("updated")
    } else {
        sqlx::query(
            r#"
            INSERT INTO social_connections
                (id, user_id, platform, ownership, external_username,
                 platform_username, platform_user_id, active, connected_at,
                 profile_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, NOW(), $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(acct.user_id)
        .bind(acct.platform)
        .bind(acct.ownership)
        .bind(acct.external_username)
        .bind(acct.platform_username)
        .bind(acct.platform_user_id)
        .bind(acct.profile_data)
        .execute(db)
        .await?;

        Ok("created")
    }
}

/// Record that a connect flow was started: an inactive placeholder row that
/// the next sync pass replaces or removes
pub async fn upsert_pending(
    db: &PgPool,
    user_id: &str,
    ownership: Ownership,
    external_username: &str,
    profile_data: &serde_json::Value,
) -> Result<(), sqlx::Error> {
    let existing: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT id FROM social_connections
        WHERE user_id = $1 AND platform = $2 AND ownership = $3
        "#,
    )
    .bind(user_id)
    .bind(PENDING_PLATFORM)
    .bind(ownership)
    .fetch_optional(db)
    .await?;

    if let Some((id,)) = existing {
        sqlx::query(
            r#"
            UPDATE social_connections
            SET external_username = $2, active = FALSE, profile_data = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(external_username)
        .bind(profile_data)
        .execute(db)
        .await?;
    } else {
        sqlx::query(
            r#"
            INSERT INTO social_connections
                (id, user_id, platform, ownership, external_username, active,
                 connected_at, profile_data)
            VALUES ($1, $2, $3, $4, $5, FALSE, NOW(), $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(PENDING_PLATFORM)
        .bind(ownership)
        .bind(external_username)
        .bind(profile_data)
        .execute(db)
        .await?;
    }

    Ok(())
}

/// Pending placeholders are the one kind of row that is hard-deleted
pub async fn delete_pending<'e, E>(
    executor: E,
    user_id: &str,
    ownership: Ownership,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        DELETE FROM social_connections
        WHERE user_id = $1 AND platform = $2 AND ownership = $3
        "#,
    )
    .bind(user_id)
    .bind(PENDING_PLATFORM)
    .bind(ownership)
    .execute(executor)
    .await?;

    Ok(())
}

/// A platform accepted a post through these connections: refresh the
/// health marker and clear any stale error
pub async fn record_post_success<'e, E>(executor: E, ids: &[Uuid]) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        UPDATE social_connections
        SET last_successful_post_at = NOW(), last_error_message = NULL
        WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn record_post_error<'e, E>(
    executor: E,
    ids: &[Uuid],
    error: &str,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("UPDATE social_connections SET last_error_message = $2 WHERE id = ANY($1)")
        .bind(ids)
        .bind(error)
        .execute(executor)
        .await?;

    Ok(())
}
