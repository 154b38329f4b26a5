//! Database query functions for the `specs` table.

use anyhow::{Context, Result};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{NewSpec, Spec, SpecSummary};

/// Insert a new spec row. Returns the inserted spec with server-generated
/// defaults (id, created_at, updated_at).
pub async fn insert_spec<'e, E>(executor: E, spec: &NewSpec<'_>) -> Result<Spec>
where
    E: PgExecutor<'e>,
{
    let spec = sqlx::query_as::<_, Spec>(
        "INSERT INTO specs (goal, users, constraints, template_type) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(spec.goal)
    .bind(spec.users)
    .bind(spec.constraints)
    .bind(spec.template_type)
    .fetch_one(executor)
    .await
    .context("failed to insert spec")?;

    Ok(spec)
}

/// Fetch a spec by its ID.
pub async fn get_spec<'e, E>(executor: E, id: Uuid) -> Result<Option<Spec>>
where
    E: PgExecutor<'e>,
{
    let spec = sqlx::query_as::<_, Spec>("SELECT * FROM specs WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("failed to fetch spec")?;

    Ok(spec)
}

/// List the most recent specs with their task counts, newest first.
pub async fn list_spec_summaries(pool: &PgPool, limit: i64) -> Result<Vec<SpecSummary>> {
    let rows = sqlx::query_as::<_, SpecSummary>(
        "SELECT s.id, s.goal, s.template_type, COUNT(t.id) AS task_count, s.created_at \
         FROM specs s \
         LEFT JOIN tasks t ON t.spec_id = s.id \
         GROUP BY s.id \
         ORDER BY s.created_at DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to list specs")?;

    Ok(rows)
}

/// Delete a spec and (via `ON DELETE CASCADE`) all of its tasks.
///
/// Returns `false` when no spec with that ID existed.
pub async fn delete_spec(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM specs WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete spec")?;

    Ok(result.rows_affected() > 0)
}

/// Bump `updated_at` on a spec after its backlog changed.
pub async fn touch_spec<'e, E>(executor: E, id: Uuid) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query("UPDATE specs SET updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .context("failed to touch spec")?;

    Ok(())
}
