//! Database query functions for the `tasks` table.

use anyhow::{Context, Result};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{NewTask, Task};

/// Insert a whole backlog in one statement. Returns the stored rows in
/// `sort_order` order.
pub async fn insert_tasks<'e, E>(executor: E, tasks: &[NewTask]) -> Result<Vec<Task>>
where
    E: PgExecutor<'e>,
{
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    let spec_ids: Vec<Uuid> = tasks.iter().map(|t| t.spec_id).collect();
    let categories: Vec<&str> = tasks.iter().map(|t| t.category.as_str()).collect();
    let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
    let descriptions: Vec<&str> = tasks.iter().map(|t| t.description.as_str()).collect();
    let groups: Vec<&str> = tasks.iter().map(|t| t.group_name.as_str()).collect();
    let orders: Vec<i32> = tasks.iter().map(|t| t.sort_order).collect();

    let mut rows = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (spec_id, category, title, description, group_name, sort_order) \
         SELECT * FROM UNNEST($1::uuid[], $2::text[], $3::text[], $4::text[], $5::text[], $6::int4[]) \
         RETURNING *",
    )
    .bind(&spec_ids)
    .bind(&categories)
    .bind(&titles)
    .bind(&descriptions)
    .bind(&groups)
    .bind(&orders)
    .fetch_all(executor)
    .await
    .with_context(|| format!("failed to insert {} tasks", tasks.len()))?;

    // RETURNING order is not guaranteed.
    rows.sort_by_key(|t| (t.spec_id, t.sort_order));
    Ok(rows)
}

/// List all tasks for a spec in backlog order.
pub async fn list_tasks_for_spec<'e, E>(executor: E, spec_id: Uuid) -> Result<Vec<Task>>
where
    E: PgExecutor<'e>,
{
    let tasks = sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks WHERE spec_id = $1 ORDER BY sort_order ASC",
    )
    .bind(spec_id)
    .fetch_all(executor)
    .await
    .context("failed to list tasks for spec")?;

    Ok(tasks)
}

/// Partially update a task's editable fields. `None` leaves a field as is.
///
/// Returns `None` when no task with that ID exists.
pub async fn update_task_fields<'e, E>(
    executor: E,
    id: Uuid,
    title: Option<&str>,
    description: Option<&str>,
    group_name: Option<&str>,
) -> Result<Option<Task>>
where
    E: PgExecutor<'e>,
{
    let task = sqlx::query_as::<_, Task>(
        "UPDATE tasks \
         SET title = COALESCE($1, title), \
             description = COALESCE($2, description), \
             group_name = COALESCE($3, group_name), \
             updated_at = now() \
         WHERE id = $4 \
         RETURNING *",
    )
    .bind(title)
    .bind(description)
    .bind(group_name)
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("failed to update task")?;

    Ok(task)
}

/// Assign `sort_orders[i]` to `ids[i]` for tasks of `spec_id` in one
/// statement. Returns the number of rows updated.
///
/// The `(spec_id, sort_order)` unique constraint is deferred, so callers
/// permuting positions must run this inside a transaction.
pub async fn set_sort_orders<'e, E>(
    executor: E,
    spec_id: Uuid,
    ids: &[Uuid],
    sort_orders: &[i32],
) -> Result<u64>
where
    E: PgExecutor<'e>,
{
    anyhow::ensure!(
        ids.len() == sort_orders.len(),
        "ids and sort orders differ in length ({} vs {})",
        ids.len(),
        sort_orders.len()
    );

    let result = sqlx::query(
        "UPDATE tasks AS t \
         SET sort_order = v.sort_order, updated_at = now() \
         FROM UNNEST($1::uuid[], $2::int4[]) AS v(id, sort_order) \
         WHERE t.id = v.id AND t.spec_id = $3",
    )
    .bind(ids)
    .bind(sort_orders)
    .bind(spec_id)
    .execute(executor)
    .await
    .context("failed to update task sort orders")?;

    Ok(result.rows_affected())
}

/// Set `group_name` on the given tasks of `spec_id`. Returns the number of
/// rows updated.
pub async fn set_group_name<'e, E>(
    executor: E,
    spec_id: Uuid,
    ids: &[Uuid],
    group_name: &str,
) -> Result<u64>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE tasks \
         SET group_name = $1, updated_at = now() \
         WHERE spec_id = $2 AND id = ANY($3)",
    )
    .bind(group_name)
    .bind(spec_id)
    .bind(ids)
    .execute(executor)
    .await
    .context("failed to update task groups")?;

    Ok(result.rows_affected())
}
