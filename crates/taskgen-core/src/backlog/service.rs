//! Backlog service layer.
//!
//! Each operation that writes runs inside a single database transaction:
//! creating a spec inserts the spec row and its whole generated backlog;
//! reorder and group load the backlog, apply the change in memory, and
//! persist it. A failed or rejected operation leaves storage unchanged.

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use taskgen_db::models::{NewSpec, Spec, SpecSummary, Task};
use taskgen_db::queries::{specs as spec_queries, tasks as task_queries};

use super::generate::{GeneratorInput, generate_all_tasks};
use super::ordering::{GroupError, ReorderError, group_items, reorder_items};
use super::rules::RuleTables;
use super::validate::{SpecInput, TaskUpdate, ValidGroup, ValidSpec, ValidationErrors};
use crate::export::{self, ExportDocument, ExportFormat};

/// Number of specs listed when no usable limit is given.
pub const DEFAULT_LIST_LIMIT: i64 = 5;
/// Upper bound on the number of specs listed at once.
pub const MAX_LIST_LIMIT: i64 = 100;

/// Errors from backlog operations.
#[derive(Debug, Error)]
pub enum BacklogError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Reorder(#[from] ReorderError),

    #[error(transparent)]
    Group(#[from] GroupError),

    #[error("no fields to update")]
    NoFieldsToUpdate,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl BacklogError {
    fn spec_not_found(id: Uuid) -> Self {
        Self::NotFound { kind: "spec", id }
    }

    fn task_not_found(id: Uuid) -> Self {
        Self::NotFound { kind: "task", id }
    }
}

pub type Result<T, E = BacklogError> = std::result::Result<T, E>;

/// A spec together with its backlog in `sort_order` order.
#[derive(Debug, Clone, Serialize)]
pub struct SpecWithTasks {
    #[serde(flatten)]
    pub spec: Spec,
    pub tasks: Vec<Task>,
}

/// Clamp a requested list size to `1..=MAX_LIST_LIMIT`.
///
/// Only the leading integer is read, so `"20abc"` is 20 and `"1.5"` is 1.
/// A missing, non-numeric, or zero limit means [`DEFAULT_LIST_LIMIT`].
pub fn clamp_list_limit(raw: Option<&str>) -> i64 {
    match raw.and_then(leading_integer) {
        None | Some(0) => DEFAULT_LIST_LIMIT,
        Some(n) => n.clamp(1, MAX_LIST_LIMIT),
    }
}

/// Parse an optional sign and the digits that follow it, ignoring leading
/// whitespace and anything after the digits.
fn leading_integer(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    // Saturate huge values; they are clamped anyway.
    let n = rest[..digits].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -n } else { n })
}

/// Validate `input`, then insert the spec and its generated backlog in one
/// transaction.
pub async fn create_spec_with_backlog(
    pool: &PgPool,
    rules: &RuleTables,
    input: &SpecInput,
) -> Result<SpecWithTasks> {
    let valid = input.validate()?;

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let spec = spec_queries::insert_spec(
        &mut *tx,
        &NewSpec {
            goal: &valid.goal,
            users: &valid.users,
            constraints: &valid.constraints,
            template_type: valid.template_type,
        },
    )
    .await?;

    let generated = generate_all_tasks(rules, &generator_input(spec.id, &valid));

    let tasks = task_queries::insert_tasks(&mut *tx, &generated).await?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(spec_id = %spec.id, tasks = tasks.len(), template = %spec.template_type, "created spec");
    Ok(SpecWithTasks { spec, tasks })
}

fn generator_input(spec_id: Uuid, valid: &ValidSpec) -> GeneratorInput<'_> {
    GeneratorInput {
        spec_id,
        goal: &valid.goal,
        users: &valid.users,
        constraints: &valid.constraints,
        template_type: valid.template_type,
    }
}

/// Run the generator without storage.
///
/// The returned spec has a fresh random id and the current time; tasks get
/// fresh ids too. Nothing is persisted.
pub fn preview_backlog(rules: &RuleTables, valid: &ValidSpec) -> SpecWithTasks {
    let now = Utc::now();
    let spec = Spec {
        id: Uuid::new_v4(),
        goal: valid.goal.clone(),
        users: valid.users.clone(),
        constraints: valid.constraints.clone(),
        template_type: valid.template_type,
        created_at: now,
        updated_at: now,
    };

    let tasks = generate_all_tasks(rules, &generator_input(spec.id, valid))
        .into_iter()
        .map(|t| Task {
            id: Uuid::new_v4(),
            spec_id: t.spec_id,
            category: t.category,
            title: t.title,
            description: t.description,
            group_name: t.group_name,
            sort_order: t.sort_order,
            created_at: now,
            updated_at: now,
        })
        .collect();

    SpecWithTasks { spec, tasks }
}

/// Fetch a spec and its backlog.
pub async fn get_spec_with_tasks(pool: &PgPool, spec_id: Uuid) -> Result<SpecWithTasks> {
    let spec = spec_queries::get_spec(pool, spec_id)
        .await?
        .ok_or_else(|| BacklogError::spec_not_found(spec_id))?;

    let tasks = task_queries::list_tasks_for_spec(pool, spec_id).await?;

    Ok(SpecWithTasks { spec, tasks })
}

/// The most recent specs with their task counts, newest first.
pub async fn list_spec_summaries(pool: &PgPool, limit: i64) -> Result<Vec<SpecSummary>> {
    let limit = limit.clamp(1, MAX_LIST_LIMIT);
    Ok(spec_queries::list_spec_summaries(pool, limit).await?)
}

/// Delete a spec and, by cascade, its backlog.
pub async fn delete_spec(pool: &PgPool, spec_id: Uuid) -> Result<()> {
    if !spec_queries::delete_spec(pool, spec_id).await? {
        return Err(BacklogError::spec_not_found(spec_id));
    }
    info!(spec_id = %spec_id, "deleted spec");
    Ok(())
}

/// Apply a partial edit to one backlog item.
pub async fn update_task(pool: &PgPool, task_id: Uuid, update: &TaskUpdate) -> Result<Task> {
    let update = update.validate()?;
    if update.is_empty() {
        return Err(BacklogError::NoFieldsToUpdate);
    }

    let task = task_queries::update_task_fields(
        pool,
        task_id,
        update.title.as_deref(),
        update.description.as_deref(),
        update.group_name.as_deref(),
    )
    .await?
    .ok_or_else(|| BacklogError::task_not_found(task_id))?;

    debug!(task_id = %task_id, "updated task");
    Ok(task)
}

/// Replace a backlog's order. `task_ids` must list every item of the
/// backlog exactly once; item `i` gets `sort_order = i`.
pub async fn reorder_backlog(pool: &PgPool, spec_id: Uuid, task_ids: &[Uuid]) -> Result<Vec<Task>> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    spec_queries::get_spec(&mut *tx, spec_id)
        .await?
        .ok_or_else(|| BacklogError::spec_not_found(spec_id))?;

    let mut tasks = task_queries::list_tasks_for_spec(&mut *tx, spec_id).await?;
    reorder_items(&mut tasks, task_ids)?;

    let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
    let orders: Vec<i32> = tasks.iter().map(|t| t.sort_order).collect();
    task_queries::set_sort_orders(&mut *tx, spec_id, &ids, &orders).await?;
    spec_queries::touch_spec(&mut *tx, spec_id).await?;

    let tasks = task_queries::list_tasks_for_spec(&mut *tx, spec_id).await?;
    tx.commit().await.context("failed to commit transaction")?;

    info!(spec_id = %spec_id, tasks = tasks.len(), "reordered backlog");
    Ok(tasks)
}

/// Assign a group label to some items of a backlog.
pub async fn group_backlog_items(
    pool: &PgPool,
    spec_id: Uuid,
    group: &ValidGroup,
) -> Result<Vec<Task>> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    spec_queries::get_spec(&mut *tx, spec_id)
        .await?
        .ok_or_else(|| BacklogError::spec_not_found(spec_id))?;

    let mut tasks = task_queries::list_tasks_for_spec(&mut *tx, spec_id).await?;
    let count = group_items(&mut tasks, &group.task_ids, &group.group_name)?;

    task_queries::set_group_name(&mut *tx, spec_id, &group.task_ids, &group.group_name).await?;
    spec_queries::touch_spec(&mut *tx, spec_id).await?;

    let tasks = task_queries::list_tasks_for_spec(&mut *tx, spec_id).await?;
    tx.commit().await.context("failed to commit transaction")?;

    info!(spec_id = %spec_id, group = %group.group_name, count, "grouped backlog items");
    Ok(tasks)
}

/// Render a stored spec as a downloadable document.
pub async fn export_spec(pool: &PgPool, spec_id: Uuid, format: ExportFormat) -> Result<ExportDocument> {
    let SpecWithTasks { spec, tasks } = get_spec_with_tasks(pool, spec_id).await?;
    Ok(export::render(&spec, &tasks, format))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
