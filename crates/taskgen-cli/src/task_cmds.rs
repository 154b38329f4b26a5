//! CLI handlers for `taskgen task` subcommands.

use anyhow::Result;
use sqlx::PgPool;

use taskgen_core::backlog::service;
use taskgen_core::backlog::{GroupRequest, ReorderRequest, TaskUpdate};
use taskgen_db::models::Task;

use crate::TaskCommands;
use crate::spec_cmds::parse_id;

/// Dispatch a `TaskCommands` variant to the appropriate handler.
pub async fn run_task_command(command: TaskCommands, pool: &PgPool) -> Result<()> {
    match command {
        TaskCommands::Update {
            task_id,
            title,
            description,
            group,
        } => {
            let update = TaskUpdate {
                title,
                description,
                group_name: group,
            };
            cmd_update(pool, &task_id, &update).await
        }
        TaskCommands::Reorder { spec_id, task_ids } => cmd_reorder(pool, &spec_id, task_ids).await,
        TaskCommands::Group {
            spec_id,
            name,
            task_ids,
        } => cmd_group(pool, &spec_id, name, task_ids).await,
    }
}

async fn cmd_update(pool: &PgPool, task_id: &str, update: &TaskUpdate) -> Result<()> {
    let task_id = parse_id(task_id, "task")?;
    let task = service::update_task(pool, task_id, update).await?;

    println!("Task updated.");
    println!();
    println!("  Task ID:  {}", task.id);
    println!("  Title:    {}", task.title);
    println!("  Group:    {}", task.group_name);
    Ok(())
}

async fn cmd_reorder(pool: &PgPool, spec_id: &str, task_ids: Vec<String>) -> Result<()> {
    let spec_id = parse_id(spec_id, "spec")?;
    let order = ReorderRequest {
        task_ids: Some(task_ids),
    }
    .validate()?;

    let tasks = service::reorder_backlog(pool, spec_id, &order).await?;
    println!("Backlog reordered ({} tasks).", tasks.len());
    print_order(&tasks);
    Ok(())
}

async fn cmd_group(pool: &PgPool, spec_id: &str, name: String, task_ids: Vec<String>) -> Result<()> {
    let spec_id = parse_id(spec_id, "spec")?;
    let group = GroupRequest {
        task_ids: Some(task_ids),
        group_name: Some(name),
    }
    .validate()?;

    let tasks = service::group_backlog_items(pool, spec_id, &group).await?;
    println!(
        "Grouped {} task(s) as {:?}.",
        group.task_ids.len(),
        group.group_name
    );
    print_order(&tasks);
    Ok(())
}

fn print_order(tasks: &[Task]) {
    for task in tasks {
        println!(
            "  {:>3}. {}  [{}] {}",
            task.sort_order, task.id, task.group_name, task.title
        );
    }
}
