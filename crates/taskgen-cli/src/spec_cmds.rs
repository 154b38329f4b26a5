//! CLI handlers for `taskgen spec` subcommands.
//!
//! Implements:
//! - `taskgen spec create --goal .. --users .. --template ..` -- generate and store a backlog
//! - `taskgen spec show [spec-id] [--limit N]`              -- show one spec or list recent ones
//! - `taskgen spec delete <spec-id>`                         -- delete a spec and its backlog
//! - `taskgen spec export <spec-id> [--format] [--output]`   -- render a spec as a document

use std::path::Path;

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use taskgen_core::backlog::service::{self, clamp_list_limit};
use taskgen_core::backlog::validate::parse_uuid;
use taskgen_core::backlog::{RuleTables, SpecInput, SpecWithTasks};
use taskgen_core::export::ExportFormat;
use taskgen_db::models::{SpecSummary, UNGROUPED};

use crate::{SpecArgs, SpecCommands};

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `SpecCommands` variant to the appropriate handler.
pub async fn run_spec_command(
    command: SpecCommands,
    pool: &PgPool,
    rules: &RuleTables,
) -> Result<()> {
    match command {
        SpecCommands::Create { input } => cmd_create(pool, rules, &input).await,
        SpecCommands::Show { spec_id, limit } => match spec_id {
            Some(id) => cmd_show_one(pool, &id).await,
            None => cmd_show_all(pool, limit.as_deref()).await,
        },
        SpecCommands::Delete { spec_id } => cmd_delete(pool, &spec_id).await,
        SpecCommands::Export {
            spec_id,
            format,
            output,
        } => cmd_export(pool, &spec_id, format, output.as_deref()).await,
    }
}

/// Parse an ID argument, accepting only the hyphenated UUID form.
pub fn parse_id(raw: &str, kind: &str) -> Result<Uuid> {
    parse_uuid(raw).with_context(|| format!("invalid {kind} ID: {raw:?}"))
}

impl From<&SpecArgs> for SpecInput {
    fn from(args: &SpecArgs) -> Self {
        SpecInput {
            goal: Some(args.goal.clone()),
            users: Some(args.users.clone()),
            constraints: Some(args.constraints.clone()),
            template_type: Some(args.template.clone()),
        }
    }
}

// -----------------------------------------------------------------------
// taskgen spec create
// -----------------------------------------------------------------------

async fn cmd_create(pool: &PgPool, rules: &RuleTables, args: &SpecArgs) -> Result<()> {
    let created = service::create_spec_with_backlog(pool, rules, &SpecInput::from(args)).await?;

    println!("Spec created successfully.");
    println!();
    println!("  Spec ID:   {}", created.spec.id);
    println!("  Goal:      {}", created.spec.goal);
    println!("  Template:  {}", created.spec.template_type);
    println!("  Tasks:     {}", created.tasks.len());

    Ok(())
}

// -----------------------------------------------------------------------
// taskgen spec show (list recent)
// -----------------------------------------------------------------------

async fn cmd_show_all(pool: &PgPool, limit: Option<&str>) -> Result<()> {
    let specs = service::list_spec_summaries(pool, clamp_list_limit(limit)).await?;

    if specs.is_empty() {
        println!("No specs found. Use `taskgen spec create` to create one.");
        return Ok(());
    }

    print!("{}", format_summaries(&specs));
    Ok(())
}

fn format_summaries(specs: &[SpecSummary]) -> String {
    // UUIDs are 36 chars; the longest template name is 8 (internal).
    let id_w = 36;
    let goal_w = specs
        .iter()
        .map(|s| s.goal.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);
    let template_w = 8;
    let tasks_w = 5;

    let mut out = format!(
        "{:<id_w$}  {:<goal_w$}  {:<template_w$}  {:>tasks_w$}  CREATED\n",
        "ID", "GOAL", "TEMPLATE", "TASKS",
    );
    for spec in specs {
        let created = spec.created_at.format("%Y-%m-%d %H:%M");
        out.push_str(&format!(
            "{:<id_w$}  {:<goal_w$}  {:<template_w$}  {:>tasks_w$}  {}\n",
            spec.id,
            spec.goal,
            spec.template_type.as_str(),
            spec.task_count,
            created,
        ));
    }
    out
}

// -----------------------------------------------------------------------
// taskgen spec show <spec-id>
// -----------------------------------------------------------------------

async fn cmd_show_one(pool: &PgPool, spec_id: &str) -> Result<()> {
    let spec_id = parse_id(spec_id, "spec")?;
    let spec = service::get_spec_with_tasks(pool, spec_id).await?;
    print!("{}", format_spec(&spec));
    Ok(())
}

fn format_spec(data: &SpecWithTasks) -> String {
    let spec = &data.spec;
    let constraints = if spec.constraints.is_empty() {
        "None"
    } else {
        spec.constraints.as_str()
    };

    let mut out = String::new();
    out.push_str(&format!("Spec: {}\n", spec.goal));
    out.push_str(&format!("  ID:           {}\n", spec.id));
    out.push_str(&format!("  Template:     {}\n", spec.template_type));
    out.push_str(&format!("  Users:        {}\n", spec.users));
    out.push_str(&format!("  Constraints:  {constraints}\n"));
    out.push_str(&format!(
        "  Created:      {}\n",
        spec.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("  Tasks:        {}\n", data.tasks.len()));

    if data.tasks.is_empty() {
        return out;
    }

    out.push_str("\nTasks:\n\n");
    for task in &data.tasks {
        out.push_str(&format!(
            "  {:>3}. [{}] {}\n",
            task.sort_order, task.category, task.title
        ));
        out.push_str(&format!("       ID:    {}\n", task.id));
        if task.group_name != UNGROUPED {
            out.push_str(&format!("       Group: {}\n", task.group_name));
        }
    }
    out
}

// -----------------------------------------------------------------------
// taskgen spec delete <spec-id>
// -----------------------------------------------------------------------

async fn cmd_delete(pool: &PgPool, spec_id: &str) -> Result<()> {
    let spec_id = parse_id(spec_id, "spec")?;
    service::delete_spec(pool, spec_id).await?;
    println!("Spec {spec_id} deleted.");
    Ok(())
}

// -----------------------------------------------------------------------
// taskgen spec export <spec-id>
// -----------------------------------------------------------------------

async fn cmd_export(
    pool: &PgPool,
    spec_id: &str,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let spec_id = parse_id(spec_id, "spec")?;
    let doc = service::export_spec(pool, spec_id, format).await?;

    match output {
        Some(path) => {
            std::fs::write(path, &doc.body)
                .with_context(|| format!("failed to write export to {}", path.display()))?;
            eprintln!("Exported spec {spec_id} ({format}) to {}", path.display());
        }
        None => println!("{}", doc.body),
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use taskgen_db::models::{Spec, Task, TaskCategory, TemplateType};

    use super::*;

    fn sample() -> SpecWithTasks {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let spec = Spec {
            id: Uuid::nil(),
            goal: "Build a homework tracker".into(),
            users: "students".into(),
            constraints: String::new(),
            template_type: TemplateType::Web,
            created_at: at,
            updated_at: at,
        };
        let task = |order: i32, category, title: &str, group: &str| Task {
            id: Uuid::nil(),
            spec_id: spec.id,
            category,
            title: title.into(),
            description: "d".into(),
            group_name: group.into(),
            sort_order: order,
            created_at: at,
            updated_at: at,
        };
        let tasks = vec![
            task(0, TaskCategory::UserStory, "As a student, I want it", UNGROUPED),
            task(1, TaskCategory::Risk, "Scope creep", "MVP"),
        ];
        SpecWithTasks { spec, tasks }
    }

    #[test]
    fn parse_id_requires_hyphenated_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "spec").unwrap(), id);

        let err = parse_id(&id.simple().to_string(), "spec").unwrap_err();
        assert!(err.to_string().starts_with("invalid spec ID"));
    }

    #[test]
    fn spec_args_map_to_input() {
        let args = SpecArgs {
            goal: "Ship it".into(),
            users: "admins".into(),
            constraints: String::new(),
            template: "internal".into(),
        };
        let valid = SpecInput::from(&args).validate().unwrap();
        assert_eq!(valid.template_type, TemplateType::Internal);
        assert_eq!(valid.constraints, "");
    }

    #[test]
    fn format_spec_shows_groups_only_when_set() {
        let text = format_spec(&sample());
        assert!(text.starts_with("Spec: Build a homework tracker\n"));
        assert!(text.contains("  Constraints:  None\n"));
        assert!(text.contains("  Created:      2026-03-01 09:30:00 UTC\n"));
        assert!(text.contains("    0. [user_story] As a student, I want it\n"));
        assert_eq!(text.matches("Group:").count(), 1);
        assert!(text.contains("       Group: MVP\n"));
    }

    #[test]
    fn summaries_are_aligned() {
        let data = sample();
        let rows = vec![SpecSummary {
            id: data.spec.id,
            goal: data.spec.goal.clone(),
            template_type: TemplateType::Mobile,
            task_count: 25,
            created_at: data.spec.created_at,
        }];
        let table = format_summaries(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ID  "));
        assert!(lines[1].contains("mobile"));
        assert!(lines[1].ends_with("   25  2026-03-01 09:30"));
        assert_eq!(lines[0].find("GOAL"), lines[1].find("Build"));
    }
}
