//! Rendering a stored backlog as a Markdown or plain-text document.
//!
//! Items are partitioned by category (stories, engineering tasks, risks)
//! and each section is numbered from 1 in backlog order. Empty sections are
//! omitted. Group labels are shown for stories and engineering tasks unless
//! the item is still ungrouped; risks never carry one.

use std::fmt;
use std::str::FromStr;

use chrono::SecondsFormat;

use taskgen_db::models::{Spec, Task, TaskCategory, UNGROUPED};

const FOOTER: &str = "Generated by Tasks Generator";

/// Output format of an exported backlog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Markdown,
    Text,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Text => "text",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Text => "txt",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Markdown => "text/markdown",
            Self::Text => "text/plain",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportFormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "markdown" => Ok(Self::Markdown),
            "text" => Ok(Self::Text),
            other => Err(ExportFormatParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`ExportFormat`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Format must be 'markdown' or 'text'")]
pub struct ExportFormatParseError(pub String);

/// A rendered export, ready to be written to a file or sent as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

/// Render `spec` and its tasks in the requested format.
///
/// `tasks` must already be in backlog order.
pub fn render(spec: &Spec, tasks: &[Task], format: ExportFormat) -> ExportDocument {
    let body = match format {
        ExportFormat::Markdown => render_markdown(spec, tasks),
        ExportFormat::Text => render_text(spec, tasks),
    };
    ExportDocument {
        filename: format!("spec-{}.{}", spec.id, format.extension()),
        content_type: format.content_type(),
        body,
    }
}

struct Sections<'a> {
    stories: Vec<&'a Task>,
    engineering: Vec<&'a Task>,
    risks: Vec<&'a Task>,
}

impl<'a> Sections<'a> {
    fn partition(tasks: &'a [Task]) -> Self {
        let of = |category: TaskCategory| -> Vec<&'a Task> {
            tasks.iter().filter(|t| t.category == category).collect()
        };
        Self {
            stories: of(TaskCategory::UserStory),
            engineering: of(TaskCategory::EngineeringTask),
            risks: of(TaskCategory::Risk),
        }
    }
}

fn group_label(task: &Task) -> Option<&str> {
    (task.group_name != UNGROUPED).then_some(task.group_name.as_str())
}

fn constraints_or_none(spec: &Spec) -> &str {
    if spec.constraints.is_empty() {
        "None"
    } else {
        &spec.constraints
    }
}

fn created(spec: &Spec) -> String {
    spec.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------------
// Markdown
// ---------------------------------------------------------------------------

pub fn render_markdown(spec: &Spec, tasks: &[Task]) -> String {
    let sections = Sections::partition(tasks);
    let mut lines: Vec<String> = vec![
        format!("# {}", spec.goal),
        String::new(),
        format!("**Template:** {}", spec.template_type),
        format!("**Users:** {}", spec.users),
        format!("**Constraints:** {}", constraints_or_none(spec)),
        format!("**Created:** {}", created(spec)),
        String::new(),
    ];

    markdown_section(&mut lines, "User Stories", &sections.stories, true);
    markdown_section(&mut lines, "Engineering Tasks", &sections.engineering, true);
    markdown_section(&mut lines, "Risks & Unknowns", &sections.risks, false);

    lines.push("---".to_string());
    lines.push(format!("*{FOOTER}*"));
    lines.join("\n")
}

fn markdown_section(lines: &mut Vec<String>, heading: &str, items: &[&Task], show_groups: bool) {
    if items.is_empty() {
        return;
    }
    lines.push(format!("## {heading}"));
    lines.push(String::new());
    for (i, task) in items.iter().enumerate() {
        lines.push(format!("### {}. {}", i + 1, task.title));
        lines.push(String::new());
        lines.push(task.description.clone());
        if let Some(group) = group_label(task).filter(|_| show_groups) {
            lines.push(format!("> Group: {group}"));
        }
        lines.push(String::new());
    }
}

// ---------------------------------------------------------------------------
// Plain text
// ---------------------------------------------------------------------------

pub fn render_text(spec: &Spec, tasks: &[Task]) -> String {
    let sections = Sections::partition(tasks);
    let rule = "=".repeat(60);
    let mut lines: Vec<String> = vec![
        format!("SPEC: {}", spec.goal),
        format!("Template: {}", spec.template_type),
        format!("Users: {}", spec.users),
        format!("Constraints: {}", constraints_or_none(spec)),
        format!("Created: {}", created(spec)),
        String::new(),
        rule.clone(),
    ];

    // Only the stories section is preceded by a blank line.
    if !sections.stories.is_empty() {
        lines.push(String::new());
    }
    text_section(&mut lines, "USER STORIES", &sections.stories, true);
    text_section(&mut lines, "ENGINEERING TASKS", &sections.engineering, true);
    text_section(&mut lines, "RISKS & UNKNOWNS", &sections.risks, false);

    lines.push(rule);
    lines.push(FOOTER.to_string());
    lines.join("\n")
}

fn text_section(lines: &mut Vec<String>, heading: &str, items: &[&Task], show_groups: bool) {
    if items.is_empty() {
        return;
    }
    lines.push(heading.to_string());
    lines.push("-".repeat(40));
    for (i, task) in items.iter().enumerate() {
        lines.push(format!("  {}. {}", i + 1, task.title));
        lines.push(format!("     {}", task.description));
        if let Some(group) = group_label(task).filter(|_| show_groups) {
            lines.push(format!("     [Group: {group}]"));
        }
        lines.push(String::new());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use taskgen_db::models::TemplateType;
    use uuid::Uuid;

    fn spec(constraints: &str) -> Spec {
        let created = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        Spec {
            id: Uuid::nil(),
            goal: "Build a homework tracker".into(),
            users: "students".into(),
            constraints: constraints.into(),
            template_type: TemplateType::Web,
            created_at: created,
            updated_at: created,
        }
    }

    fn task(category: TaskCategory, title: &str, group: &str, order: i32) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            spec_id: Uuid::nil(),
            category,
            title: title.into(),
            description: format!("{title} details"),
            group_name: group.into(),
            sort_order: order,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn format_parsing() {
        assert_eq!("markdown".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert_eq!("text".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        let err = "pdf".parse::<ExportFormat>().unwrap_err();
        assert_eq!(err.to_string(), "Format must be 'markdown' or 'text'");
    }

    #[test]
    fn markdown_full_document() {
        let tasks = vec![
            task(TaskCategory::UserStory, "Story", "MVP", 0),
            task(TaskCategory::EngineeringTask, "Eng", UNGROUPED, 1),
            task(TaskCategory::Risk, "Risk", "MVP", 2),
        ];
        let out = render_markdown(&spec(""), &tasks);
        let expected = "\
# Build a homework tracker

**Template:** web
**Users:** students
**Constraints:** None
**Created:** 2026-03-14T09:26:53.000Z

## User Stories

### 1. Story

Story details
> Group: MVP

## Engineering Tasks

### 1. Eng

Eng details

## Risks & Unknowns

### 1. Risk

Risk details

---
*Generated by Tasks Generator*";
        assert_eq!(out, expected);
    }

    #[test]
    fn markdown_omits_empty_sections() {
        let tasks = vec![task(TaskCategory::Risk, "Only risk", UNGROUPED, 0)];
        let out = render_markdown(&spec("GDPR"), &tasks);
        assert!(out.contains("**Constraints:** GDPR"));
        assert!(!out.contains("## User Stories"));
        assert!(!out.contains("## Engineering Tasks"));
        assert!(out.contains("## Risks & Unknowns"));
    }

    #[test]
    fn text_full_document() {
        let tasks = vec![
            task(TaskCategory::UserStory, "Story", UNGROUPED, 0),
            task(TaskCategory::EngineeringTask, "Eng", "Sprint 2", 1),
            task(TaskCategory::Risk, "Risk", "Sprint 2", 2),
        ];
        let out = render_text(&spec("offline"), &tasks);
        let eq = "=".repeat(60);
        let dash = "-".repeat(40);
        let expected = format!(
            "SPEC: Build a homework tracker
Template: web
Users: students
Constraints: offline
Created: 2026-03-14T09:26:53.000Z

{eq}

USER STORIES
{dash}
  1. Story
     Story details

ENGINEERING TASKS
{dash}
  1. Eng
     Eng details
     [Group: Sprint 2]

RISKS & UNKNOWNS
{dash}
  1. Risk
     Risk details

{eq}
Generated by Tasks Generator"
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn text_without_stories_has_no_leading_blank() {
        let tasks = vec![task(TaskCategory::EngineeringTask, "Eng", UNGROUPED, 0)];
        let out = render_text(&spec(""), &tasks);
        let eq = "=".repeat(60);
        assert!(out.contains(&format!("{eq}\nENGINEERING TASKS\n")));
    }

    #[test]
    fn numbering_restarts_per_section() {
        let tasks = vec![
            task(TaskCategory::UserStory, "S1", UNGROUPED, 0),
            task(TaskCategory::UserStory, "S2", UNGROUPED, 1),
            task(TaskCategory::EngineeringTask, "E1", UNGROUPED, 2),
        ];
        let out = render_markdown(&spec(""), &tasks);
        assert!(out.contains("### 2. S2"));
        assert!(out.contains("### 1. E1"));
    }

    #[test]
    fn document_metadata() {
        let doc = render(&spec(""), &[], ExportFormat::Text);
        assert_eq!(
            doc.filename,
            "spec-00000000-0000-0000-0000-000000000000.txt"
        );
        assert_eq!(doc.content_type, "text/plain");

        let doc = render(&spec(""), &[], ExportFormat::Markdown);
        assert!(doc.filename.ends_with(".md"));
        assert_eq!(doc.content_type, "text/markdown");
    }
}
