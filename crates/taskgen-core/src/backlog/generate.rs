//! Backlog generation: parsed input + rule tables to ordered backlog items.
//!
//! Pure logic (no I/O). Output depends only on the input and the rule
//! tables, so identical calls produce identical backlogs.

use tracing::debug;
use uuid::Uuid;

use taskgen_db::models::{NewTask, TaskCategory, TemplateType, UNGROUPED};

use super::input::{ParsedInput, parse_input};
use super::rules::{RuleEntry, RuleTables};

/// Everything the generator needs for one backlog.
///
/// Callers validate the text fields first; the generator accepts anything.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorInput<'a> {
    pub spec_id: Uuid,
    pub goal: &'a str,
    pub users: &'a str,
    pub constraints: &'a str,
    pub template_type: TemplateType,
}

/// Accumulates items of one category with consecutive sort orders.
struct ItemSink {
    spec_id: Uuid,
    category: TaskCategory,
    next_order: i32,
    items: Vec<NewTask>,
}

impl ItemSink {
    fn new(spec_id: Uuid, category: TaskCategory, start_order: i32) -> Self {
        Self {
            spec_id,
            category,
            next_order: start_order,
            items: Vec::new(),
        }
    }

    fn push(&mut self, title: String, description: String) {
        self.items.push(NewTask {
            spec_id: self.spec_id,
            category: self.category,
            title,
            description,
            group_name: UNGROUPED.to_string(),
            sort_order: self.next_order,
        });
        self.next_order += 1;
    }

    fn finish(self) -> Vec<NewTask> {
        self.items
    }
}

/// Replace `{name}` placeholders in one pass, so substituted values are
/// never re-expanded. Unknown placeholders are left as written.
fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + 32);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Four stories per role, role-major, starting at `start_order`.
pub fn generate_user_stories(
    rules: &RuleTables,
    spec_id: Uuid,
    parsed: &ParsedInput,
    start_order: i32,
) -> Vec<NewTask> {
    let mut sink = ItemSink::new(spec_id, TaskCategory::UserStory, start_order);

    for role in &parsed.roles {
        let vars = [
            ("role", role.as_str()),
            ("verb", parsed.verb.as_str()),
            ("outcome", parsed.outcome.as_str()),
        ];
        for template in &rules.stories {
            sink.push(
                render_template(&template.title, &vars),
                render_template(&template.description, &vars),
            );
        }
    }

    sink.finish()
}

/// Suffix appended to every engineering task description.
pub fn architecture_suffix(template_type: TemplateType) -> String {
    format!(" This task is part of the {template_type} application architecture.")
}

/// Base engineering tasks followed by the platform's tasks.
pub fn generate_engineering_tasks(
    rules: &RuleTables,
    input: &GeneratorInput<'_>,
    start_order: i32,
) -> Vec<NewTask> {
    let mut sink = ItemSink::new(input.spec_id, TaskCategory::EngineeringTask, start_order);
    let suffix = architecture_suffix(input.template_type);

    let platform = rules.platform_tasks(input.template_type);
    for task in rules.base_tasks.iter().chain(platform) {
        sink.push(task.title.clone(), format!("{}{suffix}", task.description));
    }

    sink.finish()
}

/// Base risks, matched constraint risks (or the fallback), then the
/// platform risk.
pub fn generate_risks(
    rules: &RuleTables,
    input: &GeneratorInput<'_>,
    start_order: i32,
) -> Vec<NewTask> {
    let mut sink = ItemSink::new(input.spec_id, TaskCategory::Risk, start_order);
    let push_entry = |sink: &mut ItemSink, entry: &RuleEntry| {
        sink.push(entry.title.clone(), entry.description.clone());
    };

    for risk in &rules.base_risks {
        push_entry(&mut sink, risk);
    }

    let constraints_lower = input.constraints.to_lowercase();
    let mut matched = false;
    for rule in &rules.constraint_risks {
        if rule.matches(&constraints_lower) {
            matched = true;
            sink.push(rule.title.clone(), rule.description.clone());
        }
    }

    if !matched && !input.constraints.is_empty() {
        push_entry(&mut sink, &rules.fallback_risk);
    }

    if let Some(risk) = rules.platform_risk(input.template_type) {
        push_entry(&mut sink, risk);
    }

    sink.finish()
}

/// Generate the full backlog: stories, then engineering tasks, then risks,
/// with sort orders covering `0..len` without gaps.
pub fn generate_all_tasks(rules: &RuleTables, input: &GeneratorInput<'_>) -> Vec<NewTask> {
    let parsed = parse_input(input.goal, input.users);

    let stories = generate_user_stories(rules, input.spec_id, &parsed, 0);
    let engineering = generate_engineering_tasks(rules, input, stories.len() as i32);
    let risks = generate_risks(
        rules,
        input,
        (stories.len() + engineering.len()) as i32,
    );

    debug!(
        spec_id = %input.spec_id,
        roles = parsed.roles.len(),
        stories = stories.len(),
        engineering = engineering.len(),
        risks = risks.len(),
        "generated backlog"
    );

    let mut all = stories;
    all.extend(engineering);
    all.extend(risks);
    all
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
