//! Request validation for spec creation, task edits, reorder and group.
//!
//! Raw inputs deserialize leniently (every field optional) so that a
//! missing field is reported as a field error rather than a parse failure.
//! Text fields are trimmed before their lengths are checked, and lengths
//! count characters.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use taskgen_db::models::TemplateType;

pub const GOAL_LEN: (usize, usize) = (3, 1000);
pub const USERS_LEN: (usize, usize) = (3, 500);
pub const CONSTRAINTS_MAX: usize = 1000;
pub const TITLE_LEN: (usize, usize) = (3, 500);
pub const DESCRIPTION_MAX: usize = 2000;
pub const GROUP_NAME_LEN: (usize, usize) = (1, 255);

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every field error found in one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("validation failed: {}", summarize(.details))]
pub struct ValidationErrors {
    pub details: Vec<FieldError>,
}

fn summarize(details: &[FieldError]) -> String {
    details
        .iter()
        .map(|d| format!("{}: {}", d.field, d.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.details.iter().any(|d| d.field == field)
    }

    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.details.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }

    /// Trim `value` and check its length. Returns the trimmed text when it
    /// passes, `None` (with an error recorded) otherwise.
    fn text(
        &mut self,
        field: &str,
        label: &str,
        value: &str,
        (min, max): (usize, usize),
    ) -> Option<String> {
        let trimmed = value.trim();
        let len = trimmed.chars().count();
        if len < min {
            if min <= 1 {
                self.push(field, format!("{label} is required"));
            } else {
                self.push(field, format!("{label} must be at least {min} characters"));
            }
            return None;
        }
        if len > max {
            self.push(field, format!("{label} must be at most {max} characters"));
            return None;
        }
        Some(trimmed.to_string())
    }

    fn required_text(
        &mut self,
        field: &str,
        label: &str,
        value: Option<&str>,
        bounds: (usize, usize),
    ) -> Option<String> {
        match value {
            Some(v) => self.text(field, label, v, bounds),
            None => {
                self.push(field, format!("{label} is required"));
                None
            }
        }
    }

    fn task_ids(&mut self, raw: Option<&[String]>) -> Vec<Uuid> {
        let Some(raw) = raw.filter(|ids| !ids.is_empty()) else {
            self.push("taskIds", "At least one task ID required");
            return Vec::new();
        };
        let mut ids = Vec::with_capacity(raw.len());
        for (i, value) in raw.iter().enumerate() {
            match parse_uuid(value) {
                Some(id) => ids.push(id),
                None => self.push(format!("taskIds.{i}"), "Each task ID must be a valid UUID"),
            }
        }
        ids
    }
}

/// Parse a hyphenated UUID. Other textual forms (braced, simple, URN) are
/// rejected.
pub fn parse_uuid(value: &str) -> Option<Uuid> {
    if value.len() != 36 {
        return None;
    }
    Uuid::parse_str(value).ok()
}

// ---------------------------------------------------------------------------
// Spec creation
// ---------------------------------------------------------------------------

/// Raw spec creation request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecInput {
    pub goal: Option<String>,
    pub users: Option<String>,
    pub constraints: Option<String>,
    pub template_type: Option<String>,
}

/// A spec creation request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSpec {
    pub goal: String,
    pub users: String,
    pub constraints: String,
    pub template_type: TemplateType,
}

impl SpecInput {
    pub fn validate(&self) -> Result<ValidSpec, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let goal = errors.required_text("goal", "Goal", self.goal.as_deref(), GOAL_LEN);
        let users = errors.required_text("users", "Users", self.users.as_deref(), USERS_LEN);
        let constraints = errors.text(
            "constraints",
            "Constraints",
            self.constraints.as_deref().unwrap_or(""),
            (0, CONSTRAINTS_MAX),
        );
        let template_type = match self.template_type.as_deref().map(str::parse::<TemplateType>) {
            Some(Ok(t)) => Some(t),
            _ => {
                errors.push(
                    "templateType",
                    "Template type must be web, mobile, or internal",
                );
                None
            }
        };

        match (goal, users, constraints, template_type) {
            (Some(goal), Some(users), Some(constraints), Some(template_type)) => {
                errors.into_result(ValidSpec {
                    goal,
                    users,
                    constraints,
                    template_type,
                })
            }
            _ => Err(errors),
        }
    }
}

// ---------------------------------------------------------------------------
// Task update
// ---------------------------------------------------------------------------

/// Raw partial update of one backlog item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub group_name: Option<String>,
}

impl TaskUpdate {
    /// Trim and check every present field. Absent fields stay absent.
    pub fn validate(&self) -> Result<TaskUpdate, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let title = self
            .title
            .as_deref()
            .and_then(|v| errors.text("title", "Title", v, TITLE_LEN));
        let description = self
            .description
            .as_deref()
            .and_then(|v| errors.text("description", "Description", v, (0, DESCRIPTION_MAX)));
        let group_name = self
            .group_name
            .as_deref()
            .and_then(|v| errors.text("groupName", "Group name", v, GROUP_NAME_LEN));

        errors.into_result(TaskUpdate {
            title,
            description,
            group_name,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.group_name.is_none()
    }
}

// ---------------------------------------------------------------------------
// Reorder / group
// ---------------------------------------------------------------------------

/// Raw reorder request: the complete new order of a backlog.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub task_ids: Option<Vec<String>>,
}

impl ReorderRequest {
    pub fn validate(&self) -> Result<Vec<Uuid>, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let ids = errors.task_ids(self.task_ids.as_deref());
        errors.into_result(ids)
    }
}

/// Raw group request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRequest {
    pub task_ids: Option<Vec<String>>,
    pub group_name: Option<String>,
}

/// A group request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidGroup {
    pub task_ids: Vec<Uuid>,
    pub group_name: String,
}

impl GroupRequest {
    pub fn validate(&self) -> Result<ValidGroup, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let task_ids = errors.task_ids(self.task_ids.as_deref());
        let group_name = errors.required_text(
            "groupName",
            "Group name",
            self.group_name.as_deref(),
            GROUP_NAME_LEN,
        );
        match group_name {
            Some(group_name) => errors.into_result(ValidGroup {
                task_ids,
                group_name,
            }),
            None => Err(errors),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
