use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Group label carried by every item that has not been assigned a group.
pub const UNGROUPED: &str = "ungrouped";

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Platform type of a spec. Selects which engineering-task and risk rules
/// apply during generation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    Web,
    Mobile,
    Internal,
}

impl TemplateType {
    /// All variants, in declaration order.
    pub const ALL: [TemplateType; 3] = [Self::Web, Self::Mobile, Self::Internal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Mobile => "mobile",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateType {
    type Err = TemplateTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(Self::Web),
            "mobile" => Ok(Self::Mobile),
            "internal" => Ok(Self::Internal),
            other => Err(TemplateTypeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TemplateType`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid template type: {0:?} (expected web, mobile, or internal)")]
pub struct TemplateTypeParseError(pub String);

// ---------------------------------------------------------------------------

/// Category of a backlog item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    UserStory,
    EngineeringTask,
    Risk,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserStory => "user_story",
            Self::EngineeringTask => "engineering_task",
            Self::Risk => "risk",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskCategory {
    type Err = TaskCategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user_story" => Ok(Self::UserStory),
            "engineering_task" => Ok(Self::EngineeringTask),
            "risk" => Ok(Self::Risk),
            other => Err(TaskCategoryParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TaskCategory`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid task category: {0:?}")]
pub struct TaskCategoryParseError(pub String);

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A spec -- the project description a backlog is generated from.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Spec {
    pub id: Uuid,
    pub goal: String,
    pub users: String,
    pub constraints: String,
    pub template_type: TemplateType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored backlog item belonging to a spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub spec_id: Uuid,
    pub category: TaskCategory,
    pub title: String,
    pub description: String,
    pub group_name: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A backlog item that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub spec_id: Uuid,
    pub category: TaskCategory,
    pub title: String,
    pub description: String,
    pub group_name: String,
    pub sort_order: i32,
}

/// Fields accepted when creating a spec row.
#[derive(Debug, Clone)]
pub struct NewSpec<'a> {
    pub goal: &'a str,
    pub users: &'a str,
    pub constraints: &'a str,
    pub template_type: TemplateType,
}

/// Listing row for the spec history view.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SpecSummary {
    pub id: Uuid,
    pub goal: String,
    pub template_type: TemplateType,
    pub task_count: i64,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_type_display_roundtrip() {
        for v in &TemplateType::ALL {
            let parsed: TemplateType = v.to_string().parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn template_type_is_case_sensitive() {
        assert!("Web".parse::<TemplateType>().is_err());
        assert!("desktop".parse::<TemplateType>().is_err());
    }

    #[test]
    fn task_category_display_roundtrip() {
        let variants = [
            TaskCategory::UserStory,
            TaskCategory::EngineeringTask,
            TaskCategory::Risk,
        ];
        for v in &variants {
            let parsed: TaskCategory = v.to_string().parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn task_category_invalid() {
        let err = "epic".parse::<TaskCategory>().unwrap_err();
        assert!(err.to_string().contains("epic"));
    }

    #[test]
    fn task_serializes_camel_case() {
        let task = NewTask {
            spec_id: Uuid::nil(),
            category: TaskCategory::EngineeringTask,
            title: "t".to_string(),
            description: "d".to_string(),
            group_name: UNGROUPED.to_string(),
            sort_order: 3,
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["category"], "engineering_task");
        assert_eq!(json["groupName"], "ungrouped");
        assert_eq!(json["sortOrder"], 3);
        assert!(json.get("spec_id").is_none());
    }
}
