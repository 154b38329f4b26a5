//! Generation rule tables.
//!
//! The built-in tables are defined in `rules.toml` and embedded in the binary
//! at compile time. A replacement file with the same schema can be loaded
//! with [`RuleTables::from_path`]. Tables are validated on load and are
//! immutable afterwards; callers share them by reference (or `Arc`).

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use taskgen_db::models::TemplateType;

/// The embedded rule tables TOML.
static BUILTIN_RULES_TOML: &str = include_str!("rules.toml");

/// Number of story templates emitted per role.
pub const STORIES_PER_ROLE: usize = 4;

/// A `{title, description}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuleEntry {
    pub title: String,
    pub description: String,
}

/// A risk emitted when any keyword occurs in the constraints text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConstraintRisk {
    pub keywords: Vec<String>,
    pub title: String,
    pub description: String,
}

impl ConstraintRisk {
    /// True if any keyword is a substring of `constraints_lower`.
    pub fn matches(&self, constraints_lower: &str) -> bool {
        self.keywords
            .iter()
            .any(|kw| constraints_lower.contains(kw.as_str()))
    }
}

/// Per-platform lists of engineering tasks. A missing platform is empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformTasks {
    #[serde(default)]
    pub web: Vec<RuleEntry>,
    #[serde(default)]
    pub mobile: Vec<RuleEntry>,
    #[serde(default)]
    pub internal: Vec<RuleEntry>,
}

/// Per-platform single risk entries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformRisks {
    #[serde(default)]
    pub web: Option<RuleEntry>,
    #[serde(default)]
    pub mobile: Option<RuleEntry>,
    #[serde(default)]
    pub internal: Option<RuleEntry>,
}

/// The full set of rules the generator reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleTables {
    pub stories: Vec<RuleEntry>,
    pub base_tasks: Vec<RuleEntry>,
    #[serde(default)]
    pub platform_tasks: PlatformTasks,
    pub base_risks: Vec<RuleEntry>,
    #[serde(default)]
    pub constraint_risks: Vec<ConstraintRisk>,
    pub fallback_risk: RuleEntry,
    #[serde(default)]
    pub platform_risks: PlatformRisks,
}

/// Errors from loading rule tables.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("failed to read rules file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error in rules: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("expected exactly 4 story templates, found {0}")]
    StoryCount(usize),

    #[error("{table} entry {index} has an empty {field}")]
    EmptyField {
        table: &'static str,
        index: usize,
        field: &'static str,
    },

    #[error("constraint risk {index} ({title:?}) has no usable keywords")]
    NoKeywords { index: usize, title: String },
}

impl RuleTables {
    /// Parse and validate the embedded rule tables.
    pub fn builtin() -> Result<Self, RulesError> {
        Self::from_toml_str(BUILTIN_RULES_TOML)
    }

    /// Parse and validate rule tables from a TOML string.
    ///
    /// Keywords are normalized to lower case so that matching against the
    /// lower-cased constraints text is case-insensitive.
    pub fn from_toml_str(content: &str) -> Result<Self, RulesError> {
        let mut tables: RuleTables = toml::from_str(content)?;
        for risk in &mut tables.constraint_risks {
            for kw in &mut risk.keywords {
                *kw = kw.to_lowercase();
            }
        }
        tables.validate()?;
        Ok(tables)
    }

    /// Read, parse, and validate rule tables from a file.
    pub fn from_path(path: &Path) -> Result<Self, RulesError> {
        let content = std::fs::read_to_string(path).map_err(|source| RulesError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` if given, otherwise the built-in tables.
    pub fn load(path: Option<&Path>) -> Result<Self, RulesError> {
        match path {
            Some(p) => Self::from_path(p),
            None => Self::builtin(),
        }
    }

    /// Engineering tasks specific to a platform.
    pub fn platform_tasks(&self, template_type: TemplateType) -> &[RuleEntry] {
        match template_type {
            TemplateType::Web => &self.platform_tasks.web,
            TemplateType::Mobile => &self.platform_tasks.mobile,
            TemplateType::Internal => &self.platform_tasks.internal,
        }
    }

    /// The risk appended for a platform, if one is defined.
    pub fn platform_risk(&self, template_type: TemplateType) -> Option<&RuleEntry> {
        match template_type {
            TemplateType::Web => self.platform_risks.web.as_ref(),
            TemplateType::Mobile => self.platform_risks.mobile.as_ref(),
            TemplateType::Internal => self.platform_risks.internal.as_ref(),
        }
    }

    fn validate(&self) -> Result<(), RulesError> {
        if self.stories.len() != STORIES_PER_ROLE {
            return Err(RulesError::StoryCount(self.stories.len()));
        }

        check_entries("stories", &self.stories)?;
        check_entries("base_tasks", &self.base_tasks)?;
        check_entries("platform_tasks.web", &self.platform_tasks.web)?;
        check_entries("platform_tasks.mobile", &self.platform_tasks.mobile)?;
        check_entries("platform_tasks.internal", &self.platform_tasks.internal)?;
        check_entries("base_risks", &self.base_risks)?;
        check_entries("fallback_risk", std::slice::from_ref(&self.fallback_risk))?;
        for (table, risk) in [
            ("platform_risks.web", &self.platform_risks.web),
            ("platform_risks.mobile", &self.platform_risks.mobile),
            ("platform_risks.internal", &self.platform_risks.internal),
        ] {
            if let Some(entry) = risk {
                check_entries(table, std::slice::from_ref(entry))?;
            }
        }

        for (index, risk) in self.constraint_risks.iter().enumerate() {
            for (field, value) in [("title", &risk.title), ("description", &risk.description)] {
                if value.trim().is_empty() {
                    return Err(RulesError::EmptyField {
                        table: "constraint_risks",
                        index,
                        field,
                    });
                }
            }
            // An empty keyword would match any non-empty constraints text.
            if risk.keywords.is_empty() || risk.keywords.iter().any(|k| k.is_empty()) {
                return Err(RulesError::NoKeywords {
                    index,
                    title: risk.title.clone(),
                });
            }
        }

        Ok(())
    }
}

fn check_entries(table: &'static str, entries: &[RuleEntry]) -> Result<(), RulesError> {
    for (index, entry) in entries.iter().enumerate() {
        if entry.title.trim().is_empty() {
            return Err(RulesError::EmptyField {
                table,
                index,
                field: "title",
            });
        }
        if entry.description.trim().is_empty() {
            return Err(RulesError::EmptyField {
                table,
                index,
                field: "description",
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
