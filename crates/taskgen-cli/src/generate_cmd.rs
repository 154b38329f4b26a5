//! `taskgen generate`: run the generator without a database.

use anyhow::{Context, Result};
use clap::ValueEnum;

use taskgen_core::backlog::service::preview_backlog;
use taskgen_core::backlog::{RuleTables, SpecInput};
use taskgen_core::export::{render_markdown, render_text};

use crate::SpecArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Markdown,
    Text,
    Json,
}

/// Validate the request, generate a backlog, and render it.
///
/// Nothing is persisted, so spec and task IDs are fresh on every run.
pub fn run_generate(rules: &RuleTables, args: &SpecArgs, format: OutputFormat) -> Result<String> {
    let valid = SpecInput::from(args).validate()?;
    let preview = preview_backlog(rules, &valid);
    tracing::debug!(tasks = preview.tasks.len(), "generated preview backlog");

    let mut out = match format {
        OutputFormat::Markdown => render_markdown(&preview.spec, &preview.tasks),
        OutputFormat::Text => render_text(&preview.spec, &preview.tasks),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&preview).context("failed to serialize backlog")?
        }
    };
    out.push('\n');
    Ok(out)
}
