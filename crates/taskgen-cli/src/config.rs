//! Configuration file management for taskgen.
//!
//! Provides a TOML-based config file at `~/.config/taskgen/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use taskgen_core::backlog::RuleTables;
use taskgen_db::config::DbConfig;

pub const CORS_ORIGIN_ENV: &str = "TASKGEN_CORS_ORIGIN";
pub const RULES_ENV: &str = "TASKGEN_RULES";

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub generator: GeneratorSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Single allowed CORS origin. Any origin is allowed when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors_origin: Option<String>,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            cors_origin: None,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GeneratorSection {
    /// Replacement rule tables. The built-in tables are used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_path: Option<PathBuf>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the taskgen config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/taskgen` or `~/.config/taskgen`.
/// The platform-specific `dirs::config_dir()` is not used
/// (it returns `~/Library/Application Support` on macOS).
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("taskgen");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("taskgen")
}

/// Return the path to the taskgen config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file at `path`.
pub fn load_config_from(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Load the config file if one exists. A file that exists but does not
/// parse is an error.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    load_config_from(&path).map(Some)
}

/// Serialize and write `config` to `path`, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config_to(config: &ConfigFile, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

pub fn save_config(config: &ConfigFile) -> Result<()> {
    save_config_to(config, &config_path())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct TaskgenConfig {
    pub db_config: DbConfig,
    pub server: ServerSection,
    pub rules_path: Option<PathBuf>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl TaskgenConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `TASKGEN_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - CORS origin: `TASKGEN_CORS_ORIGIN` > `server.cors_origin` > any origin
    /// - Rules: `TASKGEN_RULES` > `generator.rules_path` > built-in tables
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config()?;
        Ok(Self::resolve_with(cli_db_url, file_config))
    }

    pub fn resolve_with(cli_db_url: Option<&str>, file_config: Option<ConfigFile>) -> Self {
        let (file_db_url, mut server, generator) = match file_config {
            Some(cfg) => (Some(cfg.database.url), cfg.server, cfg.generator),
            None => (None, ServerSection::default(), GeneratorSection::default()),
        };

        let db_url = cli_db_url
            .map(str::to_string)
            .or_else(|| env_var(DbConfig::ENV_VAR))
            .or(file_db_url)
            .unwrap_or_else(|| DbConfig::DEFAULT_URL.to_string());

        if let Some(origin) = env_var(CORS_ORIGIN_ENV) {
            server.cors_origin = Some(origin);
        }

        let rules_path = env_var(RULES_ENV)
            .map(PathBuf::from)
            .or(generator.rules_path);

        Self {
            db_config: DbConfig::new(db_url),
            server,
            rules_path,
        }
    }

    /// Load the configured rule tables, or the built-in ones.
    pub fn load_rules(&self, cli_rules: Option<&Path>) -> Result<RuleTables> {
        let path = cli_rules.or(self.rules_path.as_deref());
        RuleTables::load(path).with_context(|| match path {
            Some(p) => format!("failed to load rule tables from {}", p.display()),
            None => "failed to load built-in rule tables".to_string(),
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
