mod config;
mod generate_cmd;
mod serve_cmd;
mod spec_cmds;
mod status_cmd;
mod task_cmds;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use taskgen_core::export::ExportFormat;
use taskgen_db::config::DbConfig;
use taskgen_db::pool;

use config::TaskgenConfig;
use generate_cmd::OutputFormat;

#[derive(Parser)]
#[command(name = "taskgen", about = "Turn a feature idea into a prioritized backlog")]
struct Cli {
    /// Database URL (overrides TASKGEN_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a taskgen config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = DbConfig::DEFAULT_URL)]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the taskgen database (requires config file or env vars)
    DbInit,
    /// Generate a backlog and print it without storing anything
    Generate {
        #[command(flatten)]
        input: SpecArgs,
        /// Replacement rule tables (TOML)
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
    },
    /// Stored spec management
    Spec {
        #[command(subcommand)]
        command: SpecCommands,
    },
    /// Backlog item editing
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Run the HTTP API
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Show database connectivity and stored spec counts
    Status,
    /// Print shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Feature request fields shared by `generate` and `spec create`.
#[derive(clap::Args, Debug, Clone)]
pub struct SpecArgs {
    /// What the feature should achieve
    #[arg(long)]
    pub goal: String,
    /// Who will use it (comma-separated roles)
    #[arg(long)]
    pub users: String,
    /// Constraints such as budget, deadlines, or compliance
    #[arg(long, default_value = "")]
    pub constraints: String,
    /// Project template: web, mobile, or internal
    #[arg(long)]
    pub template: String,
}

#[derive(Subcommand)]
pub enum SpecCommands {
    /// Generate a backlog and store it
    Create {
        #[command(flatten)]
        input: SpecArgs,
    },
    /// Show a spec with its backlog (or list recent specs)
    Show {
        /// Spec ID to show (omit to list recent specs)
        spec_id: Option<String>,
        /// Number of specs to list
        #[arg(long)]
        limit: Option<String>,
    },
    /// Delete a spec and its backlog
    Delete {
        /// Spec ID to delete
        spec_id: String,
    },
    /// Export a spec as Markdown or plain text
    Export {
        /// Spec ID to export
        spec_id: String,
        /// Export format: markdown or text
        #[arg(long, default_value_t = ExportFormat::Markdown)]
        format: ExportFormat,
        /// Output file path (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Edit a backlog item
    Update {
        /// Task ID to edit
        task_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Group label
        #[arg(long)]
        group: Option<String>,
    },
    /// Reorder a backlog (every task ID, in the new order)
    Reorder {
        /// Spec owning the backlog
        spec_id: String,
        /// Task IDs in their new order
        #[arg(required = true)]
        task_ids: Vec<String>,
    },
    /// Put backlog items into a named group
    Group {
        /// Spec owning the backlog
        spec_id: String,
        /// Group label
        #[arg(long)]
        name: String,
        /// Task IDs to group
        #[arg(required = true)]
        task_ids: Vec<String>,
    },
}

/// Execute the `taskgen init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        server: config::ServerSection::default(),
        generator: config::GeneratorSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  server.bind  = {}", cfg.server.bind);
    println!("  server.port  = {}", cfg.server.port);
    println!();
    println!("Next: run `taskgen db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `taskgen db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = TaskgenConfig::resolve(cli_db_url)?;

    println!(
        "Initializing taskgen database on {}...",
        resolved.db_config.redacted_host()
    );

    pool::ensure_database_exists(&resolved.db_config).await?;

    let db_pool = pool::create_pool(&resolved.db_config).await?;
    let result = async {
        pool::run_migrations(&db_pool).await?;
        pool::table_counts(&db_pool).await
    }
    .await;
    db_pool.close().await;
    let counts = result?;

    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }
    println!("taskgen db-init complete.");
    Ok(())
}

fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so exported documents on stdout stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Generate {
            input,
            rules,
            format,
        } => {
            let resolved = TaskgenConfig::resolve(cli.database_url.as_deref())?;
            let rules = resolved.load_rules(rules.as_deref())?;
            let output = generate_cmd::run_generate(&rules, &input, format)?;
            print!("{output}");
        }
        Commands::Spec { command } => {
            let resolved = TaskgenConfig::resolve(cli.database_url.as_deref())?;
            let rules = resolved.load_rules(None)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = spec_cmds::run_spec_command(command, &db_pool, &rules).await;
            db_pool.close().await;
            result?;
        }
        Commands::Task { command } => {
            let resolved = TaskgenConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = task_cmds::run_task_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Serve { bind, port } => {
            let mut resolved = TaskgenConfig::resolve(cli.database_url.as_deref())?;
            if let Some(bind) = bind {
                resolved.server.bind = bind;
            }
            if let Some(port) = port {
                resolved.server.port = port;
            }
            let rules = resolved.load_rules(None)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = serve_cmd::run_serve(db_pool.clone(), rules, &resolved.server).await;
            db_pool.close().await;
            result?;
        }
        Commands::Status => {
            let resolved = TaskgenConfig::resolve(cli.database_url.as_deref())?;
            status_cmd::run_status(&resolved.db_config).await?;
        }
        Commands::Completions { shell } => {
            cmd_completions(shell);
        }
    }

    Ok(())
}
