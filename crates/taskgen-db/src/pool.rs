//! Connection setup, schema migrations, and health checks.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use tracing::{debug, info};

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/taskgen-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Tables owned by the schema, in the order `table_counts` reports them.
pub const SCHEMA_TABLES: [&str; 2] = ["specs", "tasks"];

const APPLICATION_NAME: &str = "taskgen";
const MAX_CONNECTIONS: u32 = 8;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

fn connect_options(config: &DbConfig) -> Result<PgConnectOptions> {
    let options: PgConnectOptions = config
        .database_url
        .parse()
        .with_context(|| format!("invalid database URL for {}", config.redacted_host()))?;
    Ok(options.application_name(APPLICATION_NAME))
}

/// Open the shared pool used by the CLI commands and the HTTP server.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(connect_options(config)?)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.redacted_host()))?;
    info!(host = config.redacted_host(), "connected to database");
    Ok(pool)
}

/// Apply any pending embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;
    info!("migrations applied successfully");
    Ok(())
}

/// Double-quote an identifier for statements that cannot take bind
/// parameters.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Create the configured database when it is missing.
///
/// Uses a single connection to the `postgres` database on the same server.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<()> {
    let db_name = config
        .database_name()
        .context("could not determine database name from URL")?;

    let mut conn = PgConnection::connect_with(&connect_options(config)?.database("postgres"))
        .await
        .with_context(|| {
            format!("failed to connect to maintenance database on {}", config.redacted_host())
        })?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&mut conn)
            .await
            .context("failed to query pg_database")?;

    if exists {
        debug!(db = db_name, "database already exists");
    } else {
        let stmt = format!("CREATE DATABASE {}", quote_ident(db_name));
        conn.execute(stmt.as_str())
            .await
            .with_context(|| format!("failed to create database {db_name}"))?;
        info!(db = db_name, "database created");
    }

    conn.close().await.context("failed to close maintenance connection")?;
    Ok(())
}

/// Row counts for every table in [`SCHEMA_TABLES`], fetched in one query.
pub async fn table_counts(pool: &PgPool) -> Result<Vec<(String, i64)>> {
    let query = SCHEMA_TABLES
        .iter()
        .map(|t| format!("SELECT '{t}'::text, COUNT(*) FROM {t}"))
        .collect::<Vec<_>>()
        .join(" UNION ALL ");

    let mut counts: Vec<(String, i64)> = sqlx::query_as(&query)
        .fetch_all(pool)
        .await
        .context("failed to count table rows")?;
    counts.sort();
    Ok(counts)
}

/// Round-trip a trivial query and return how long it took.
pub async fn ping(pool: &PgPool) -> Result<Duration> {
    let start = Instant::now();
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .context("database ping failed")?;
    Ok(start.elapsed())
}
