//! `taskgen status` command: database connectivity and stored counts.

use anyhow::Result;

use taskgen_db::config::DbConfig;
use taskgen_db::pool;

/// Connect, ping, and print per-table row counts.
///
/// A failed connection is reported, not propagated, so the command still
/// prints which database it tried.
pub async fn run_status(db_config: &DbConfig) -> Result<()> {
    println!("Database: {}", db_config.redacted_host());

    let db_pool = match pool::create_pool(db_config).await {
        Ok(p) => p,
        Err(e) => {
            println!("  status:  disconnected");
            println!("  error:   {e:#}");
            return Ok(());
        }
    };

    let result = async {
        let latency = pool::ping(&db_pool).await?;
        let counts = pool::table_counts(&db_pool).await?;
        anyhow::Ok((latency, counts))
    }
    .await;
    db_pool.close().await;

    match result {
        Ok((latency, counts)) => {
            println!("  status:  connected");
            println!("  latency: {} ms", latency.as_millis());
            println!();
            println!("Tables:");
            for (table, count) in &counts {
                println!("  {table}: {count} rows");
            }
        }
        Err(e) => {
            println!("  status:  disconnected");
            println!("  error:   {e:#}");
        }
    }
    Ok(())
}
