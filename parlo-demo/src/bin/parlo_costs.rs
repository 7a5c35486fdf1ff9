//! Daily Cost Monitor
//!
//! Sums today's estimated demo costs, applies the warning/pause threshold
//! logic, and prints usage stats. Meant to run from cron every few minutes:
//!
//! ```bash
//! parlo-costs [--data-dir <dir>]
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::info;

use parlo_common::config::{ensure_data_dir, resolve_data_dir};
use parlo_common::db::init_database;
use parlo_demo::costs::{run_cost_monitor, start_of_utc_day, CostStatus};
use parlo_demo::db::logs::{top_user_costs, usage_stats};

/// Daily cost monitor for the pronunciation demo
#[derive(Parser, Debug)]
#[command(name = "parlo-costs")]
#[command(about = "Check today's demo costs against the configured thresholds")]
#[command(version)]
struct Args {
    /// Data directory holding the SQLite database
    #[arg(short, long, env = "PARLO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// How many top spenders to list
    #[arg(long, default_value = "5")]
    top_users: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Parlo cost monitor v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let data_dir = resolve_data_dir(args.data_dir.as_deref(), "PARLO_DATA_DIR");
    let db_path = ensure_data_dir(&data_dir).context("Failed to prepare data directory")?;
    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let now = Utc::now();
    let report = run_cost_monitor(&pool, now)
        .await
        .context("Cost monitor run failed")?;

    println!("Demo cost report for {}", now.format("%Y-%m-%d"));
    println!(
        "  Today's cost:      ${:.4} (warning ${:.2}, limit ${:.2})",
        report.total_today, report.warning_threshold, report.daily_limit
    );
    match report.status {
        CostStatus::Ok => println!("  Status:            OK"),
        CostStatus::Warning => println!("  Status:            WARNING - approaching daily limit"),
        CostStatus::Paused => {
            let until = report
                .paused_until
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "end of day".to_string());
            println!("  Status:            PAUSED until {}", until);
        }
    }

    let day_start = start_of_utc_day(now);
    let stats = usage_stats(&pool, day_start, now)
        .await
        .context("Usage stats query failed")?;
    println!("  Distinct users:    {}", stats.distinct_users);
    println!("  Attempts:          {}", stats.attempt_count);
    println!("  Avg cost per user: ${:.4}", stats.avg_cost_per_user());

    let top = top_user_costs(&pool, day_start, now, args.top_users)
        .await
        .context("Top user query failed")?;
    if !top.is_empty() {
        println!("  Top spenders:");
        for user in top {
            println!("    {:<40} ${:.4}", user.email, user.total_cost);
        }
    }

    Ok(())
}
