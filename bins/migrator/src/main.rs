//! Database migration runner for Ledgerkeep.
//!
//! Usage:
//!   migrator up                        - Run all pending migrations
//!   migrator down                      - Rollback last migration
//!   migrator status                    - Show migration status
//!   migrator fresh                     - Drop all tables and re-run migrations
//!   migrator resolve-duplicates [CODE] - Merge duplicate account codes,
//!                                        then install the code guard when
//!                                        run without a code

use ledgerkeep_db::migration::Migrator;
use ledgerkeep_db::{LedgerStore, connect_with};
use ledgerkeep_shared::{AppConfig, AppError, AppResult};
use sea_orm_migration::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const RESOLVE_COMMAND: &str = "resolve-duplicates";

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let mut args = std::env::args().skip(1);
    if args.next().as_deref() != Some(RESOLVE_COMMAND) {
        // Run the migrator CLI (it sets up its own tracing)
        cli::run_cli(Migrator).await;
        return;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledgerkeep=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = resolve_duplicates(args.next()).await {
        error!(code = err.error_code(), error = %err, "Duplicate resolution failed");
        std::process::exit(err.exit_code());
    }
}

async fn resolve_duplicates(scope: Option<String>) -> AppResult<()> {
    let config = AppConfig::load()?;
    let db = connect_with(&config.database)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("Connected to database");

    let report = LedgerStore::new(db)
        .with_config(config.ledger)
        .duplicates()
        .resolve(scope.as_deref())
        .await?;

    for summary in report.summaries() {
        info!(
            code = %summary.normalized_code,
            primary = %summary.primary,
            merged = summary.merged.len(),
            lines = summary.lines_repointed,
            subledgers = summary.subledgers_repointed,
            "Merged duplicate group"
        );
    }
    for code in &report.header_conflicts {
        warn!(code = %code, "Header accounts share a code; review manually");
    }
    if report.failed_count() > 0 {
        return Err(AppError::BusinessRule(format!(
            "{} of {} duplicate groups could not be merged",
            report.failed_count(),
            report.groups_found
        )));
    }
    info!(
        groups = report.groups_found,
        guard_installed = report.guard_installed,
        "Duplicate resolution finished"
    );
    Ok(())
}
