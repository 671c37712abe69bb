//! Operations CLI: trigger a scan run from a terminal and inspect the
//! rotation pool, target registry, and recent run records.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use sqlx::PgPool;

use gramscan_core::AppConfig;
use gramscan_provider::InstagramClient;
use gramscan_scan::{CrawlEngine, PacingPolicy, ScanRunner, SessionManager};
use gramscan_store::{
    FsMediaStore, FsSecretVault, PgContentStore, PgCredentialStore, PgRunLog, PgTargetRegistry,
};

#[derive(Debug, Parser)]
#[command(name = "gramscan-cli")]
#[command(about = "Gramscan operations command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one full scan now and wait for it to finish
    Scan,
    /// List the service-account rotation pool in selection order
    Accounts,
    /// List active monitored targets
    Targets {
        /// Target kind: "profile" or "hashtag"
        #[arg(long, default_value = "profile")]
        kind: String,
    },
    /// List recent scan runs, newest first
    Runs {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = gramscan_core::load_app_config()?;
    let pool = gramscan_store::connect_pool(
        &config.database_url,
        gramscan_store::PoolConfig::from_app_config(&config),
    )
    .await?;
    gramscan_store::run_migrations(&pool).await?;

    match cli.command {
        Commands::Scan => run_scan(pool, &config).await,
        Commands::Accounts => list_accounts(&pool).await,
        Commands::Targets { kind } => list_targets(&pool, &kind).await,
        Commands::Runs { limit } => list_runs(&pool, limit).await,
    }
}

/// Runs one scan synchronously. Exits non-zero when the run ends in a
/// critical error; a rate-limited early stop is reported but is not a
/// failure.
async fn run_scan(pool: PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let runner = build_scan_runner(pool, config);
    let summary = runner.run_daily_scan().await?;

    println!(
        "run {} finished with status '{}': {} targets scanned, {} skipped, \
         {} posts, {} comments, {} stories",
        summary.run_id,
        summary.status,
        summary.metrics.targets_scanned,
        summary.metrics.targets_skipped,
        summary.metrics.posts_collected,
        summary.metrics.comments_collected,
        summary.metrics.stories_collected,
    );
    Ok(())
}

async fn list_accounts(pool: &PgPool) -> anyhow::Result<()> {
    let accounts = gramscan_store::list_accounts(pool).await?;
    if accounts.is_empty() {
        println!("no service accounts configured");
        return Ok(());
    }

    for account in accounts {
        let last_used = account
            .last_used_at
            .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());
        println!(
            "{:<24} {:<16} last used {}",
            account.username, account.status, last_used
        );
    }
    Ok(())
}

async fn list_targets(pool: &PgPool, kind: &str) -> anyhow::Result<()> {
    let targets = gramscan_store::list_active_targets(pool, kind).await?;
    if targets.is_empty() {
        println!("no active {kind} targets");
        return Ok(());
    }

    for target in targets {
        let last_scanned = target
            .last_scanned_at
            .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());
        println!("{:<32} last scanned {}", target.identifier, last_scanned);
    }
    Ok(())
}

async fn list_runs(pool: &PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = gramscan_store::list_recent_runs(pool, limit).await?;
    if runs.is_empty() {
        println!("no scan runs recorded");
        return Ok(());
    }

    for run in runs {
        let ended = run
            .end_time
            .map_or_else(|| "running".to_string(), |t| t.to_rfc3339());
        println!(
            "{} {:<10} started {} ended {}: {}",
            run.run_id,
            run.status,
            run.start_time.to_rfc3339(),
            ended,
            run.message
        );
    }
    Ok(())
}

/// Same wiring as the server's composition root; the CLI builds its own so
/// a scan can run without the HTTP process.
fn build_scan_runner(pool: PgPool, config: &AppConfig) -> ScanRunner {
    let provider = Arc::new(InstagramClient::new(
        &config.provider_base_url,
        config.provider_timeout_secs,
        config.media_timeout_secs,
        &config.provider_user_agent,
    ));

    let sessions = SessionManager::new(
        Arc::new(PgCredentialStore::new(pool.clone())),
        Arc::new(FsSecretVault::new(&config.secret_vault_dir)),
        provider,
        &config.session_spool_dir,
    );

    let engine = CrawlEngine::new(
        Arc::new(PgTargetRegistry::new(pool.clone())),
        Arc::new(PgContentStore::new(pool.clone())),
        Arc::new(FsMediaStore::new(&config.media_root)),
        PacingPolicy::from_config(config),
    );

    ScanRunner::new(sessions, engine, Arc::new(PgRunLog::new(pool)))
}
