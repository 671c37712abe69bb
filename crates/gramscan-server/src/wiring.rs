//! Composition root: builds the scan runner from the pool and config.

use std::sync::Arc;

use sqlx::PgPool;

use gramscan_core::AppConfig;
use gramscan_provider::InstagramClient;
use gramscan_scan::{CrawlEngine, PacingPolicy, ScanRunner, SessionManager};
use gramscan_store::{
    FsMediaStore, FsSecretVault, PgContentStore, PgCredentialStore, PgRunLog, PgTargetRegistry,
};

pub fn build_scan_runner(pool: PgPool, config: &AppConfig) -> ScanRunner {
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
