use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub provider_base_url: String,
    pub provider_timeout_secs: u64,
    pub media_timeout_secs: u64,
    pub provider_user_agent: String,
    pub secret_vault_dir: PathBuf,
    pub session_spool_dir: PathBuf,
    pub media_root: PathBuf,
    pub post_delay_min_secs: u64,
    pub post_delay_max_secs: u64,
    pub story_delay_min_secs: u64,
    pub story_delay_max_secs: u64,
    pub target_delay_min_secs: u64,
    pub target_delay_max_secs: u64,
    pub cooldown_min_secs: u64,
    pub cooldown_max_secs: u64,
    pub scan_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("provider_base_url", &self.provider_base_url)
            .field("provider_timeout_secs", &self.provider_timeout_secs)
            .field("media_timeout_secs", &self.media_timeout_secs)
            .field("provider_user_agent", &self.provider_user_agent)
            .field("secret_vault_dir", &self.secret_vault_dir)
            .field("session_spool_dir", &self.session_spool_dir)
            .field("media_root", &self.media_root)
            .field("post_delay_min_secs", &self.post_delay_min_secs)
            .field("post_delay_max_secs", &self.post_delay_max_secs)
            .field("story_delay_min_secs", &self.story_delay_min_secs)
            .field("story_delay_max_secs", &self.story_delay_max_secs)
            .field("target_delay_min_secs", &self.target_delay_min_secs)
            .field("target_delay_max_secs", &self.target_delay_max_secs)
            .field("cooldown_min_secs", &self.cooldown_min_secs)
            .field("cooldown_max_secs", &self.cooldown_max_secs)
            .field("scan_cron", &self.scan_cron)
            .finish()
    }
}
