mod app_config;
mod config;
pub mod error;
pub mod model;
pub mod ports;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, ConfigError};
pub use error::{ProviderError, StoreError};
pub use model::{
    story_expiry, AccountStatus, CollectedComment, CollectedPost, CollectedStory, MediaKind,
    MonitoredTarget, Page, ProfileHandle, ProviderComment, ProviderPost, ProviderStory,
    RunStatus, ScanMetrics, ServiceAccount, TargetKind,
};
