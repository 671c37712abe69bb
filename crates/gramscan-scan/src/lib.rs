//! Scan orchestration core.
//!
//! One scan run is a single sequential control flow: the orchestrator opens
//! a run record, the session manager checks a credential out of the
//! rotation pool and materializes its session, the crawl engine walks the
//! monitored targets under the pacing policy, and the classifier decides
//! how each provider failure is absorbed. The credential is returned to the
//! pool exactly once on every exit path, panics included.

pub mod classify;
pub mod crawl;
pub mod orchestrator;
pub mod pacing;
pub mod session;

pub use classify::{classify, RecoveryAction};
pub use crawl::{media_storage_path, CrawlEngine, CrawlError, CrawlReport, COMMENT_CAP};
pub use orchestrator::{RunSummary, ScanRunner, JOB_TYPE_DAILY_SCAN, SERVICE_NAME};
pub use pacing::{DelayRange, PacingPolicy};
pub use session::{ScanSession, SessionManager, SetupError};
