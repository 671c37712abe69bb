//! End-to-end tests of the scan core against in-memory fakes.
//!
//! Every port gets a hand-rolled fake so the session manager, crawl engine,
//! classifier, and orchestrator can be exercised together without Postgres
//! or a live provider: credential rotation order, exactly-once release
//! under injected failures and panics, session-expiry transitions, the
//! comment cap, skip-and-continue, rate-limit early stop, and the full
//! two-target scenario.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use gramscan_core::ports::{
    ContentProvider, ContentStore, CredentialStore, MediaStore, ProviderSession, RunLog,
    SecretStore, TargetRegistry,
};
use gramscan_core::{
    AccountStatus, CollectedComment, CollectedPost, CollectedStory, MediaKind, MonitoredTarget,
    Page, ProfileHandle, ProviderComment, ProviderError, ProviderPost, ProviderStory, RunStatus,
    ScanMetrics, ServiceAccount, StoreError, TargetKind,
};
use gramscan_scan::{
    CrawlEngine, PacingPolicy, RunSummary, ScanRunner, SessionManager, SetupError, COMMENT_CAP,
};

fn posted_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 7, 9, 0, 0).unwrap()
}

// ---------------------------------------------------------------------------
// Store fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct InMemoryCredentialStore {
    accounts: Mutex<Vec<ServiceAccount>>,
    status_updates: Mutex<Vec<(String, AccountStatus, Option<DateTime<Utc>>)>>,
}

impl InMemoryCredentialStore {
    fn with_accounts(accounts: Vec<ServiceAccount>) -> Arc<Self> {
        Arc::new(Self {
            accounts: Mutex::new(accounts),
            status_updates: Mutex::new(Vec::new()),
        })
    }

    fn account(&self, username: &str) -> ServiceAccount {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.username == username)
            .unwrap_or_else(|| panic!("unknown account {username}"))
            .clone()
    }

    fn updates_for(&self, username: &str) -> Vec<(AccountStatus, Option<DateTime<Utc>>)> {
        self.status_updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _, _)| u == username)
            .map(|(_, s, t)| (*s, *t))
            .collect()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn select_oldest_active(&self) -> Result<Option<ServiceAccount>, StoreError> {
        let accounts = self.accounts.lock().unwrap();
        let mut best: Option<&ServiceAccount> = None;
        for account in accounts.iter().filter(|a| a.status == AccountStatus::Active) {
            best = match best {
                None => Some(account),
                Some(current) => {
                    let earlier = match (account.last_used_at, current.last_used_at) {
                        (None, None) => account.username < current.username,
                        (None, Some(_)) => true,
                        (Some(_), None) => false,
                        (Some(a), Some(b)) => {
                            a < b || (a == b && account.username < current.username)
                        }
                    };
                    if earlier {
                        Some(account)
                    } else {
                        Some(current)
                    }
                }
            };
        }
        Ok(best.cloned())
    }

    async fn set_status(
        &self,
        username: &str,
        status: AccountStatus,
        last_used_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .iter_mut()
            .find(|a| a.username == username)
            .ok_or(StoreError::NotFound)?;
        account.status = status;
        if last_used_at.is_some() {
            account.last_used_at = last_used_at;
        }
        self.status_updates
            .lock()
            .unwrap()
            .push((username.to_string(), status, last_used_at));
        Ok(())
    }
}

#[derive(Default)]
struct InMemorySecretStore {
    payloads: HashMap<String, Vec<u8>>,
}

impl InMemorySecretStore {
    fn with_payload(reference: &str, payload: &[u8]) -> Arc<Self> {
        let mut payloads = HashMap::new();
        payloads.insert(reference.to_string(), payload.to_vec());
        Arc::new(Self { payloads })
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn fetch_payload(&self, reference: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.payloads.get(reference).cloned())
    }
}

#[derive(Default)]
struct InMemoryMediaStore {
    uploads: Mutex<Vec<String>>,
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn upload(&self, _bytes: Vec<u8>, destination: &str) -> Result<String, StoreError> {
        self.uploads.lock().unwrap().push(destination.to_string());
        Ok(format!("mem://{destination}"))
    }
}

struct InMemoryTargetRegistry {
    targets: Vec<MonitoredTarget>,
    stamped: Mutex<Vec<String>>,
}

impl InMemoryTargetRegistry {
    fn with_profiles(identifiers: &[&str]) -> Arc<Self> {
        let targets = identifiers
            .iter()
            .map(|id| MonitoredTarget {
                kind: TargetKind::Profile,
                identifier: (*id).to_string(),
                is_active: true,
                last_scanned_at: None,
            })
            .collect();
        Arc::new(Self {
            targets,
            stamped: Mutex::new(Vec::new()),
        })
    }

    fn stamped(&self) -> Vec<String> {
        self.stamped.lock().unwrap().clone()
    }
}

#[async_trait]
impl TargetRegistry for InMemoryTargetRegistry {
    async fn list_active(&self, kind: TargetKind) -> Result<Vec<MonitoredTarget>, StoreError> {
        Ok(self
            .targets
            .iter()
            .filter(|t| t.kind == kind && t.is_active)
            .cloned()
            .collect())
    }

    async fn stamp_scanned(&self, _kind: TargetKind, identifier: &str) -> Result<(), StoreError> {
        self.stamped.lock().unwrap().push(identifier.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryContentStore {
    posts: Mutex<Vec<CollectedPost>>,
    comments: Mutex<Vec<CollectedComment>>,
    stories: Mutex<Vec<CollectedStory>>,
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn save_post(&self, post: &CollectedPost) -> Result<(), StoreError> {
        self.posts.lock().unwrap().push(post.clone());
        Ok(())
    }

    async fn save_comment(&self, comment: &CollectedComment) -> Result<(), StoreError> {
        self.comments.lock().unwrap().push(comment.clone());
        Ok(())
    }

    async fn save_story(&self, story: &CollectedStory) -> Result<(), StoreError> {
        self.stories.lock().unwrap().push(story.clone());
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum RunEvent {
    Opened(Uuid),
    Closed {
        run_id: Uuid,
        status: RunStatus,
        has_metrics: bool,
        error_detail: Option<String>,
    },
}

#[derive(Default)]
struct InMemoryRunLog {
    events: Mutex<Vec<RunEvent>>,
}

impl InMemoryRunLog {
    fn events(&self) -> Vec<RunEvent> {
        self.events.lock().unwrap().clone()
    }

    /// The most recent terminal write: `(run_id, status, has_metrics,
    /// error_detail)`.
    fn last_close(&self) -> Option<(Uuid, RunStatus, bool, Option<String>)> {
        self.events().iter().rev().find_map(|e| match e {
            RunEvent::Closed {
                run_id,
                status,
                has_metrics,
                error_detail,
            } => Some((*run_id, *status, *has_metrics, error_detail.clone())),
            RunEvent::Opened(_) => None,
        })
    }

    fn closed_status(&self) -> Option<RunStatus> {
        self.last_close().map(|(_, status, _, _)| status)
    }
}

#[async_trait]
impl RunLog for InMemoryRunLog {
    async fn open(
        &self,
        run_id: Uuid,
        _service: &str,
        _job_type: &str,
        _message: &str,
    ) -> Result<(), StoreError> {
        self.events.lock().unwrap().push(RunEvent::Opened(run_id));
        Ok(())
    }

    async fn close(
        &self,
        run_id: Uuid,
        status: RunStatus,
        _message: &str,
        error_detail: Option<&str>,
        metrics: Option<&ScanMetrics>,
    ) -> Result<(), StoreError> {
        self.events.lock().unwrap().push(RunEvent::Closed {
            run_id,
            status,
            has_metrics: metrics.is_some(),
            error_detail: error_detail.map(ToOwned::to_owned),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Provider fakes
// ---------------------------------------------------------------------------

enum ProfileBehavior {
    NotFound,
    Inaccessible,
    PanicOnResolve,
    RateLimitedOnPosts,
    TransportOnPosts,
    Content {
        posts: Vec<ProviderPost>,
        stories: Vec<ProviderStory>,
    },
}

const POST_PAGE_SIZE: usize = 10;
const COMMENT_PAGE_SIZE: usize = 40;

/// Shared script for a fake provider session: per-profile behavior plus the
/// number of comments available per media id.
#[derive(Default)]
struct CrawlScript {
    profiles: HashMap<String, ProfileBehavior>,
    available_comments: HashMap<String, usize>,
    resolved: Mutex<Vec<String>>,
}

impl CrawlScript {
    fn resolved(&self) -> Vec<String> {
        self.resolved.lock().unwrap().clone()
    }
}

fn make_post(shortcode: &str, comment_count: i64, media_url: Option<&str>) -> ProviderPost {
    ProviderPost {
        media_id: format!("media-{shortcode}"),
        shortcode: shortcode.to_string(),
        taken_at: posted_at(),
        caption: Some("caption".to_string()),
        like_count: 11,
        comment_count,
        media_kind: MediaKind::Image,
        media_url: media_url.map(ToOwned::to_owned),
    }
}

fn make_story(story_id: &str) -> ProviderStory {
    ProviderStory {
        story_id: story_id.to_string(),
        taken_at: posted_at(),
        media_kind: MediaKind::Image,
        media_url: Some("https://cdn.example/story.jpg".to_string()),
    }
}

struct FakeSession {
    script: Arc<CrawlScript>,
}

#[async_trait]
impl ProviderSession for FakeSession {
    async fn verify(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn resolve_profile(&self, username: &str) -> Result<ProfileHandle, ProviderError> {
        self.script
            .resolved
            .lock()
            .unwrap()
            .push(username.to_string());
        match self.script.profiles.get(username) {
            Some(ProfileBehavior::NotFound) | None => Err(ProviderError::ProfileNotFound {
                username: username.to_string(),
            }),
            Some(ProfileBehavior::Inaccessible) => Err(ProviderError::ProfileInaccessible {
                username: username.to_string(),
            }),
            Some(ProfileBehavior::PanicOnResolve) => panic!("injected crawl panic"),
            Some(_) => Ok(ProfileHandle {
                user_id: format!("{username}-id"),
                username: username.to_string(),
            }),
        }
    }

    async fn posts_page(
        &self,
        profile: &ProfileHandle,
        cursor: Option<&str>,
    ) -> Result<Page<ProviderPost>, ProviderError> {
        match self.script.profiles.get(&profile.username) {
            Some(ProfileBehavior::RateLimitedOnPosts) => Err(ProviderError::RateLimited {
                retry_after_secs: Some(60),
            }),
            Some(ProfileBehavior::TransportOnPosts) => Err(ProviderError::Transport {
                context: "post feed".to_string(),
                reason: "connection reset".to_string(),
            }),
            Some(ProfileBehavior::Content { posts, .. }) => {
                let offset: usize = cursor.map_or(0, |c| c.parse().expect("cursor"));
                let end = (offset + POST_PAGE_SIZE).min(posts.len());
                let next_cursor = (end < posts.len()).then(|| end.to_string());
                Ok(Page {
                    items: posts[offset..end].to_vec(),
                    next_cursor,
                })
            }
            _ => Err(ProviderError::ProfileNotFound {
                username: profile.username.clone(),
            }),
        }
    }

    async fn comments_page(
        &self,
        media_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<ProviderComment>, ProviderError> {
        let total = *self.script.available_comments.get(media_id).unwrap_or(&0);
        let offset: usize = cursor.map_or(0, |c| c.parse().expect("cursor"));
        let end = (offset + COMMENT_PAGE_SIZE).min(total);
        let items = (offset..end)
            .map(|i| ProviderComment {
                comment_id: format!("{media_id}-c{i}"),
                author_username: format!("commenter{i}"),
                text: format!("comment {i}"),
                posted_at: Some(posted_at()),
                like_count: 0,
            })
            .collect();
        Ok(Page {
            items,
            next_cursor: (end < total).then(|| end.to_string()),
        })
    }

    async fn stories(&self, profile: &ProfileHandle) -> Result<Vec<ProviderStory>, ProviderError> {
        match self.script.profiles.get(&profile.username) {
            Some(ProfileBehavior::Content { stories, .. }) => Ok(stories.clone()),
            _ => Ok(Vec::new()),
        }
    }

    async fn fetch_media(&self, _url: &str) -> Result<Vec<u8>, ProviderError> {
        Ok(b"media bytes".to_vec())
    }
}

struct FakeProvider {
    script: Arc<CrawlScript>,
    login_required: bool,
}

#[async_trait]
impl ContentProvider for FakeProvider {
    async fn open_session(
        &self,
        account: &str,
        _material: &[u8],
    ) -> Result<Box<dyn ProviderSession>, ProviderError> {
        if self.login_required {
            return Err(ProviderError::LoginRequired {
                account: account.to_string(),
            });
        }
        Ok(Box::new(FakeSession {
            script: Arc::clone(&self.script),
        }))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn account(username: &str, last_used_days_ago: Option<i64>, status: AccountStatus) -> ServiceAccount {
    ServiceAccount {
        username: username.to_string(),
        status,
        last_used_at: last_used_days_ago.map(|d| Utc::now() - Duration::days(d)),
        secret_ref: format!("{username}.session"),
    }
}

struct Harness {
    credentials: Arc<InMemoryCredentialStore>,
    registry: Arc<InMemoryTargetRegistry>,
    content: Arc<InMemoryContentStore>,
    media: Arc<InMemoryMediaStore>,
    run_log: Arc<InMemoryRunLog>,
    script: Arc<CrawlScript>,
    runner: ScanRunner,
    spool_dir: tempfile::TempDir,
}

/// Wires a full `ScanRunner` over the fakes: one active account
/// `scanner01`, the given targets, and the given provider script.
fn harness(targets: &[&str], script: CrawlScript) -> Harness {
    let credentials =
        InMemoryCredentialStore::with_accounts(vec![account("scanner01", Some(3), AccountStatus::Active)]);
    let secrets = InMemorySecretStore::with_payload("scanner01.session", b"cookie payload");
    let registry = InMemoryTargetRegistry::with_profiles(targets);
    let content = Arc::new(InMemoryContentStore::default());
    let media = Arc::new(InMemoryMediaStore::default());
    let run_log = Arc::new(InMemoryRunLog::default());
    let script = Arc::new(script);
    let provider = Arc::new(FakeProvider {
        script: Arc::clone(&script),
        login_required: false,
    });

    let spool_dir = tempfile::tempdir().expect("spool dir");
    let sessions = SessionManager::new(
        credentials.clone(),
        secrets,
        provider,
        spool_dir.path(),
    );
    let engine = CrawlEngine::new(
        registry.clone(),
        content.clone(),
        media.clone(),
        PacingPolicy::zero(),
    );
    let runner = ScanRunner::new(sessions, engine, run_log.clone());

    Harness {
        credentials,
        registry,
        content,
        media,
        run_log,
        script,
        runner,
        spool_dir,
    }
}

fn spool_is_empty(harness: &Harness) -> bool {
    std::fs::read_dir(harness.spool_dir.path())
        .expect("read spool dir")
        .next()
        .is_none()
}

// ---------------------------------------------------------------------------
// Credential selection and session lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn acquire_selects_the_least_recently_used_active_credential() {
    let credentials = InMemoryCredentialStore::with_accounts(vec![
        account("recent", Some(1), AccountStatus::Active),
        account("oldest", Some(30), AccountStatus::Active),
        account("resting", None, AccountStatus::Disabled),
    ]);
    let secrets = InMemorySecretStore::with_payload("oldest.session", b"payload");
    let provider = Arc::new(FakeProvider {
        script: Arc::new(CrawlScript::default()),
        login_required: false,
    });
    let spool = tempfile::tempdir().expect("spool dir");
    let sessions = SessionManager::new(
        credentials.clone(),
        secrets,
        provider,
        spool.path(),
    );

    let session = sessions.acquire(Uuid::new_v4()).await.expect("acquire");
    assert_eq!(session.account.username, "oldest");
    sessions.release(&session).await;
}

#[tokio::test]
async fn acquire_prefers_never_used_credentials() {
    let credentials = InMemoryCredentialStore::with_accounts(vec![
        account("veteran", Some(90), AccountStatus::Active),
        account("fresh", None, AccountStatus::Active),
    ]);
    let secrets = InMemorySecretStore::with_payload("fresh.session", b"payload");
    let provider = Arc::new(FakeProvider {
        script: Arc::new(CrawlScript::default()),
        login_required: false,
    });
    let spool = tempfile::tempdir().expect("spool dir");
    let sessions = SessionManager::new(
        credentials.clone(),
        secrets,
        provider,
        spool.path(),
    );

    let session = sessions.acquire(Uuid::new_v4()).await.expect("acquire");
    assert_eq!(session.account.username, "fresh");
    sessions.release(&session).await;
}

#[tokio::test]
async fn acquire_fails_on_empty_pool() {
    let credentials = InMemoryCredentialStore::with_accounts(vec![account(
        "expired",
        Some(1),
        AccountStatus::SessionExpired,
    )]);
    let secrets = Arc::new(InMemorySecretStore::default());
    let provider = Arc::new(FakeProvider {
        script: Arc::new(CrawlScript::default()),
        login_required: false,
    });
    let spool = tempfile::tempdir().expect("spool dir");
    let sessions = SessionManager::new(credentials, secrets, provider, spool.path());

    let result = sessions.acquire(Uuid::new_v4()).await;
    assert!(matches!(result, Err(SetupError::NoCredentialAvailable)));
}

#[tokio::test]
async fn acquire_fails_when_secret_is_missing() {
    let credentials =
        InMemoryCredentialStore::with_accounts(vec![account("scanner01", Some(1), AccountStatus::Active)]);
    let secrets = Arc::new(InMemorySecretStore::default());
    let provider = Arc::new(FakeProvider {
        script: Arc::new(CrawlScript::default()),
        login_required: false,
    });
    let spool = tempfile::tempdir().expect("spool dir");
    let sessions = SessionManager::new(credentials, secrets, provider, spool.path());

    let result = sessions.acquire(Uuid::new_v4()).await;
    assert!(
        matches!(result, Err(SetupError::SecretUnavailable { ref reference }) if reference == "scanner01.session")
    );
}

#[tokio::test]
async fn invalid_session_expires_the_credential_and_excludes_it() {
    let credentials =
        InMemoryCredentialStore::with_accounts(vec![account("scanner01", Some(1), AccountStatus::Active)]);
    let secrets = InMemorySecretStore::with_payload("scanner01.session", b"stale payload");
    let provider = Arc::new(FakeProvider {
        script: Arc::new(CrawlScript::default()),
        login_required: true,
    });
    let spool = tempfile::tempdir().expect("spool dir");
    let sessions = SessionManager::new(
        credentials.clone(),
        secrets,
        provider,
        spool.path(),
    );

    let result = sessions.acquire(Uuid::new_v4()).await;
    assert!(
        matches!(result, Err(SetupError::SessionInvalid { ref account }) if account == "scanner01")
    );
    assert_eq!(
        credentials.account("scanner01").status,
        AccountStatus::SessionExpired
    );

    // The expired credential is no longer selectable.
    let second = sessions.acquire(Uuid::new_v4()).await;
    assert!(matches!(second, Err(SetupError::NoCredentialAvailable)));

    // The spooled material never outlives the failed setup.
    assert!(
        std::fs::read_dir(spool.path()).expect("spool").next().is_none(),
        "spool dir should be empty after a failed acquire"
    );
}

// ---------------------------------------------------------------------------
// Exactly-once release on failure paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn critical_crawl_failure_still_releases_the_credential() {
    let mut script = CrawlScript::default();
    script
        .profiles
        .insert("acme".to_string(), ProfileBehavior::TransportOnPosts);
    let h = harness(&["acme"], script);

    let before = h.credentials.account("scanner01").last_used_at;
    let result = h.runner.run_daily_scan().await;
    assert!(result.is_err(), "transport failure must re-raise");

    let account = h.credentials.account("scanner01");
    assert_eq!(account.status, AccountStatus::Active, "credential returned to rotation");
    assert_ne!(account.last_used_at, before, "last_used_at stamped on release");

    let releases = h
        .credentials
        .updates_for("scanner01")
        .into_iter()
        .filter(|(status, stamp)| *status == AccountStatus::Active && stamp.is_some())
        .count();
    assert_eq!(releases, 1, "release happens exactly once");

    assert_eq!(h.run_log.closed_status(), Some(RunStatus::Error));
    assert!(spool_is_empty(&h), "session material erased");
}

#[tokio::test]
async fn crawl_panic_still_releases_the_credential_and_records_the_run() {
    let mut script = CrawlScript::default();
    script
        .profiles
        .insert("acme".to_string(), ProfileBehavior::PanicOnResolve);
    let h = harness(&["acme"], script);

    let result = h.runner.run_daily_scan().await;
    let err = result.expect_err("panic must re-raise as an error");
    assert!(
        err.to_string().contains("panicked"),
        "unexpected error: {err:#}"
    );

    let account = h.credentials.account("scanner01");
    assert_eq!(account.status, AccountStatus::Active);
    assert!(account.last_used_at.is_some());

    let (_, status, _, error_detail) = h.run_log.last_close().expect("terminal record");
    assert_eq!(status, RunStatus::Error);
    assert!(
        error_detail.expect("error detail recorded").contains("panicked"),
        "terminal record should carry the panic detail"
    );
    assert!(spool_is_empty(&h));
}

#[tokio::test]
async fn setup_failure_closes_the_run_as_error() {
    // Pool is empty: acquisition fails before any crawling.
    let credentials = Arc::new(InMemoryCredentialStore::default());
    let secrets = Arc::new(InMemorySecretStore::default());
    let provider = Arc::new(FakeProvider {
        script: Arc::new(CrawlScript::default()),
        login_required: false,
    });
    let registry = InMemoryTargetRegistry::with_profiles(&["acme"]);
    let content = Arc::new(InMemoryContentStore::default());
    let media = Arc::new(InMemoryMediaStore::default());
    let run_log = Arc::new(InMemoryRunLog::default());
    let spool = tempfile::tempdir().expect("spool dir");

    let runner = ScanRunner::new(
        SessionManager::new(credentials, secrets, provider, spool.path()),
        CrawlEngine::new(registry, content, media, PacingPolicy::zero()),
        run_log.clone(),
    );

    let result = runner.run_daily_scan().await;
    assert!(result.is_err());
    assert_eq!(run_log.closed_status(), Some(RunStatus::Error));

    let events = run_log.events();
    assert_eq!(events.len(), 2, "exactly one open and one close: {events:?}");
}

// ---------------------------------------------------------------------------
// Crawl behavior
// ---------------------------------------------------------------------------

#[tokio::test]
async fn comment_persistence_is_capped_per_post() {
    let mut script = CrawlScript::default();
    script.profiles.insert(
        "acme".to_string(),
        ProfileBehavior::Content {
            posts: vec![make_post("Cbig", 150, None)],
            stories: vec![],
        },
    );
    script
        .available_comments
        .insert("media-Cbig".to_string(), 150);
    let h = harness(&["acme"], script);

    let summary = h.runner.run_daily_scan().await.expect("run");
    assert_eq!(summary.status, RunStatus::Completed);

    let comments = h.content.comments.lock().unwrap();
    assert_eq!(comments.len(), COMMENT_CAP, "cap applies despite 150 available");
    assert!(comments.iter().all(|c| c.post_shortcode == "Cbig"));
}

#[tokio::test]
async fn missing_target_does_not_stop_the_run() {
    let mut script = CrawlScript::default();
    script
        .profiles
        .insert("ghost".to_string(), ProfileBehavior::NotFound);
    script.profiles.insert(
        "acme".to_string(),
        ProfileBehavior::Content {
            posts: vec![make_post("Cok", 0, None)],
            stories: vec![],
        },
    );
    let h = harness(&["ghost", "acme"], script);

    let summary = h.runner.run_daily_scan().await.expect("run");
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.metrics.targets_scanned, 1);
    assert_eq!(summary.metrics.targets_skipped, 1);
    assert_eq!(h.registry.stamped(), vec!["acme".to_string()]);
    assert_eq!(
        h.script.resolved(),
        vec!["ghost".to_string(), "acme".to_string()],
        "both targets attempted in order"
    );
}

#[tokio::test]
async fn rate_limit_stops_the_run_and_skips_remaining_targets() {
    let mut script = CrawlScript::default();
    script
        .profiles
        .insert("limited".to_string(), ProfileBehavior::RateLimitedOnPosts);
    script.profiles.insert(
        "never-reached".to_string(),
        ProfileBehavior::Content {
            posts: vec![],
            stories: vec![],
        },
    );
    let h = harness(&["limited", "never-reached"], script);

    let summary = h.runner.run_daily_scan().await.expect("rate limit is not an error");
    assert_eq!(summary.status, RunStatus::Warning);
    assert_eq!(summary.metrics.targets_scanned, 0);

    assert_eq!(
        h.script.resolved(),
        vec!["limited".to_string()],
        "no further targets after the rate limit"
    );
    assert!(h.registry.stamped().is_empty());

    // Credential stays healthy: the limiting is provider-side.
    assert_eq!(h.credentials.account("scanner01").status, AccountStatus::Active);

    let (_, status, has_metrics, _) = h.run_log.last_close().expect("terminal record");
    assert_eq!(status, RunStatus::Warning);
    assert!(has_metrics, "partial metrics recorded on a rate-limited stop");
}

// ---------------------------------------------------------------------------
// The two-target end-to-end scenario
// ---------------------------------------------------------------------------

#[tokio::test]
async fn end_to_end_scan_of_two_targets() {
    let mut script = CrawlScript::default();
    script
        .profiles
        .insert("locked".to_string(), ProfileBehavior::Inaccessible);
    script.profiles.insert(
        "acme".to_string(),
        ProfileBehavior::Content {
            posts: vec![make_post("Cpost", 150, Some("https://cdn.example/p.jpg"))],
            stories: vec![make_story("808")],
        },
    );
    script
        .available_comments
        .insert("media-Cpost".to_string(), 150);
    let h = harness(&["locked", "acme"], script);

    let RunSummary {
        run_id,
        status,
        metrics,
    } = h.runner.run_daily_scan().await.expect("run");

    assert_eq!(status, RunStatus::Completed);
    assert_eq!(metrics.targets_scanned, 1);
    assert_eq!(metrics.targets_skipped, 1);
    assert_eq!(metrics.posts_collected, 1);
    assert_eq!(metrics.comments_collected, 100);
    assert_eq!(metrics.stories_collected, 1);

    let posts = h.content.posts.lock().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].owner_username, "acme");
    assert_eq!(
        posts[0].media_ref.as_deref(),
        Some("mem://acme/2025-06/Cpost.jpg"),
        "post media stored at the deterministic path"
    );

    assert_eq!(h.content.comments.lock().unwrap().len(), 100);

    let stories = h.content.stories.lock().unwrap();
    assert_eq!(stories.len(), 1);
    assert_eq!(
        stories[0].expires_at,
        stories[0].captured_at + Duration::hours(24),
        "story expiry is capture time + 24h"
    );

    assert_eq!(
        h.registry.stamped(),
        vec!["acme".to_string()],
        "only the accessible target is stamped"
    );

    let uploads = h.media.uploads.lock().unwrap();
    assert!(uploads.contains(&"acme/2025-06/Cpost.jpg".to_string()));
    assert!(uploads.contains(&"acme/2025-06/808.jpg".to_string()));

    let account = h.credentials.account("scanner01");
    assert_eq!(account.status, AccountStatus::Active);
    assert!(account.last_used_at.is_some());
    assert!(spool_is_empty(&h), "session material erased after release");

    let (closed_run, closed_status, has_metrics, error_detail) =
        h.run_log.last_close().expect("terminal record");
    assert_eq!(closed_run, run_id, "terminal write targets this run");
    assert_eq!(closed_status, RunStatus::Completed);
    assert!(has_metrics);
    assert!(error_detail.is_none());
}
