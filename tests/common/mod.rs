//! Shared fixtures for integration tests
//!
//! Every test gets its own SQLite file inside a `TempDir`; the directory
//! must outlive the storage, so both travel together in [`TestEnv`].

#![allow(dead_code)]

use std::sync::Arc;

use actix_web::web;
use async_trait::async_trait;
use tempfile::TempDir;
use uuid::Uuid;

use biolinker::api::AppState;
use biolinker::config::StaticConfig;
use biolinker::rbac::{AuthorizationGuard, SessionIdentity};
use biolinker::services::{GeoInfo, GeoIpLookup, GeoIpProvider};
use biolinker::storage::{NewUser, SeaOrmStorage, StorageFactory};
use biolinker::utils::hash_password;

pub const TEST_PASSWORD: &str = "correct horse battery";

/// Lookup with a canned answer and a call counter
pub struct StubGeo {
    pub answer: Option<GeoInfo>,
    pub calls: std::sync::atomic::AtomicUsize,
}

impl StubGeo {
    pub fn answering(answer: Option<GeoInfo>) -> Arc<Self> {
        Arc::new(Self {
            answer,
            calls: Default::default(),
        })
    }

    pub fn berlin() -> Arc<Self> {
        Self::answering(Some(GeoInfo {
            country: Some("Germany".into()),
            country_code: Some("de".into()),
            city: Some("Berlin".into()),
        }))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl GeoIpLookup for StubGeo {
    async fn lookup(&self, _ip: &str) -> Option<GeoInfo> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.answer.clone()
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Lookup that never answers within any sane timeout
pub struct HangingGeo;

#[async_trait]
impl GeoIpLookup for HangingGeo {
    async fn lookup(&self, _ip: &str) -> Option<GeoInfo> {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        None
    }

    fn name(&self) -> &'static str {
        "hanging"
    }
}

pub struct TestEnv {
    pub _dir: TempDir,
    pub config: StaticConfig,
    pub storage: Arc<SeaOrmStorage>,
    pub state: web::Data<AppState>,
}

pub fn test_config(dir: &TempDir) -> StaticConfig {
    let mut config = StaticConfig::default();
    config.database.database_url =
        format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
    config.auth.jwt_secret = "integration-test-secret-0123456789abcdef".into();
    config.analytics.geo_timeout_ms = 500;
    config
}

pub async fn setup_with(geo: Arc<dyn GeoIpLookup>, tweak: impl FnOnce(&mut StaticConfig)) -> TestEnv {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = test_config(&dir);
    tweak(&mut config);

    let storage = StorageFactory::create(&config.database)
        .await
        .expect("Failed to create storage");
    let state = web::Data::new(AppState::new(
        storage.clone(),
        &config,
        GeoIpProvider::from_lookup(geo),
    ));

    TestEnv {
        _dir: dir,
        config,
        storage,
        state,
    }
}

pub async fn setup() -> TestEnv {
    setup_with(StubGeo::berlin(), |_| {}).await
}

impl TestEnv {
    /// Account with no roles
    pub async fn user(&self, email: &str) -> i64 {
        self.user_with_role(email, "user").await
    }

    pub async fn user_with_role(&self, email: &str, legacy_role: &str) -> i64 {
        self.storage
            .create_user(NewUser {
                email: email.to_string(),
                password_hash: hash_password(TEST_PASSWORD).expect("hash"),
                display_name: email.split('@').next().unwrap_or(email).to_string(),
                role: legacy_role.to_string(),
            })
            .await
            .expect("Failed to create user")
            .id
    }

    /// Account holding exactly the given seeded RBAC role
    pub async fn user_in_role(&self, email: &str, role: &str) -> i64 {
        let id = self.user(email).await;
        self.storage
            .grant_role_if_absent(id, role)
            .await
            .expect("Failed to grant role");
        id
    }

    pub async fn admin(&self) -> i64 {
        self.user_in_role("root@example.com", "SuperAdmin").await
    }

    /// Page owned by `user_id`, returns the page id
    pub async fn page(&self, user_id: i64, slug: &str) -> i64 {
        self.storage
            .create_page(user_id, slug, slug)
            .await
            .expect("Failed to create page")
            .id
    }

    pub async fn link(&self, page_id: i64, url: &str) -> i64 {
        self.storage
            .create_link(page_id, url, url)
            .await
            .expect("Failed to create link")
            .id
    }

    /// Guard for a fresh session of `user_id`
    pub fn guard(&self, user_id: i64) -> AuthorizationGuard {
        self.state.guard_for(Some(SessionIdentity {
            user_id,
            session_id: Uuid::new_v4().to_string(),
            legacy_role: "user".into(),
        }))
    }

    pub fn anonymous(&self) -> AuthorizationGuard {
        self.state.guard_for(None)
    }
}
