//! Shared application state handed to every handler as `web::Data<AppState>`

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::api::jwt::JwtService;
use crate::config::StaticConfig;
use crate::rbac::{
    AuthorizationGuard, LegacyRoleAdapter, PermissionStore, SessionCacheRegistry, SessionIdentity,
};
use crate::services::{
    AnalyticsAggregator, AuditLog, Blocklist, GeoIpProvider, GeoResolver, IngestService,
};
use crate::storage::SeaOrmStorage;

pub struct AppState {
    pub storage: Arc<SeaOrmStorage>,
    pub permissions: Arc<PermissionStore>,
    pub sessions: SessionCacheRegistry,
    pub audit: AuditLog,
    pub blocklist: Blocklist,
    pub ingest: IngestService,
    pub analytics: AnalyticsAggregator,
    pub legacy: LegacyRoleAdapter,
    pub jwt: Arc<JwtService>,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub trusted_proxies: Vec<String>,
    pub login_per_minute: u32,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(storage: Arc<SeaOrmStorage>, config: &StaticConfig, geo: GeoIpProvider) -> Self {
        let audit = AuditLog::new(storage.clone());
        let blocklist = Blocklist::new(storage.clone(), audit.clone());
        let resolver = GeoResolver::new(
            geo,
            Duration::from_millis(config.analytics.geo_timeout_ms),
        );

        let jwt = Arc::new(JwtService::from_auth_config(&config.auth));

        Self {
            permissions: Arc::new(PermissionStore::new(
                storage.clone(),
                audit.clone(),
                config.rbac.name_resolution,
            )),
            sessions: SessionCacheRegistry::new(
                Duration::from_secs(config.rbac.session_cache_ttl_secs.max(1)),
                Duration::from_secs(jwt.session_minutes() * 60),
            ),
            ingest: IngestService::new(storage.clone(), blocklist.clone(), resolver),
            analytics: AnalyticsAggregator::new(storage.clone()),
            legacy: LegacyRoleAdapter::new(storage.clone(), audit.clone()),
            jwt,
            cookie_name: config.auth.cookie_name.clone(),
            cookie_secure: config.auth.cookie_secure,
            trusted_proxies: config.analytics.trusted_proxies.clone(),
            login_per_minute: config.auth.login_per_minute,
            started_at: Utc::now(),
            audit,
            blocklist,
            storage,
        }
    }

    /// Guard for one request; a session reads through its own cache. A
    /// logged-out session is treated as anonymous.
    pub fn guard_for(&self, identity: Option<SessionIdentity>) -> AuthorizationGuard {
        match identity {
            Some(identity) if self.sessions.is_revoked(&identity.session_id) => {
                debug!(
                    "Session {} of user {} was logged out",
                    identity.session_id, identity.user_id
                );
                AuthorizationGuard::anonymous(self.permissions.clone())
            }
            Some(identity) => {
                let cache = self.sessions.for_session(&identity.session_id);
                AuthorizationGuard::new(Some(identity), cache, self.permissions.clone())
            }
            None => AuthorizationGuard::anonymous(self.permissions.clone()),
        }
    }
}
