//! Per-session permission cache
//!
//! Each login session owns one [`SessionPermissionCache`]; the registry maps
//! the token's `jti` to it and drops caches that sit idle past the session
//! TTL. Logged-out session ids are remembered until their token would have
//! expired anyway.
//!
//! Known consistency gap: invalidation reaches the acting session's cache
//! only. Other live sessions keep their cached permission set until they
//! invalidate it themselves or their cache idles out.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheScope {
    User(i64),
    All,
}

/// Resolved permission sets of the users this session has looked up
pub struct SessionPermissionCache {
    entries: Cache<i64, Arc<[String]>>,
}

impl SessionPermissionCache {
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().max_capacity(1024).build(),
        }
    }

    pub fn get(&self, user_id: i64) -> Option<Arc<[String]>> {
        let hit = self.entries.get(&user_id);
        trace!(
            "permission cache {} for user {}",
            if hit.is_some() { "hit" } else { "miss" },
            user_id
        );
        hit
    }

    pub fn put(&self, user_id: i64, permissions: Arc<[String]>) {
        self.entries.insert(user_id, permissions);
    }

    pub fn invalidate(&self, scope: CacheScope) {
        match scope {
            CacheScope::User(user_id) => self.entries.invalidate(&user_id),
            CacheScope::All => self.entries.invalidate_all(),
        }
        trace!("permission cache invalidated: {:?}", scope);
    }
}

impl Default for SessionPermissionCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Session id → that session's cache, plus the ids revoked by logout
#[derive(Clone)]
pub struct SessionCacheRegistry {
    sessions: Cache<String, Arc<SessionPermissionCache>>,
    revoked: Cache<String, ()>,
}

impl SessionCacheRegistry {
    /// `token_ttl` bounds how long a revoked id must be remembered
    pub fn new(idle_ttl: Duration, token_ttl: Duration) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(idle_ttl)
                .build(),
            revoked: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(token_ttl)
                .build(),
        }
    }

    /// Cache of `session_id`, created on first use
    pub fn for_session(&self, session_id: &str) -> Arc<SessionPermissionCache> {
        self.sessions
            .get_with(session_id.to_string(), || Arc::new(SessionPermissionCache::new()))
    }

    /// Logout: forget the session's cache and refuse its token from now on
    pub fn revoke(&self, session_id: &str) {
        self.sessions.invalidate(session_id);
        self.revoked.insert(session_id.to_string(), ());
    }

    pub fn is_revoked(&self, session_id: &str) -> bool {
        self.revoked.contains_key(session_id)
    }
}
