//! Authorization guard
//!
//! Built per request from the caller's identity and their session cache.
//! Every privileged operation asks the guard first; anonymous callers get
//! `Unauthenticated`, authenticated callers without the permission get
//! `Forbidden`. Whenever the caller's own permission set has to be loaded
//! from storage, the account must still be active; a deactivated account is
//! `Unauthenticated` from its next cache miss on.

use std::sync::Arc;

use tracing::debug;

use super::cache::SessionPermissionCache;
use super::store::PermissionStore;
use super::SessionIdentity;
use crate::errors::{BiolinkerError, Result};

#[derive(Clone)]
pub struct AuthorizationGuard {
    identity: Option<SessionIdentity>,
    cache: Arc<SessionPermissionCache>,
    store: Arc<PermissionStore>,
}

impl AuthorizationGuard {
    pub fn new(
        identity: Option<SessionIdentity>,
        cache: Arc<SessionPermissionCache>,
        store: Arc<PermissionStore>,
    ) -> Self {
        Self {
            identity,
            cache,
            store,
        }
    }

    /// Guard for a caller without a session
    pub fn anonymous(store: Arc<PermissionStore>) -> Self {
        Self::new(None, Arc::new(SessionPermissionCache::new()), store)
    }

    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.identity.as_ref()
    }

    /// The session cache this guard reads through
    pub fn cache(&self) -> &SessionPermissionCache {
        &self.cache
    }

    pub fn require_authenticated(&self) -> Result<i64> {
        self.identity
            .as_ref()
            .map(|identity| identity.user_id)
            .ok_or_else(|| BiolinkerError::unauthenticated("authentication required"))
    }

    /// Effective permissions of `user_id`, from the session cache when possible
    pub async fn permissions_of(&self, user_id: i64) -> Result<Arc<[String]>> {
        if let Some(cached) = self.cache.get(user_id) {
            return Ok(cached);
        }
        let resolved: Arc<[String]> = self.store.get_effective_permissions(user_id).await?.into();
        self.cache.put(user_id, resolved.clone());
        Ok(resolved)
    }

    /// Caller's effective permissions
    pub async fn permissions(&self) -> Result<Arc<[String]>> {
        self.caller_permissions().await.map(|(_, granted)| granted)
    }

    async fn caller_permissions(&self) -> Result<(i64, Arc<[String]>)> {
        let user_id = self.require_authenticated()?;
        if let Some(cached) = self.cache.get(user_id) {
            return Ok((user_id, cached));
        }
        if !self.store.is_active(user_id).await? {
            debug!("User {} is no longer active", user_id);
            return Err(BiolinkerError::unauthenticated("account is inactive"));
        }
        let resolved: Arc<[String]> = self.store.get_effective_permissions(user_id).await?.into();
        self.cache.put(user_id, resolved.clone());
        Ok((user_id, resolved))
    }

    pub async fn has(&self, permission: &str) -> Result<bool> {
        let granted = self.permissions().await?;
        Ok(granted.iter().any(|p| p == permission))
    }

    pub async fn require_permission(&self, permission: &str) -> Result<i64> {
        self.require_any_permission(&[permission]).await
    }

    /// Passes when the caller holds at least one of `permissions`
    pub async fn require_any_permission(&self, permissions: &[&str]) -> Result<i64> {
        let (user_id, granted) = self.caller_permissions().await?;
        if permissions
            .iter()
            .any(|wanted| granted.iter().any(|p| p == wanted))
        {
            return Ok(user_id);
        }
        debug!(
            "User {} denied: needs one of {:?}",
            user_id, permissions
        );
        Err(BiolinkerError::forbidden(format!(
            "missing permission: {}",
            permissions.join(" or ")
        )))
    }
}
