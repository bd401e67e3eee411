//! IP blocklist management
//!
//! Blocked addresses are rejected by the ingest path before anything is
//! written. Addresses are stored in canonical textual form so that
//! `::ffff:1.2.3.4`-style variants and stray whitespace do not slip through.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::audit::{AuditLog, Severity};
use crate::errors::{BiolinkerError, Result};
use crate::rbac::{AuthorizationGuard, perms};
use crate::storage::SeaOrmStorage;
use crate::utils::parse_ip;

use migration::entities::ip_blacklist;

#[derive(Debug, Clone, Serialize)]
pub struct BlockedIp {
    pub ip_address: String,
    pub reason: Option<String>,
    pub blocked_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<ip_blacklist::Model> for BlockedIp {
    fn from(model: ip_blacklist::Model) -> Self {
        Self {
            ip_address: model.ip_address,
            reason: model.reason,
            blocked_by: model.blocked_by,
            created_at: model.created_at,
        }
    }
}

#[derive(Clone)]
pub struct Blocklist {
    storage: Arc<SeaOrmStorage>,
    audit: AuditLog,
}

/// Canonical text of `ip`, or `Validation` naming the bad input. IPv4-mapped
/// IPv6 addresses collapse to their IPv4 form.
pub fn normalize_ip(ip: &str) -> Result<String> {
    parse_ip(ip)
        .map(|addr| addr.to_canonical().to_string())
        .ok_or_else(|| BiolinkerError::validation(format!("invalid IP address: '{}'", ip.trim())))
}

impl Blocklist {
    pub fn new(storage: Arc<SeaOrmStorage>, audit: AuditLog) -> Self {
        Self { storage, audit }
    }

    /// Block `ip`; blocking an already blocked address refreshes its reason
    pub async fn block(
        &self,
        guard: &AuthorizationGuard,
        ip: &str,
        reason: Option<String>,
    ) -> Result<String> {
        let actor_id = guard.require_permission(perms::SETTINGS_MANAGE).await?;
        let ip = normalize_ip(ip)?;
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        self.storage
            .upsert_blocked_ip(&ip, reason.clone(), actor_id)
            .await?;
        info!("IP {} blocked by user {}", ip, actor_id);

        self.audit
            .record(
                Some(actor_id),
                &format!(
                    "Blocked IP {} ({})",
                    ip,
                    reason.as_deref().unwrap_or("no reason given")
                ),
                Severity::Warning,
            )
            .await;
        Ok(ip)
    }

    pub async fn unblock(&self, guard: &AuthorizationGuard, ip: &str) -> Result<()> {
        let actor_id = guard.require_permission(perms::SETTINGS_MANAGE).await?;
        let ip = normalize_ip(ip)?;

        if !self.storage.delete_blocked_ip(&ip).await? {
            return Err(BiolinkerError::not_found(format!("IP {} is not blocked", ip)));
        }
        info!("IP {} unblocked by user {}", ip, actor_id);

        self.audit
            .record(
                Some(actor_id),
                &format!("Unblocked IP {}", ip),
                Severity::Warning,
            )
            .await;
        Ok(())
    }

    pub async fn list(&self, guard: &AuthorizationGuard) -> Result<Vec<BlockedIp>> {
        guard.require_permission(perms::SETTINGS_MANAGE).await?;
        let rows = self.storage.list_blocked_ips().await?;
        Ok(rows.into_iter().map(BlockedIp::from).collect())
    }

    /// Unguarded lookup used by ingest. Unparseable text is never blocked.
    pub async fn is_blocked(&self, ip: &str) -> Result<bool> {
        match normalize_ip(ip) {
            Ok(ip) => self.storage.is_ip_blocked(&ip).await,
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_ip_canonicalizes() {
        assert_eq!(normalize_ip(" 10.0.0.1 ").unwrap(), "10.0.0.1");
        assert_eq!(normalize_ip("2001:DB8::1").unwrap(), "2001:db8::1");
        assert_eq!(normalize_ip("::ffff:203.0.113.7").unwrap(), "203.0.113.7");
        assert_eq!(normalize_ip("[::ffff:cb00:7107]:443").unwrap(), "203.0.113.7");
    }

    #[test]
    fn normalize_ip_rejects_garbage() {
        let err = normalize_ip("not-an-ip").unwrap_err();
        assert!(matches!(err, BiolinkerError::Validation(_)));
        assert!(err.message().contains("not-an-ip"));
    }
}
