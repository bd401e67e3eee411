//! Legacy flat-role adapter
//!
//! Accounts predating RBAC carry `users.role = 'admin'`. At their first
//! login the account joins `SuperAdmin` and, in the same transaction, its
//! flat role is overwritten with `user`. The flat column is never consulted
//! again, so a later RBAC demotion sticks.

use std::sync::Arc;

use tracing::info;

use super::SUPER_ADMIN_ROLE;
use crate::errors::Result;
use crate::services::audit::{AuditLog, Severity};
use crate::storage::SeaOrmStorage;

use migration::entities::user;

pub const LEGACY_ADMIN_ROLE: &str = "admin";
/// Flat role left behind once an account has been migrated
pub const MIGRATED_FLAT_ROLE: &str = "user";

#[derive(Clone)]
pub struct LegacyRoleAdapter {
    storage: Arc<SeaOrmStorage>,
    audit: AuditLog,
}

impl LegacyRoleAdapter {
    pub fn new(storage: Arc<SeaOrmStorage>, audit: AuditLog) -> Self {
        Self { storage, audit }
    }

    /// One-time translation of the flat `admin` role. Returns whether this
    /// call performed it.
    pub async fn provision(&self, account: &user::Model) -> Result<bool> {
        if account.role != LEGACY_ADMIN_ROLE {
            return Ok(false);
        }

        let migrated = self
            .storage
            .migrate_legacy_role(
                account.id,
                LEGACY_ADMIN_ROLE,
                SUPER_ADMIN_ROLE,
                MIGRATED_FLAT_ROLE,
            )
            .await?;
        if migrated {
            info!(
                "Legacy admin {} migrated into {}",
                account.id, SUPER_ADMIN_ROLE
            );
            self.audit
                .record(
                    Some(account.id),
                    &format!(
                        "Legacy admin account {} migrated into {}",
                        account.id, SUPER_ADMIN_ROLE
                    ),
                    Severity::Warning,
                )
                .await;
        }
        Ok(migrated)
    }
}
