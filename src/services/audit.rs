//! Audit trail of sensitive mutations
//!
//! Entries are append-only. The only bulk operation is [`AuditLog::purge`],
//! which itself leaves a `critical` entry behind.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};
use tracing::{error, info};

use crate::errors::Result;
use crate::rbac::{AuthorizationGuard, perms};
use crate::storage::SeaOrmStorage;

use migration::entities::audit_log;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub actor_id: Option<i64>,
    pub message: String,
    pub severity: String,
    pub created_at: DateTime<Utc>,
}

impl From<audit_log::Model> for AuditEntry {
    fn from(model: audit_log::Model) -> Self {
        Self {
            id: model.id,
            actor_id: model.actor_id,
            message: model.message,
            severity: model.severity,
            created_at: model.created_at,
        }
    }
}

#[derive(Clone)]
pub struct AuditLog {
    storage: Arc<SeaOrmStorage>,
}

impl AuditLog {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn log_event(
        &self,
        actor_id: Option<i64>,
        message: &str,
        severity: Severity,
    ) -> Result<AuditEntry> {
        let model = self
            .storage
            .insert_audit_log(actor_id, message, severity.as_ref())
            .await?;
        info!(
            "Audit [{}] actor={:?}: {}",
            severity, actor_id, message
        );
        Ok(model.into())
    }

    /// Best-effort append after a mutation has already committed. A failure
    /// is logged and does not undo or fail the mutation.
    pub async fn record(&self, actor_id: Option<i64>, message: &str, severity: Severity) {
        if let Err(e) = self.log_event(actor_id, message, severity).await {
            error!("Failed to write audit entry \"{}\": {}", message, e);
        }
    }

    /// Newest first
    pub async fn list(&self, guard: &AuthorizationGuard, limit: u64) -> Result<Vec<AuditEntry>> {
        guard.require_permission(perms::LOGS_VIEW).await?;
        let rows = self.storage.list_audit_logs(limit.max(1)).await?;
        Ok(rows.into_iter().map(AuditEntry::from).collect())
    }

    /// Delete every entry; returns how many were removed
    pub async fn purge(&self, guard: &AuthorizationGuard) -> Result<u64> {
        let actor_id = guard.require_permission(perms::LOGS_MANAGE).await?;
        self.storage
            .purge_audit_logs(actor_id, Severity::Critical.as_ref())
            .await
    }
}
