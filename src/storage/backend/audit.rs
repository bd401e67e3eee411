use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, EntityTrait, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::info;

use super::SeaOrmStorage;
use crate::errors::Result;

use migration::entities::audit_log;

impl SeaOrmStorage {
    pub async fn insert_audit_log(
        &self,
        actor_id: Option<i64>,
        message: &str,
        severity: &str,
    ) -> Result<audit_log::Model> {
        let db = &self.db;
        let model = self.write_retry.run("audit insert", || {
            let entry = audit_log::ActiveModel {
                actor_id: Set(actor_id),
                message: Set(message.to_string()),
                severity: Set(severity.to_string()),
                created_at: Set(Utc::now()),
                ..Default::default()
            };
            async move { entry.insert(db).await }
        })
        .await?;
        Ok(model)
    }

    /// Newest first
    pub async fn list_audit_logs(&self, limit: u64) -> Result<Vec<audit_log::Model>> {
        Ok(audit_log::Entity::find()
            .order_by_desc(audit_log::Column::CreatedAt)
            .order_by_desc(audit_log::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    /// Delete every entry, then record the purge itself with `severity`.
    /// Returns rows removed.
    pub async fn purge_audit_logs(&self, actor_id: i64, severity: &str) -> Result<u64> {
        let txn = self.db.begin().await?;

        let removed = audit_log::Entity::delete_many()
            .exec(&txn)
            .await?
            .rows_affected;

        audit_log::ActiveModel {
            actor_id: Set(Some(actor_id)),
            message: Set(format!("Audit log purged ({} entries removed)", removed)),
            severity: Set(severity.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        info!("Audit log purged by user {}: {} entries", actor_id, removed);
        Ok(removed)
    }
}
