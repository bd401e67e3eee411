use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};

use super::SeaOrmStorage;
use crate::errors::Result;

use migration::entities::ip_blacklist;

impl SeaOrmStorage {
    pub async fn is_ip_blocked(&self, ip: &str) -> Result<bool> {
        let count = ip_blacklist::Entity::find()
            .filter(ip_blacklist::Column::IpAddress.eq(ip))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// Insert, or refresh the reason of an existing entry
    pub async fn upsert_blocked_ip(
        &self,
        ip: &str,
        reason: Option<String>,
        blocked_by: i64,
    ) -> Result<()> {
        let db = &self.db;
        self.write_retry.run("blocklist upsert", || {
            let insert = ip_blacklist::Entity::insert(ip_blacklist::ActiveModel {
                ip_address: Set(ip.to_string()),
                reason: Set(reason.clone()),
                blocked_by: Set(Some(blocked_by)),
                created_at: Set(Utc::now()),
                ..Default::default()
            })
            .on_conflict(
                OnConflict::column(ip_blacklist::Column::IpAddress)
                    .update_columns([
                        ip_blacklist::Column::Reason,
                        ip_blacklist::Column::BlockedBy,
                    ])
                    .to_owned(),
            );
            async move { insert.exec_without_returning(db).await }
        })
        .await?;
        Ok(())
    }

    /// Returns whether an entry was removed
    pub async fn delete_blocked_ip(&self, ip: &str) -> Result<bool> {
        let result = ip_blacklist::Entity::delete_many()
            .filter(ip_blacklist::Column::IpAddress.eq(ip))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn list_blocked_ips(&self) -> Result<Vec<ip_blacklist::Model>> {
        Ok(ip_blacklist::Entity::find()
            .order_by_desc(ip_blacklist::Column::CreatedAt)
            .order_by_asc(ip_blacklist::Column::IpAddress)
            .all(&self.db)
            .await?)
    }
}
