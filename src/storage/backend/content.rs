//! Ownership lookups on pages and links
//!
//! Page and link CRUD belongs to the content service. What lives here is the
//! resolution the ingest path needs, plus plain inserts used for seeding.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, JoinType, QueryFilter,
    QuerySelect, RelationTrait,
};
use tracing::trace;

use super::SeaOrmStorage;
use crate::errors::Result;

use migration::entities::{link, page};

impl SeaOrmStorage {
    /// `(user_id, page_id)` owning a link
    pub async fn resolve_link_owner(&self, link_id: i64) -> Result<Option<(i64, i64)>> {
        let owner = link::Entity::find()
            .select_only()
            .column(page::Column::UserId)
            .column(link::Column::PageId)
            .join(JoinType::InnerJoin, link::Relation::Page.def())
            .filter(link::Column::Id.eq(link_id))
            .into_tuple::<(i64, i64)>()
            .one(&self.db)
            .await?;
        trace!("resolve_link_owner({}) -> {:?}", link_id, owner);
        Ok(owner)
    }

    /// `user_id` owning a page
    pub async fn resolve_page_owner(&self, page_id: i64) -> Result<Option<i64>> {
        let owner = page::Entity::find()
            .select_only()
            .column(page::Column::UserId)
            .filter(page::Column::Id.eq(page_id))
            .into_tuple::<i64>()
            .one(&self.db)
            .await?;
        trace!("resolve_page_owner({}) -> {:?}", page_id, owner);
        Ok(owner)
    }

    pub async fn create_page(&self, user_id: i64, slug: &str, title: &str) -> Result<page::Model> {
        Ok(page::ActiveModel {
            user_id: Set(user_id),
            slug: Set(slug.to_string()),
            title: Set(title.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?)
    }

    pub async fn create_link(&self, page_id: i64, title: &str, url: &str) -> Result<link::Model> {
        Ok(link::ActiveModel {
            page_id: Set(page_id),
            title: Set(title.to_string()),
            url: Set(url.to_string()),
            click_count: Set(0),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?)
    }
}
