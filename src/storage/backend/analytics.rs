//! Analytics event log queries
//!
//! Every read is scoped to one owner. Grouping happens in SQL; labelling
//! that needs more than string equality (user agents, geo sentinels) is left
//! to the aggregator.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DbBackend, EntityTrait, ExprTrait,
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};
use tracing::trace;

use super::SeaOrmStorage;
use crate::errors::Result;

use migration::entities::{analytics_event, link};

/// Legacy and current "unknown" markers stored in country/country_code/city
pub const UNKNOWN_GEO_SENTINELS: &[&str] = &[
    "",
    "Legacy/Untracked",
    "Unknown",
    "N/A",
    "-",
    "Unknown Origin",
    "Unknown Sector",
    "XX",
    "UN",
];

/// City recorded for private and loopback visitors
pub const LOCAL_CITY: &str = "Local Sector";

const REFERRER_SOURCE_EXPR: &str = "COALESCE(NULLIF(referrer, ''), 'Direct/Organic')";

/// Event to append; `link_id` set means a link click, otherwise a page view
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub user_id: i64,
    pub page_id: i64,
    pub link_id: Option<i64>,
    pub visitor_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub country: String,
    pub country_code: String,
    pub city: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromQueryResult)]
pub struct TimelineRow {
    pub label: String,
    pub page_views: i64,
    pub link_clicks: i64,
}

#[derive(Debug, FromQueryResult)]
pub struct DeviceRow {
    pub user_agent: Option<String>,
    pub count: i64,
}

#[derive(Debug, FromQueryResult)]
pub struct ReferrerRow {
    pub source: String,
    pub count: i64,
}

#[derive(Debug, FromQueryResult)]
pub struct GeoRow {
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub city: Option<String>,
    pub count: i64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TotalsRow {
    pub total_events: i64,
    pub unique_visitors: i64,
    pub unique_cities: i64,
}

impl SeaOrmStorage {
    /// Append one event; for link clicks the link counter moves by exactly
    /// one in the same transaction.
    pub async fn record_event(&self, event: NewEvent) -> Result<i64> {
        let txn = self.db.begin().await?;

        if let Some(link_id) = event.link_id {
            link::Entity::update_many()
                .col_expr(
                    link::Column::ClickCount,
                    Expr::col(link::Column::ClickCount).add(1),
                )
                .filter(link::Column::Id.eq(link_id))
                .exec(&txn)
                .await?;
        }

        let inserted = analytics_event::ActiveModel {
            user_id: Set(event.user_id),
            page_id: Set(event.page_id),
            link_id: Set(event.link_id),
            visitor_id: Set(event.visitor_id),
            ip_address: Set(event.ip_address),
            user_agent: Set(event.user_agent),
            referrer: Set(event.referrer),
            country: Set(Some(event.country)),
            country_code: Set(Some(event.country_code)),
            city: Set(Some(event.city)),
            created_at: Set(event.created_at),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        trace!(
            "Event {} recorded for user {} (link={:?})",
            inserted.id, event.user_id, event.link_id
        );
        Ok(inserted.id)
    }

    fn day_expr(&self) -> Expr {
        match self.db_backend() {
            DbBackend::Sqlite => Expr::cust("strftime('%Y-%m-%d', created_at)"),
            DbBackend::MySql => Expr::cust("DATE_FORMAT(created_at, '%Y-%m-%d')"),
            DbBackend::Postgres | _ => Expr::cust("TO_CHAR(created_at, 'YYYY-MM-DD')"),
        }
    }

    /// Per-day page views and link clicks since `since`, days ascending
    pub async fn timeline_rows(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<TimelineRow>> {
        let day = self.day_expr();
        Ok(analytics_event::Entity::find()
            .select_only()
            .column_as(day.clone(), "label")
            .column_as(Expr::cust("COUNT(*) - COUNT(link_id)"), "page_views")
            .column_as(Expr::cust("COUNT(link_id)"), "link_clicks")
            .filter(analytics_event::Column::UserId.eq(user_id))
            .filter(analytics_event::Column::CreatedAt.gte(since))
            .group_by(day)
            .order_by_asc(Expr::cust("label"))
            .into_model::<TimelineRow>()
            .all(&self.db)
            .await?)
    }

    /// Event counts per distinct user agent string
    pub async fn user_agent_rows(&self, user_id: i64) -> Result<Vec<DeviceRow>> {
        Ok(analytics_event::Entity::find()
            .select_only()
            .column(analytics_event::Column::UserAgent)
            .column_as(analytics_event::Column::Id.count(), "count")
            .filter(analytics_event::Column::UserId.eq(user_id))
            .group_by(analytics_event::Column::UserAgent)
            .into_model::<DeviceRow>()
            .all(&self.db)
            .await?)
    }

    /// Top referrer sources; missing referrers count as `Direct/Organic`,
    /// which sorts after named sources with the same count.
    pub async fn referrer_rows(&self, user_id: i64, limit: u64) -> Result<Vec<ReferrerRow>> {
        Ok(analytics_event::Entity::find()
            .select_only()
            .column_as(Expr::cust(REFERRER_SOURCE_EXPR), "source")
            .column_as(analytics_event::Column::Id.count(), "count")
            .filter(analytics_event::Column::UserId.eq(user_id))
            .group_by(Expr::cust(REFERRER_SOURCE_EXPR))
            .order_by_desc(Expr::cust("count"))
            .order_by_asc(Expr::cust(format!(
                "CASE WHEN {} = 'Direct/Organic' THEN 1 ELSE 0 END",
                REFERRER_SOURCE_EXPR
            )))
            .order_by_asc(Expr::cust("source"))
            .limit(limit)
            .into_model::<ReferrerRow>()
            .all(&self.db)
            .await?)
    }

    /// Newest first, ties broken by id
    pub async fn recent_events(
        &self,
        user_id: i64,
        limit: u64,
    ) -> Result<Vec<analytics_event::Model>> {
        Ok(analytics_event::Entity::find()
            .filter(analytics_event::Column::UserId.eq(user_id))
            .order_by_desc(analytics_event::Column::CreatedAt)
            .order_by_desc(analytics_event::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    pub async fn totals(&self, user_id: i64) -> Result<TotalsRow> {
        let counts: Option<(i64, i64)> = analytics_event::Entity::find()
            .select_only()
            .column_as(Expr::cust("COUNT(*)"), "total_events")
            .column_as(Expr::cust("COUNT(DISTINCT visitor_id)"), "unique_visitors")
            .filter(analytics_event::Column::UserId.eq(user_id))
            .into_tuple()
            .one(&self.db)
            .await?;

        // Sentinels match trimmed and case-insensitively, as in geo_distribution
        let excluded: Vec<String> = UNKNOWN_GEO_SENTINELS
            .iter()
            .chain([&LOCAL_CITY])
            .map(|s| s.to_lowercase())
            .collect();
        let unique_cities: Option<i64> = analytics_event::Entity::find()
            .select_only()
            .column_as(Expr::cust("COUNT(DISTINCT TRIM(city))"), "unique_cities")
            .filter(analytics_event::Column::UserId.eq(user_id))
            .filter(analytics_event::Column::City.is_not_null())
            .filter(Expr::cust("LOWER(TRIM(city))").is_not_in(excluded))
            .into_tuple()
            .one(&self.db)
            .await?;

        let (total_events, unique_visitors) = counts.unwrap_or_default();
        Ok(TotalsRow {
            total_events,
            unique_visitors,
            unique_cities: unique_cities.unwrap_or_default(),
        })
    }

    /// Raw (country, code, city) groups; sentinel folding happens in Rust
    pub async fn geo_rows(&self, user_id: i64) -> Result<Vec<GeoRow>> {
        Ok(analytics_event::Entity::find()
            .select_only()
            .column(analytics_event::Column::Country)
            .column(analytics_event::Column::CountryCode)
            .column(analytics_event::Column::City)
            .column_as(analytics_event::Column::Id.count(), "count")
            .filter(analytics_event::Column::UserId.eq(user_id))
            .group_by(analytics_event::Column::Country)
            .group_by(analytics_event::Column::CountryCode)
            .group_by(analytics_event::Column::City)
            .into_model::<GeoRow>()
            .all(&self.db)
            .await?)
    }
}
