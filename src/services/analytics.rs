//! Analytics aggregator
//!
//! Read-only rollups over one owner's events. Every query tolerates zero
//! rows and returns an empty collection (or zeroed totals) instead of an
//! error.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use super::ingest::{
    EVENT_LINK_CLICK, EVENT_PAGE_VIEW, UNKNOWN_CITY, UNKNOWN_COUNTRY, UNKNOWN_COUNTRY_CODE,
};
use super::user_agent::classify;
use crate::errors::Result;
use crate::rbac::{AuthorizationGuard, perms};
use crate::storage::{GeoRow, SeaOrmStorage, UNKNOWN_GEO_SENTINELS};

pub const DEFAULT_TIMELINE_DAYS: u32 = 7;
pub const DEFAULT_REFERRER_LIMIT: u64 = 5;
pub const DEFAULT_RECENT_LIMIT: u64 = 10;
const MAX_TIMELINE_DAYS: u32 = 366;
const MAX_LIST_LIMIT: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelinePoint {
    pub date: String,
    pub page_views: i64,
    pub link_clicks: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceBreakdown {
    pub devices: Vec<NamedCount>,
    pub browsers: Vec<NamedCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferrerCount {
    pub source: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityItem {
    pub id: i64,
    /// `click` or `view`
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub event_type: &'static str,
    pub country: String,
    pub country_code: String,
    pub city: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub total_events: i64,
    pub unique_visitors: i64,
    pub distinct_cities: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryCount {
    pub country: String,
    pub country_code: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityCount {
    pub city: String,
    pub country: String,
    pub country_code: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeoDistribution {
    pub countries: Vec<CountryCount>,
    pub cities: Vec<CityCount>,
    pub total: i64,
}

/// Canonical (country, country_code, city) for display and grouping
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedGeo {
    pub country: String,
    pub country_code: String,
    pub city: String,
}

fn is_unknown(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None => true,
        Some(v) => UNKNOWN_GEO_SENTINELS
            .iter()
            .any(|s| s.eq_ignore_ascii_case(v)),
    }
}

/// Fold every legacy "unknown" marker into `Unknown Origin` / `UN` and
/// `Unknown Sector`. An unknown country forces an unknown code.
pub fn normalize_geo(
    country: Option<&str>,
    country_code: Option<&str>,
    city: Option<&str>,
) -> NormalizedGeo {
    let (country, country_code) = if is_unknown(country) {
        (UNKNOWN_COUNTRY.to_string(), UNKNOWN_COUNTRY_CODE.to_string())
    } else {
        let code = if is_unknown(country_code) {
            UNKNOWN_COUNTRY_CODE.to_string()
        } else {
            country_code.unwrap_or_default().trim().to_ascii_uppercase()
        };
        (country.unwrap_or_default().trim().to_string(), code)
    };
    let city = if is_unknown(city) {
        UNKNOWN_CITY.to_string()
    } else {
        city.unwrap_or_default().trim().to_string()
    };
    NormalizedGeo {
        country,
        country_code,
        city,
    }
}

/// Re-group raw (country, code, city) rows after normalisation
pub fn fold_geo_rows(rows: &[GeoRow]) -> GeoDistribution {
    let mut countries: HashMap<(String, String), i64> = HashMap::new();
    let mut cities: HashMap<NormalizedGeo, i64> = HashMap::new();
    let mut total = 0;

    for row in rows {
        let geo = normalize_geo(
            row.country.as_deref(),
            row.country_code.as_deref(),
            row.city.as_deref(),
        );
        total += row.count;
        *countries
            .entry((geo.country.clone(), geo.country_code.clone()))
            .or_default() += row.count;
        *cities.entry(geo).or_default() += row.count;
    }

    let mut countries: Vec<CountryCount> = countries
        .into_iter()
        .map(|((country, country_code), count)| CountryCount {
            country,
            country_code,
            count,
        })
        .collect();
    countries.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.country.cmp(&b.country))
            .then_with(|| a.country_code.cmp(&b.country_code))
    });

    let mut cities: Vec<CityCount> = cities
        .into_iter()
        .map(|(geo, count)| CityCount {
            city: geo.city,
            country: geo.country,
            country_code: geo.country_code,
            count,
        })
        .collect();
    cities.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.city.cmp(&b.city))
            .then_with(|| a.country.cmp(&b.country))
    });

    GeoDistribution {
        countries,
        cities,
        total,
    }
}

/// Count desc, then name asc; zero-count names never appear
fn ranked(counts: HashMap<String, i64>) -> Vec<NamedCount> {
    let mut out: Vec<NamedCount> = counts
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(name, count)| NamedCount { name, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    out
}

pub struct AnalyticsAggregator {
    storage: Arc<SeaOrmStorage>,
}

impl AnalyticsAggregator {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// Owner whose data the caller may read: themselves, or anyone with
    /// `analytics:view`.
    pub async fn authorize_owner(
        guard: &AuthorizationGuard,
        requested: Option<i64>,
    ) -> Result<i64> {
        let caller = guard.require_authenticated()?;
        match requested {
            Some(owner) if owner != caller => {
                guard.require_permission(perms::ANALYTICS_VIEW).await?;
                Ok(owner)
            }
            _ => Ok(caller),
        }
    }

    /// Days with events within the last `days` UTC days (today included),
    /// ascending. Days without events are omitted.
    pub async fn timeline(&self, owner_id: i64, days: u32) -> Result<Vec<TimelinePoint>> {
        let days = days.clamp(1, MAX_TIMELINE_DAYS);
        let first_day = Utc::now().date_naive() - Duration::days(i64::from(days) - 1);
        let since = first_day.and_time(chrono::NaiveTime::MIN).and_utc();

        let rows = self.storage.timeline_rows(owner_id, since).await?;
        debug!("Timeline for user {}: {} days with events", owner_id, rows.len());
        Ok(rows
            .into_iter()
            .map(|row| TimelinePoint {
                date: row.label,
                page_views: row.page_views,
                link_clicks: row.link_clicks,
            })
            .collect())
    }

    pub async fn device_and_browser_breakdown(&self, owner_id: i64) -> Result<DeviceBreakdown> {
        let rows = self.storage.user_agent_rows(owner_id).await?;

        let mut devices: HashMap<String, i64> = HashMap::new();
        let mut browsers: HashMap<String, i64> = HashMap::new();
        for row in rows {
            let (browser, device) = classify(row.user_agent.as_deref());
            *browsers.entry(browser.to_string()).or_default() += row.count;
            *devices.entry(device.to_string()).or_default() += row.count;
        }

        Ok(DeviceBreakdown {
            devices: ranked(devices),
            browsers: ranked(browsers),
        })
    }

    /// Missing referrers count as `Direct/Organic`, which sorts after named
    /// sources of equal count; remaining ties by source ascending.
    pub async fn referrers(&self, owner_id: i64, limit: u64) -> Result<Vec<ReferrerCount>> {
        let rows = self
            .storage
            .referrer_rows(owner_id, limit.clamp(1, MAX_LIST_LIMIT))
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| ReferrerCount {
                source: row.source,
                count: row.count,
            })
            .collect())
    }

    /// Newest first
    pub async fn recent_activity(&self, owner_id: i64, limit: u64) -> Result<Vec<ActivityItem>> {
        let events = self
            .storage
            .recent_events(owner_id, limit.clamp(1, MAX_LIST_LIMIT))
            .await?;
        Ok(events
            .into_iter()
            .map(|event| {
                let geo = normalize_geo(
                    event.country.as_deref(),
                    event.country_code.as_deref(),
                    event.city.as_deref(),
                );
                let (kind, event_type) = if event.link_id.is_some() {
                    ("click", EVENT_LINK_CLICK)
                } else {
                    ("view", EVENT_PAGE_VIEW)
                };
                ActivityItem {
                    id: event.id,
                    kind,
                    event_type,
                    country: geo.country,
                    country_code: geo.country_code,
                    city: geo.city,
                    timestamp: event.created_at,
                }
            })
            .collect())
    }

    pub async fn totals(&self, owner_id: i64) -> Result<Totals> {
        let row = self.storage.totals(owner_id).await?;
        Ok(Totals {
            total_events: row.total_events,
            unique_visitors: row.unique_visitors,
            distinct_cities: row.unique_cities,
        })
    }

    pub async fn geo_distribution(&self, owner_id: i64) -> Result<GeoDistribution> {
        let rows = self.storage.geo_rows(owner_id).await?;
        Ok(fold_geo_rows(&rows))
    }
}
