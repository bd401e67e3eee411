//! Analytics ingest
//!
//! Records one page view or link click:
//! 1. resolve the owning user (and page, for links)
//! 2. reject blocked IPs
//! 3. compute the daily visitor fingerprint
//! 4. resolve geo-location (never fails, see [`GeoResolver`])
//! 5. bump the click counter and insert the event in one transaction

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, trace, warn};

use super::blocklist::Blocklist;
use super::geoip::{GeoInfo, GeoIpProvider};
use crate::errors::{BiolinkerError, Result};
use crate::storage::{LOCAL_CITY, NewEvent, SeaOrmStorage};
use crate::utils::{is_private_or_local, parse_ip};

pub const LOCAL_COUNTRY: &str = "Local Network";
pub const LOCAL_COUNTRY_CODE: &str = "LO";
pub const UNKNOWN_COUNTRY: &str = "Unknown Origin";
pub const UNKNOWN_COUNTRY_CODE: &str = "UN";
pub const UNKNOWN_CITY: &str = "Unknown Sector";

pub const EVENT_LINK_CLICK: &str = "link_click";
pub const EVENT_PAGE_VIEW: &str = "page_view";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackRequest {
    pub link_id: Option<i64>,
    pub page_id: Option<i64>,
}

/// What the transport layer knows about the visitor
#[derive(Debug, Clone, Default)]
pub struct VisitorContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackAck {
    pub event_id: i64,
    pub event_type: &'static str,
}

/// Resolved location as stored on the event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoLocation {
    pub country: String,
    pub country_code: String,
    pub city: String,
}

impl GeoLocation {
    pub fn local() -> Self {
        Self {
            country: LOCAL_COUNTRY.to_string(),
            country_code: LOCAL_COUNTRY_CODE.to_string(),
            city: LOCAL_CITY.to_string(),
        }
    }

    pub fn unknown() -> Self {
        Self {
            country: UNKNOWN_COUNTRY.to_string(),
            country_code: UNKNOWN_COUNTRY_CODE.to_string(),
            city: UNKNOWN_CITY.to_string(),
        }
    }

    /// Fields the provider left out fall back to the unknown sentinels
    fn from_info(info: GeoInfo) -> Self {
        Self {
            country: info.country.unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()),
            country_code: info
                .country_code
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or_else(|| UNKNOWN_COUNTRY_CODE.to_string()),
            city: info.city.unwrap_or_else(|| UNKNOWN_CITY.to_string()),
        }
    }
}

/// Approximate unique-visitor key: hex SHA-256 of `ip|user_agent|YYYY-MM-DD`.
///
/// Stable for one client within a UTC day and rotated daily. Distinct counts
/// over several days therefore count a returning visitor once per day, and
/// clients sharing an IP and user agent collapse into one.
pub fn daily_visitor_fingerprint(ip: &str, user_agent: &str, day: NaiveDate) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}|{}|{}", ip, user_agent, day.format("%Y-%m-%d")).as_bytes());
    hex::encode(hasher.finalize())
}

/// Best-effort geo-resolution. Local and unparseable addresses never hit
/// the provider; provider errors and timeouts become the unknown sentinel.
#[derive(Clone)]
pub struct GeoResolver {
    provider: GeoIpProvider,
    timeout: Duration,
}

impl GeoResolver {
    pub fn new(provider: GeoIpProvider, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub async fn resolve(&self, ip: Option<&str>) -> GeoLocation {
        let Some(addr) = ip.and_then(parse_ip) else {
            return GeoLocation::local();
        };
        if is_private_or_local(&addr) {
            return GeoLocation::local();
        }

        let ip_text = addr.to_canonical().to_string();
        match tokio::time::timeout(self.timeout, self.provider.lookup(&ip_text)).await {
            Ok(Some(info)) => {
                trace!("Geo for {}: {:?}", ip_text, info);
                GeoLocation::from_info(info)
            }
            Ok(None) => {
                debug!("{} returned nothing for {}", self.provider.provider_name(), ip_text);
                GeoLocation::unknown()
            }
            Err(_) => {
                warn!(
                    "Geo lookup for {} timed out after {:?}",
                    ip_text, self.timeout
                );
                GeoLocation::unknown()
            }
        }
    }
}

pub struct IngestService {
    storage: Arc<SeaOrmStorage>,
    blocklist: Blocklist,
    geo: GeoResolver,
}

impl IngestService {
    pub fn new(storage: Arc<SeaOrmStorage>, blocklist: Blocklist, geo: GeoResolver) -> Self {
        Self {
            storage,
            blocklist,
            geo,
        }
    }

    /// Owner `(user_id, page_id)` of the tracked target. A link wins over a
    /// page when both are given.
    async fn resolve_target(&self, request: &TrackRequest) -> Result<(i64, i64)> {
        let resolved = match (request.link_id, request.page_id) {
            (Some(link_id), _) => self.storage.resolve_link_owner(link_id).await?,
            (None, Some(page_id)) => self
                .storage
                .resolve_page_owner(page_id)
                .await?
                .map(|user_id| (user_id, page_id)),
            (None, None) => None,
        };
        resolved.ok_or_else(|| BiolinkerError::not_found("tracking target not found"))
    }

    pub async fn track(&self, request: TrackRequest, visitor: VisitorContext) -> Result<TrackAck> {
        let (user_id, page_id) = self.resolve_target(&request).await?;

        if let Some(ip) = visitor.ip.as_deref() {
            if self.blocklist.is_blocked(ip).await? {
                debug!("Rejected tracking from blocked IP {}", ip);
                return Err(BiolinkerError::blocked("access denied"));
            }
        }

        let now = Utc::now();
        let visitor_id = daily_visitor_fingerprint(
            visitor.ip.as_deref().unwrap_or_default(),
            visitor.user_agent.as_deref().unwrap_or_default(),
            now.date_naive(),
        );
        let location = self.geo.resolve(visitor.ip.as_deref()).await;

        let event_id = self
            .storage
            .record_event(NewEvent {
                user_id,
                page_id,
                link_id: request.link_id,
                visitor_id,
                ip_address: visitor.ip,
                user_agent: visitor.user_agent,
                referrer: visitor.referrer.filter(|r| !r.trim().is_empty()),
                country: location.country,
                country_code: location.country_code,
                city: location.city,
                created_at: now,
            })
            .await?;

        let event_type = if request.link_id.is_some() {
            EVENT_LINK_CLICK
        } else {
            EVENT_PAGE_VIEW
        };
        debug!("Tracked {} {} for user {}", event_type, event_id, user_id);
        Ok(TrackAck {
            event_id,
            event_type,
        })
    }
}
