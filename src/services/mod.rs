//! Service layer
//!
//! Business logic shared by the HTTP API and the binary: audit trail,
//! IP blocklist, analytics ingest and aggregation, GeoIP lookups.

pub mod analytics;
pub mod audit;
pub mod blocklist;
pub mod geoip;
pub mod ingest;
pub mod user_agent;

pub use analytics::{AnalyticsAggregator, DeviceBreakdown, GeoDistribution, Totals};
pub use audit::{AuditEntry, AuditLog, Severity};
pub use blocklist::{BlockedIp, Blocklist};
pub use geoip::{GeoInfo, GeoIpLookup, GeoIpProvider};
pub use ingest::{
    GeoLocation, GeoResolver, IngestService, TrackAck, TrackRequest, VisitorContext,
    daily_visitor_fingerprint,
};
