//! GeoIP lookup
//!
//! - MaxMind GeoLite2 local database
//! - external HTTP API fallback (ip-api.com)

mod external_api;
mod maxmind;
mod provider;

pub use external_api::ExternalApiProvider;
pub use maxmind::MaxMindProvider;
pub use provider::{GeoInfo, GeoIpLookup, GeoIpProvider};
