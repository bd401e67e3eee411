//! GeoIP provider abstraction
//!
//! Picked once at startup:
//! 1. `maxminddb_path` configured and readable → [`MaxMindProvider`]
//! 2. otherwise → [`ExternalApiProvider`]

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::external_api::ExternalApiProvider;
use super::maxmind::MaxMindProvider;
use crate::config::AnalyticsConfig;

/// Location of one IP
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoInfo {
    /// Country name (e.g. "Germany")
    pub country: Option<String>,
    /// ISO 3166-1 alpha-2 code (e.g. "DE")
    pub country_code: Option<String>,
    pub city: Option<String>,
}

/// One IP → location lookup. `None` means "could not tell".
#[async_trait]
pub trait GeoIpLookup: Send + Sync {
    async fn lookup(&self, ip: &str) -> Option<GeoInfo>;

    /// Name for logs
    fn name(&self) -> &'static str;
}

/// Shared handle to the configured lookup
#[derive(Clone)]
pub struct GeoIpProvider {
    inner: Arc<dyn GeoIpLookup>,
}

impl GeoIpProvider {
    pub fn new(config: &AnalyticsConfig) -> Self {
        let external = || -> Arc<dyn GeoIpLookup> {
            Arc::new(ExternalApiProvider::new(
                &config.geoip_api_url,
                config.geo_timeout_ms,
            ))
        };

        let inner: Arc<dyn GeoIpLookup> = match config.maxminddb_path.as_deref() {
            Some(path) if !path.is_empty() => match MaxMindProvider::new(path) {
                Ok(provider) => {
                    info!("GeoIP: Using MaxMind database at {}", path);
                    Arc::new(provider)
                }
                Err(e) => {
                    warn!(
                        "GeoIP: Failed to load MaxMind database at {}: {}, falling back to external API",
                        path, e
                    );
                    external()
                }
            },
            _ => {
                debug!("GeoIP: No MaxMind database configured, using external API");
                external()
            }
        };

        info!("GeoIP: Initialized with {} provider", inner.name());
        Self { inner }
    }

    /// Wrap an arbitrary lookup (tests, custom providers)
    pub fn from_lookup(inner: Arc<dyn GeoIpLookup>) -> Self {
        Self { inner }
    }

    pub async fn lookup(&self, ip: &str) -> Option<GeoInfo> {
        self.inner.lookup(ip).await
    }

    pub fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}
