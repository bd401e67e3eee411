use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::StaticConfig;
use crate::services::GeoIpProvider;
use crate::storage::{SeaOrmStorage, StorageFactory};

pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub geoip: GeoIpProvider,
}

/// Install the TLS provider, connect storage (running migrations) and pick
/// the GeoIP provider
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    // A second install (tests, embedding) is harmless
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    let storage = StorageFactory::create(&config.database)
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());

    let geoip = GeoIpProvider::new(&config.analytics);

    check_security_settings(config);

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext { storage, geoip })
}

fn check_security_settings(config: &StaticConfig) {
    if config.auth.jwt_secret.is_empty() {
        warn!("auth.jwt_secret is empty: sessions will not survive a restart");
    }
    if !config.auth.cookie_secure {
        warn!("auth.cookie_secure is off: session cookies are sent over plain HTTP");
    }
    if config.analytics.trusted_proxies.is_empty() {
        warn!(
            "No trusted proxies configured: connections from private IPs will use X-Forwarded-For"
        );
    } else {
        info!(
            "Trusted proxies: {:?}",
            config.analytics.trusted_proxies
        );
    }
}
