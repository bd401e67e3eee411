//! External HTTP GeoIP API (ip-api.com and compatible)
//!
//! Results are cached in moka with a TTL; `get_with` gives singleflight so
//! concurrent lookups of one IP issue a single request.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::{trace, warn};
use ureq::Agent;

use super::provider::{GeoInfo, GeoIpLookup};

const GEOIP_CACHE_TTL_SECS: u64 = 15 * 60;
const GEOIP_CACHE_MAX_CAPACITY: u64 = 10_000;

pub struct ExternalApiProvider {
    api_url_template: String,
    agent: Agent,
    /// IP → result; `None` is cached too so failing IPs are not hammered
    cache: Cache<String, Option<GeoInfo>>,
}

impl ExternalApiProvider {
    /// `api_url_template` contains `{ip}`, e.g.
    /// `http://ip-api.com/json/{ip}?fields=status,country,countryCode,city`
    pub fn new(api_url_template: &str, timeout_ms: u64) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_millis(timeout_ms.max(1))))
            .build()
            .into();

        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(GEOIP_CACHE_TTL_SECS))
            .max_capacity(GEOIP_CACHE_MAX_CAPACITY)
            .build();

        Self {
            api_url_template: api_url_template.to_string(),
            agent,
            cache,
        }
    }

    /// Blocking; run inside `spawn_blocking`
    fn fetch_from_api_sync(agent: &Agent, url: &str) -> Option<GeoInfo> {
        let resp = match agent.get(url).call() {
            Ok(r) => r,
            Err(e) => {
                warn!("GeoIP API request to \"{}\" failed: {}", url, e);
                return None;
            }
        };

        let json: serde_json::Value = match resp.into_body().read_json() {
            Ok(j) => j,
            Err(e) => {
                warn!("GeoIP API response from \"{}\" parse failed: {}", url, e);
                return None;
            }
        };

        parse_api_response(&json)
    }

    async fn fetch_from_api(&self, ip: &str) -> Option<GeoInfo> {
        let url = self.api_url_template.replace("{ip}", ip);
        let agent = self.agent.clone();

        tokio::task::spawn_blocking(move || Self::fetch_from_api_sync(&agent, &url))
            .await
            .unwrap_or_else(|e| {
                warn!("GeoIP spawn_blocking failed: {}", e);
                None
            })
    }
}

/// Read the common field spellings; `{"status":"fail"}` means no answer
fn parse_api_response(json: &serde_json::Value) -> Option<GeoInfo> {
    if json["status"].as_str() == Some("fail") {
        trace!("External API returned fail status");
        return None;
    }

    let text = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| json[*k].as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    let info = GeoInfo {
        country: text(&["country", "country_name"]),
        country_code: text(&["countryCode", "country_code"]),
        city: text(&["city"]),
    };

    if info == GeoInfo::default() {
        return None;
    }
    Some(info)
}

#[async_trait]
impl GeoIpLookup for ExternalApiProvider {
    async fn lookup(&self, ip: &str) -> Option<GeoInfo> {
        self.cache
            .get_with(ip.to_string(), async {
                trace!("GeoIP cache miss for {}, fetching from API", ip);
                self.fetch_from_api(ip).await
            })
            .await
    }

    fn name(&self) -> &'static str {
        "ExternalAPI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_ip_api_shape() {
        let info = parse_api_response(&json!({
            "status": "success",
            "country": "Germany",
            "countryCode": "DE",
            "city": "Berlin"
        }))
        .unwrap();
        assert_eq!(info.country.as_deref(), Some("Germany"));
        assert_eq!(info.country_code.as_deref(), Some("DE"));
        assert_eq!(info.city.as_deref(), Some("Berlin"));
    }

    #[test]
    fn parses_snake_case_shape() {
        let info = parse_api_response(&json!({
            "country_name": "Japan",
            "country_code": "JP",
            "city": ""
        }))
        .unwrap();
        assert_eq!(info.country_code.as_deref(), Some("JP"));
        assert_eq!(info.city, None);
    }

    #[test]
    fn fail_status_and_empty_body_are_none() {
        assert!(parse_api_response(&json!({"status": "fail", "message": "private range"})).is_none());
        assert!(parse_api_response(&json!({})).is_none());
    }

    /// Needs network access
    #[tokio::test]
    #[ignore]
    async fn live_lookup_is_cached() {
        let provider = ExternalApiProvider::new(
            "http://ip-api.com/json/{ip}?fields=status,country,countryCode,city",
            3000,
        );
        let first = provider.lookup("8.8.8.8").await;
        assert_eq!(first.as_ref().and_then(|g| g.country_code.as_deref()), Some("US"));
        assert_eq!(first, provider.lookup("8.8.8.8").await);
    }

    #[test]
    fn unroutable_host_times_out() {
        let provider = ExternalApiProvider::new("http://192.0.2.1/{ip}", 200);
        assert!(ExternalApiProvider::fetch_from_api_sync(&provider.agent, "http://192.0.2.1/x").is_none());
    }
}
