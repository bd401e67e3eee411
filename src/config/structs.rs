use serde::{Deserialize, Serialize};

use crate::rbac::policy::NameResolution;

/// Static configuration, loaded once at startup
///
/// Precedence: ENV > config.toml > defaults.
/// ENV prefix `BL`, separator `__`, e.g. `BL__SERVER__PORT=9999`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rbac: RbacConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

impl StaticConfig {
    /// Load from `path` (optional) and the environment.
    ///
    /// Falls back to defaults when the sources cannot be parsed; logging is
    /// not up yet at this point, so problems go to stderr.
    pub fn load_from(path: &str) -> Self {
        match Self::try_load_from(path) {
            Ok(config) => {
                if std::path::Path::new(path).exists() {
                    eprintln!("[INFO] Configuration loaded from: {}", path);
                }
                config
            }
            Err(e) => {
                eprintln!("[ERROR] Failed to load config: {}", e);
                Self::default()
            }
        }
    }

    pub fn try_load_from(path: &str) -> Result<Self, config::ConfigError> {
        use config::{Config, Environment, File};

        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("BL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<StaticConfig>()
    }

    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// Database connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    /// Connect/acquire timeout in seconds
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// Session issuing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret; a random one is generated per process when empty
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_session_minutes")]
    pub session_minutes: u64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default)]
    pub cookie_secure: bool,
    /// Login attempts allowed per client IP per minute
    #[serde(default = "default_login_per_minute")]
    pub login_per_minute: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RbacConfig {
    /// What to do with role or permission names that do not exist
    #[serde(default)]
    pub name_resolution: NameResolution,
    /// Idle lifetime of a session's permission cache
    #[serde(default = "default_session_cache_ttl_secs")]
    pub session_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// GeoLite2-City.mmdb; used instead of the external API when readable
    #[serde(default)]
    pub maxminddb_path: Option<String>,
    /// External GeoIP API, `{ip}` is substituted
    #[serde(default = "default_geoip_api_url")]
    pub geoip_api_url: String,
    /// Hard upper bound on one geo lookup
    #[serde(default = "default_geo_timeout_ms")]
    pub geo_timeout_ms: u64,
    /// Proxies whose X-Forwarded-For is trusted (IPs or CIDRs)
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "biolinker.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_session_minutes() -> u64 {
    60 * 24
}

fn default_cookie_name() -> String {
    "bl_session".to_string()
}

fn default_login_per_minute() -> u32 {
    10
}

fn default_session_cache_ttl_secs() -> u64 {
    15 * 60
}

fn default_geoip_api_url() -> String {
    "http://ip-api.com/json/{ip}?fields=status,country,countryCode,city".to_string()
}

fn default_geo_timeout_ms() -> u64 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            session_minutes: default_session_minutes(),
            cookie_name: default_cookie_name(),
            cookie_secure: false,
            login_per_minute: default_login_per_minute(),
        }
    }
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            name_resolution: NameResolution::default(),
            session_cache_ttl_secs: default_session_cache_ttl_secs(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            maxminddb_path: None,
            geoip_api_url: default_geoip_api_url(),
            geo_timeout_ms: default_geo_timeout_ms(),
            trusted_proxies: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let sample = StaticConfig::generate_sample_config();
        let parsed: StaticConfig = toml::from_str(&sample).expect("sample config parses");
        assert_eq!(parsed.analytics.geo_timeout_ms, 3000);
        assert_eq!(parsed.rbac.name_resolution, NameResolution::ResolveOrSkip);
        assert_eq!(parsed.auth.cookie_name, "bl_session");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let parsed: StaticConfig = toml::from_str(
            r#"
            [rbac]
            name_resolution = "strict"

            [analytics]
            geo_timeout_ms = 500
            "#,
        )
        .expect("partial config parses");
        assert_eq!(parsed.rbac.name_resolution, NameResolution::Strict);
        assert_eq!(parsed.rbac.session_cache_ttl_secs, 900);
        assert_eq!(parsed.analytics.geo_timeout_ms, 500);
        assert_eq!(parsed.server.port, 8080);
    }
}
