use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Get the global configuration instance
///
/// Cheap to clone, holds no lock.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config_from() first.")
        .load_full()
}

/// Initialize from an explicit file. Later calls are no-ops.
pub fn init_config_from(path: &str) {
    CONFIG.get_or_init(|| ArcSwap::from_pointee(StaticConfig::load_from(path)));
}
