use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::errors::Result;

pub mod backend;

pub use backend::{
    ACTIVE_STATUS, DeviceRow, GeoRow, LOCAL_CITY, NewEvent, NewUser, ReferrerRow, RoleRow, SaveRoleRecord,
    SeaOrmStorage, TimelineRow, TotalsRow, UNKNOWN_GEO_SENTINELS,
};

pub struct StorageFactory;

impl StorageFactory {
    /// Open the configured database
    pub async fn create(config: &DatabaseConfig) -> Result<Arc<SeaOrmStorage>> {
        let storage = SeaOrmStorage::new(&config.database_url, config).await?;
        Ok(Arc::new(storage))
    }
}
