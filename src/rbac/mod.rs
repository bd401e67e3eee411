//! Role-based access control
//!
//! Users hold zero or more roles, roles bundle permissions, and a user's
//! effective permissions are the union over all of their roles. The join
//! tables are the only source of truth; the legacy flat `role` column is
//! read once at login by [`legacy`].

pub mod cache;
pub mod guard;
pub mod legacy;
pub mod policy;
pub mod store;

pub use cache::{CacheScope, SessionCacheRegistry, SessionPermissionCache};
pub use guard::AuthorizationGuard;
pub use legacy::LegacyRoleAdapter;
pub use policy::{NameResolution, Resolved};
pub use store::{
    PermissionGroup, PermissionInfo, PermissionStore, RoleSaved, RoleWithPermissions,
    RolesAssigned, SaveRoleRequest,
};

/// Authenticated caller, as decoded from the session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_id: i64,
    /// Token `jti`; keys the per-session permission cache
    pub session_id: String,
    /// Legacy flat role carried in the token, informational only
    pub legacy_role: String,
}

/// Seeded permission names
pub mod perms {
    pub const USERS_VIEW: &str = "users:view";
    pub const USERS_EDIT: &str = "users:edit";
    pub const ANALYTICS_VIEW: &str = "analytics:view";
    pub const RBAC_VIEW: &str = "rbac:view";
    pub const RBAC_MANAGE: &str = "rbac:manage";
    pub const SETTINGS_MANAGE: &str = "settings:manage";
    pub const LOGS_VIEW: &str = "logs:view";
    pub const LOGS_MANAGE: &str = "logs:manage";
}

/// Role every legacy `admin` account is migrated into
pub const SUPER_ADMIN_ROLE: &str = "SuperAdmin";
