pub mod analytics_event;
pub mod audit_log;
pub mod ip_blacklist;
pub mod link;
pub mod page;
pub mod permission;
pub mod role;
pub mod role_permission;
pub mod user;
pub mod user_role;

pub use analytics_event::Entity as AnalyticsEventEntity;
pub use audit_log::Entity as AuditLogEntity;
pub use ip_blacklist::Entity as IpBlacklistEntity;
pub use link::Entity as LinkEntity;
pub use page::Entity as PageEntity;
pub use permission::Entity as PermissionEntity;
pub use role::Entity as RoleEntity;
pub use role_permission::Entity as RolePermissionEntity;
pub use user::Entity as UserEntity;
pub use user_role::Entity as UserRoleEntity;
