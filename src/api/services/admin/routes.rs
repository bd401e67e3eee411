//! Admin route table, mounted under `/api/v1/admin`

use actix_web::web;

use super::audit::{list_audit_logs, purge_audit_logs};
use super::blacklist::{block_ip, list_blacklist, unblock_ip};
use super::rbac::{assign_roles, list_permissions, list_roles, save_role};

/// - GET/POST /roles
/// - GET /permissions
/// - PUT /users/{id}/roles
pub fn rbac_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/roles", web::get().to(list_roles))
        .route("/roles", web::post().to(save_role))
        .route("/permissions", web::get().to(list_permissions))
        .route("/users/{id}/roles", web::put().to(assign_roles));
}

/// - GET/DELETE /audit-logs
pub fn audit_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/audit-logs", web::get().to(list_audit_logs))
        .route("/audit-logs", web::delete().to(purge_audit_logs));
}

/// - GET/POST /blacklist
/// - DELETE /blacklist/{ip}
pub fn blacklist_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/blacklist", web::get().to(list_blacklist))
        .route("/blacklist", web::post().to(block_ip))
        .route("/blacklist/{ip}", web::delete().to(unblock_ip));
}

pub fn admin_routes() -> actix_web::Scope {
    web::scope("/admin")
        .configure(rbac_routes)
        .configure(audit_routes)
        .configure(blacklist_routes)
}
