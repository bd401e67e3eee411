//! Audit log endpoints

use actix_web::{Responder, Result as ActixResult, web};

use crate::api::AppState;
use crate::api::constants::{DEFAULT_AUDIT_PAGE, MAX_AUDIT_PAGE};
use crate::rbac::AuthorizationGuard;

use super::helpers::api_result;
use super::types::{AuditLogQuery, PurgeResponse};

/// GET /admin/audit-logs?limit=
pub async fn list_audit_logs(
    guard: AuthorizationGuard,
    state: web::Data<AppState>,
    query: web::Query<AuditLogQuery>,
) -> ActixResult<impl Responder> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_AUDIT_PAGE)
        .clamp(1, MAX_AUDIT_PAGE);
    Ok(api_result(state.audit.list(&guard, limit).await))
}

/// DELETE /admin/audit-logs
pub async fn purge_audit_logs(
    guard: AuthorizationGuard,
    state: web::Data<AppState>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        state
            .audit
            .purge(&guard)
            .await
            .map(|removed| PurgeResponse { removed }),
    ))
}
