//! Role and permission management endpoints

use actix_web::{HttpResponse, Responder, Result as ActixResult, web};

use crate::api::AppState;
use crate::errors::BiolinkerError;
use crate::rbac::{AuthorizationGuard, SaveRoleRequest, perms};

use super::error_code::ErrorCode;
use super::helpers::{api_result, error_from_biolinker, error_with_code, success_response};
use super::types::AssignRolesRequest;

fn rbac_error(err: &BiolinkerError, not_found: ErrorCode) -> HttpResponse {
    match err {
        BiolinkerError::Validation(_) => error_with_code(err, ErrorCode::RbacValidation),
        BiolinkerError::NotFound(_) => error_with_code(err, not_found),
        _ => error_from_biolinker(err),
    }
}

/// GET /admin/roles
pub async fn list_roles(
    guard: AuthorizationGuard,
    state: web::Data<AppState>,
) -> ActixResult<impl Responder> {
    let result = async {
        guard
            .require_any_permission(&[perms::RBAC_VIEW, perms::RBAC_MANAGE])
            .await?;
        state.permissions.list_roles().await
    }
    .await;
    Ok(api_result(result))
}

/// GET /admin/permissions
pub async fn list_permissions(
    guard: AuthorizationGuard,
    state: web::Data<AppState>,
) -> ActixResult<impl Responder> {
    let result = async {
        guard
            .require_any_permission(&[perms::RBAC_VIEW, perms::RBAC_MANAGE])
            .await?;
        state.permissions.list_permissions().await
    }
    .await;
    Ok(api_result(result))
}

/// POST /admin/roles
pub async fn save_role(
    guard: AuthorizationGuard,
    state: web::Data<AppState>,
    body: web::Json<SaveRoleRequest>,
) -> ActixResult<impl Responder> {
    Ok(
        match state.permissions.save_role(&guard, body.into_inner()).await {
            Ok(saved) => success_response(saved),
            Err(e) => rbac_error(&e, ErrorCode::RoleNotFound),
        },
    )
}

/// PUT /admin/users/{id}/roles
pub async fn assign_roles(
    guard: AuthorizationGuard,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<AssignRolesRequest>,
) -> ActixResult<impl Responder> {
    let user_id = path.into_inner();
    Ok(
        match state
            .permissions
            .assign_roles(&guard, user_id, &body.roles)
            .await
        {
            Ok(assigned) => success_response(assigned),
            Err(e) => rbac_error(&e, ErrorCode::UserNotFound),
        },
    )
}
