//! Caller's own roles and permissions

use actix_web::{Responder, Result as ActixResult, web};

use crate::api::AppState;
use crate::errors::BiolinkerError;
use crate::rbac::AuthorizationGuard;

use super::admin::{MyPermissionsResponse, api_result};

/// GET /me/permissions
pub async fn my_permissions(
    guard: AuthorizationGuard,
    state: web::Data<AppState>,
) -> ActixResult<impl Responder> {
    let result = async {
        let user_id = guard.require_authenticated()?;
        let permissions = guard.permissions().await?.to_vec();
        let roles = state.permissions.roles_of(user_id).await?;
        Ok::<_, BiolinkerError>(MyPermissionsResponse {
            user_id,
            roles,
            permissions,
        })
    }
    .await;
    Ok(api_result(result))
}
