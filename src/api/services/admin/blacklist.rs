//! IP blocklist endpoints

use actix_web::{HttpResponse, Responder, Result as ActixResult, web};

use crate::api::AppState;
use crate::errors::BiolinkerError;
use crate::rbac::AuthorizationGuard;

use super::error_code::ErrorCode;
use super::helpers::{api_result, error_from_biolinker, error_with_code, success_response};
use super::types::{BlockIpRequest, MessageResponse};

fn blacklist_error(err: &BiolinkerError) -> HttpResponse {
    match err {
        BiolinkerError::Validation(_) => error_with_code(err, ErrorCode::BlacklistInvalidIp),
        BiolinkerError::NotFound(_) => error_with_code(err, ErrorCode::BlacklistEntryNotFound),
        _ => error_from_biolinker(err),
    }
}

/// GET /admin/blacklist
pub async fn list_blacklist(
    guard: AuthorizationGuard,
    state: web::Data<AppState>,
) -> ActixResult<impl Responder> {
    Ok(api_result(state.blocklist.list(&guard).await))
}

/// POST /admin/blacklist
pub async fn block_ip(
    guard: AuthorizationGuard,
    state: web::Data<AppState>,
    body: web::Json<BlockIpRequest>,
) -> ActixResult<impl Responder> {
    let body = body.into_inner();
    Ok(
        match state
            .blocklist
            .block(&guard, &body.ip_address, body.reason)
            .await
        {
            Ok(ip) => success_response(MessageResponse {
                message: format!("{} blocked", ip),
            }),
            Err(e) => blacklist_error(&e),
        },
    )
}

/// DELETE /admin/blacklist/{ip}
pub async fn unblock_ip(
    guard: AuthorizationGuard,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let ip = path.into_inner();
    Ok(match state.blocklist.unblock(&guard, &ip).await {
        Ok(()) => success_response(MessageResponse {
            message: format!("{} unblocked", ip.trim()),
        }),
        Err(e) => blacklist_error(&e),
    })
}
