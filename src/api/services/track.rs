//! Public tracking endpoint

use actix_web::http::header::{REFERER, USER_AGENT};
use actix_web::{HttpRequest, Responder, Result as ActixResult, web};

use crate::api::AppState;
use crate::errors::BiolinkerError;
use crate::services::{TrackRequest, VisitorContext};
use crate::utils::extract_client_ip;

use super::admin::{ErrorCode, error_from_biolinker, error_with_code, success_response};

fn header_value(req: &HttpRequest, name: actix_web::http::header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn visitor_context(req: &HttpRequest, trusted_proxies: &[String]) -> VisitorContext {
    VisitorContext {
        ip: extract_client_ip(req, trusted_proxies),
        user_agent: header_value(req, USER_AGENT),
        referrer: header_value(req, REFERER),
    }
}

/// POST /track `{link_id?, page_id?}`
pub async fn track(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<TrackRequest>,
) -> ActixResult<impl Responder> {
    let visitor = visitor_context(&req, &state.trusted_proxies);
    Ok(match state.ingest.track(body.into_inner(), visitor).await {
        Ok(ack) => success_response(ack),
        Err(e @ BiolinkerError::NotFound(_)) => {
            error_with_code(&e, ErrorCode::TrackingTargetNotFound)
        }
        Err(e) => error_from_biolinker(&e),
    })
}
