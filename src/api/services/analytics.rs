//! Analytics read endpoints: `/analytics/{kind}`

use actix_web::http::StatusCode;
use actix_web::{Responder, Result as ActixResult, web};
use strum::EnumString;

use crate::api::AppState;
use crate::rbac::AuthorizationGuard;
use crate::services::AnalyticsAggregator;
use crate::services::analytics::{
    DEFAULT_RECENT_LIMIT, DEFAULT_REFERRER_LIMIT, DEFAULT_TIMELINE_DAYS,
};

use super::admin::{AnalyticsQuery, ErrorCode, api_result, error_from_biolinker, error_response};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum AnalyticsKind {
    Timeline,
    Devices,
    Referrers,
    Recent,
    Totals,
    Geo,
}

/// GET /analytics/{kind}?user_id=&days=&limit=
pub async fn get_analytics(
    guard: AuthorizationGuard,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<AnalyticsQuery>,
) -> ActixResult<impl Responder> {
    let owner = match AnalyticsAggregator::authorize_owner(&guard, query.user_id).await {
        Ok(owner) => owner,
        Err(e) => return Ok(error_from_biolinker(&e)),
    };

    let Ok(kind) = path.parse::<AnalyticsKind>() else {
        return Ok(error_response(
            StatusCode::NOT_FOUND,
            ErrorCode::AnalyticsUnknownKind,
            "Unknown analytics view",
        ));
    };

    let analytics = &state.analytics;
    Ok(match kind {
        AnalyticsKind::Timeline => api_result(
            analytics
                .timeline(owner, query.days.unwrap_or(DEFAULT_TIMELINE_DAYS))
                .await,
        ),
        AnalyticsKind::Devices => api_result(analytics.device_and_browser_breakdown(owner).await),
        AnalyticsKind::Referrers => api_result(
            analytics
                .referrers(owner, query.limit.unwrap_or(DEFAULT_REFERRER_LIMIT))
                .await,
        ),
        AnalyticsKind::Recent => api_result(
            analytics
                .recent_activity(owner, query.limit.unwrap_or(DEFAULT_RECENT_LIMIT))
                .await,
        ),
        AnalyticsKind::Totals => api_result(analytics.totals(owner).await),
        AnalyticsKind::Geo => api_result(analytics.geo_distribution(owner).await),
    })
}
