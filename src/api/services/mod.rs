pub mod admin;
pub mod analytics;
pub mod auth;
pub mod health;
pub mod me;
pub mod track;

use actix_web::web;

use crate::api::AppState;
use crate::api::constants::API_PREFIX;

pub use health::health_routes;

/// Everything under `/api/v1`
pub fn api_v1_routes(state: &AppState) -> actix_web::Scope {
    web::scope(API_PREFIX)
        .route("/track", web::post().to(track::track))
        .service(auth::auth_routes(
            state.login_per_minute,
            &state.trusted_proxies,
        ))
        .route("/me/permissions", web::get().to(me::my_permissions))
        .route("/analytics/{kind}", web::get().to(analytics::get_analytics))
        .service(admin::admin_routes())
}
