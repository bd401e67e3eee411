//! Session endpoints: login and logout

use std::sync::Arc;
use std::time::Duration;

use actix_governor::{Governor, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError};
use actix_web::dev::ServiceRequest;
use actix_web::http::StatusCode;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, Responder, Result as ActixResult, web};
use governor::middleware::NoOpMiddleware;
use tracing::{debug, error, info, warn};

use crate::api::AppState;
use crate::rbac::SessionIdentity;
use crate::rbac::legacy::MIGRATED_FLAT_ROLE;
use crate::storage::ACTIVE_STATUS;
use crate::utils::ip::{extract_client_ip_from_conn_info, extract_forwarded_ip_from_headers};
use crate::utils::verify_password;

use super::admin::{
    ApiResponse, CookieBuilder, ErrorCode, LoginCredentials, LoginResponse, MessageResponse,
    error_from_biolinker, error_response,
};

/// Rate-limit key: the client IP, honouring the trusted proxy list
#[derive(Clone)]
pub struct LoginKeyExtractor {
    trusted_proxies: Arc<[String]>,
}

impl LoginKeyExtractor {
    pub fn new(trusted_proxies: &[String]) -> Self {
        Self {
            trusted_proxies: trusted_proxies.into(),
        }
    }
}

impl KeyExtractor for LoginKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> Result<Self::Key, Self::KeyExtractionError> {
        let key = extract_client_ip_from_conn_info(
            &req.connection_info(),
            &self.trusted_proxies,
            || extract_forwarded_ip_from_headers(req.headers()),
        )
        .unwrap_or_else(|| "unknown".to_string());
        debug!("Login rate limit key: {}", key);
        Ok(key)
    }
}

/// `per_minute` attempts per client IP, refilled evenly over the minute
pub fn login_rate_limiter(
    per_minute: u32,
    trusted_proxies: &[String],
) -> Governor<LoginKeyExtractor, NoOpMiddleware> {
    let per_minute = per_minute.max(1);
    let config = GovernorConfigBuilder::default()
        .period(Duration::from_millis(60_000 / u64::from(per_minute)))
        .burst_size(per_minute)
        .key_extractor(LoginKeyExtractor::new(trusted_proxies))
        .finish()
        .expect("Invalid rate limit config");

    debug!("Login rate limiter created: {} req/min", per_minute);
    Governor::new(&config)
}

fn invalid_credentials() -> HttpResponse {
    error_response(
        StatusCode::UNAUTHORIZED,
        ErrorCode::AuthFailed,
        "Invalid email or password",
    )
}

/// POST /auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginCredentials>,
) -> ActixResult<impl Responder> {
    let credentials = body.into_inner();

    let account = match state.storage.find_user_by_email(&credentials.email).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            info!("Login failed: unknown account");
            return Ok(invalid_credentials());
        }
        Err(e) => return Ok(error_from_biolinker(&e)),
    };

    match verify_password(&credentials.password, &account.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            info!("Login failed for user {}: wrong password", account.id);
            return Ok(invalid_credentials());
        }
        Err(e) => {
            error!("Password verification error for user {}: {}", account.id, e);
            return Ok(invalid_credentials());
        }
    }

    if account.status != ACTIVE_STATUS {
        warn!("Login refused for inactive user {}", account.id);
        return Ok(error_response(
            StatusCode::UNAUTHORIZED,
            ErrorCode::AccountInactive,
            "Account is inactive",
        ));
    }

    let flat_role = match state.legacy.provision(&account).await {
        Ok(true) => MIGRATED_FLAT_ROLE,
        Ok(false) => account.role.as_str(),
        Err(e) => return Ok(error_from_biolinker(&e)),
    };

    let issued = match state.jwt.issue(account.id, flat_role) {
        Ok(issued) => issued,
        Err(e) => {
            error!("Failed to issue session token: {}", e);
            return Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalServerError,
                "Failed to issue session",
            ));
        }
    };

    let roles = match state.permissions.roles_of(account.id).await {
        Ok(roles) => roles,
        Err(e) => return Ok(error_from_biolinker(&e)),
    };

    info!("User {} logged in (session {})", account.id, issued.session_id);

    let cookie = CookieBuilder::new(&state.cookie_name, state.cookie_secure)
        .session_cookie(issued.token.clone(), issued.expires_in);

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: ErrorCode::Success as i32,
            message: "Login successful".to_string(),
            data: Some(LoginResponse {
                token: issued.token,
                user_id: account.id,
                expires_in: issued.expires_in,
                roles,
            }),
        }))
}

/// POST /auth/logout: revokes the session token and expires the cookie
pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> ActixResult<impl Responder> {
    let identity = req.extensions().get::<SessionIdentity>().cloned();
    if let Some(identity) = identity {
        state.sessions.revoke(&identity.session_id);
        info!(
            "User {} logged out (session {})",
            identity.user_id, identity.session_id
        );
    }

    let cookie = CookieBuilder::new(&state.cookie_name, state.cookie_secure).expired_cookie();
    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: ErrorCode::Success as i32,
            message: "OK".to_string(),
            data: Some(MessageResponse {
                message: "Logout successful".to_string(),
            }),
        }))
}

/// `/auth` scope; login is rate limited per client IP
pub fn auth_routes(login_per_minute: u32, trusted_proxies: &[String]) -> actix_web::Scope {
    web::scope("/auth")
        .route(
            "/login",
            web::post()
                .to(login)
                .wrap(login_rate_limiter(login_per_minute, trusted_proxies)),
        )
        .route("/logout", web::post().to(logout))
}
