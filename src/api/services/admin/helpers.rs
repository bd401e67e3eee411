//! Response and cookie helpers

use actix_web::HttpResponse;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::StatusCode;
use serde::Serialize;
use tracing::debug;

use crate::errors::BiolinkerError;

use super::error_code::ErrorCode;
use super::types::ApiResponse;

pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// Status and code from the error kind. Storage detail never leaves the
/// process; it was logged where the error was raised.
pub fn error_from_biolinker(err: &BiolinkerError) -> HttpResponse {
    error_with_code(err, ErrorCode::from(err))
}

/// Like [`error_from_biolinker`] with a domain-specific code
pub fn error_with_code(err: &BiolinkerError, code: ErrorCode) -> HttpResponse {
    debug!("Request failed: {}", err);
    error_response(err.http_status(), code, err.public_message())
}

/// Result → HttpResponse
pub fn api_result<T, E>(result: Result<T, E>) -> HttpResponse
where
    T: Serialize,
    E: Into<BiolinkerError>,
{
    match result {
        Ok(data) => success_response(data),
        Err(e) => error_from_biolinker(&e.into()),
    }
}

/// Builds the session cookie and its expired counterpart
pub struct CookieBuilder<'a> {
    name: &'a str,
    secure: bool,
}

impl<'a> CookieBuilder<'a> {
    pub fn new(name: &'a str, secure: bool) -> Self {
        Self { name, secure }
    }

    fn build(&self, value: String, max_age: actix_web::cookie::time::Duration) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.name.to_string(), value);
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_secure(self.secure);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_max_age(max_age);
        cookie
    }

    pub fn session_cookie(&self, token: String, max_age_secs: u64) -> Cookie<'static> {
        self.build(
            token,
            actix_web::cookie::time::Duration::seconds(max_age_secs as i64),
        )
    }

    pub fn expired_cookie(&self) -> Cookie<'static> {
        self.build(String::new(), actix_web::cookie::time::Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_opaque() {
        let response = error_from_biolinker(&BiolinkerError::storage(
            "UNIQUE constraint failed: users.email",
        ));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            error_from_biolinker(&BiolinkerError::unauthenticated("x")).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            error_from_biolinker(&BiolinkerError::forbidden("x")).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            error_from_biolinker(&BiolinkerError::validation("x")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_from_biolinker(&BiolinkerError::not_found("x")).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn success_response_is_ok() {
        assert_eq!(success_response("data").status(), StatusCode::OK);
    }

    #[test]
    fn cookies() {
        let builder = CookieBuilder::new("bl_session", true);
        let cookie = builder.session_cookie("tok".into(), 60);
        assert_eq!(cookie.name(), "bl_session");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));

        let expired = builder.expired_cookie();
        assert_eq!(expired.value(), "");
        assert_eq!(
            expired.max_age(),
            Some(actix_web::cookie::time::Duration::ZERO)
        );
    }
}
