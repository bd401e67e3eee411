//! API error codes

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::BiolinkerError;

/// Numeric codes carried in every [`super::ApiResponse`], grouped by thousands:
/// - 0: success
/// - 1000-1099: generic
/// - 2000-2099: authentication and sessions
/// - 3000-3099: RBAC
/// - 4000-4099: tracking
/// - 5000-5099: analytics
/// - 6000-6099: IP blocklist
/// - 7000-7099: audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    InternalServerError = 1005,
    ServiceUnavailable = 1030,

    AuthFailed = 2000,
    TokenInvalid = 2002,
    RateLimitExceeded = 2004,
    AccountInactive = 2005,

    RbacValidation = 3000,
    RoleNotFound = 3001,
    UserNotFound = 3002,

    TrackingTargetNotFound = 4000,
    TrackingBlocked = 4001,

    AnalyticsQueryFailed = 5000,
    AnalyticsUnknownKind = 5001,

    BlacklistInvalidIp = 6000,
    BlacklistEntryNotFound = 6001,

    AuditLogQueryFailed = 7000,
}

impl From<&BiolinkerError> for ErrorCode {
    fn from(err: &BiolinkerError) -> Self {
        match err {
            BiolinkerError::Unauthenticated(_) => ErrorCode::Unauthorized,
            BiolinkerError::Forbidden(_) => ErrorCode::Forbidden,
            BiolinkerError::Blocked(_) => ErrorCode::TrackingBlocked,
            BiolinkerError::Validation(_) => ErrorCode::BadRequest,
            BiolinkerError::NotFound(_) => ErrorCode::NotFound,
            BiolinkerError::Token(_) => ErrorCode::TokenInvalid,
            BiolinkerError::Storage(_)
            | BiolinkerError::DatabaseConfig(_)
            | BiolinkerError::DatabaseConnection(_)
            | BiolinkerError::Config(_) => ErrorCode::InternalServerError,
        }
    }
}
