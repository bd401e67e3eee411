use std::fmt;

use actix_web::http::StatusCode;
use tracing::error;

/// Message returned to callers in place of raw datastore detail
pub const STORAGE_FAILURE_MESSAGE: &str = "Internal storage error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BiolinkerError {
    Unauthenticated(String),
    Forbidden(String),
    Blocked(String),
    Validation(String),
    NotFound(String),
    Storage(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    Config(String),
    Token(String),
}

impl BiolinkerError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            BiolinkerError::Unauthenticated(_) => "E001",
            BiolinkerError::Forbidden(_) => "E002",
            BiolinkerError::Blocked(_) => "E003",
            BiolinkerError::Validation(_) => "E004",
            BiolinkerError::NotFound(_) => "E005",
            BiolinkerError::Storage(_) => "E006",
            BiolinkerError::DatabaseConfig(_) => "E007",
            BiolinkerError::DatabaseConnection(_) => "E008",
            BiolinkerError::Config(_) => "E009",
            BiolinkerError::Token(_) => "E010",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            BiolinkerError::Unauthenticated(_) => "Unauthenticated",
            BiolinkerError::Forbidden(_) => "Forbidden",
            BiolinkerError::Blocked(_) => "Blocked",
            BiolinkerError::Validation(_) => "Validation Error",
            BiolinkerError::NotFound(_) => "Resource Not Found",
            BiolinkerError::Storage(_) => "Storage Error",
            BiolinkerError::DatabaseConfig(_) => "Database Configuration Error",
            BiolinkerError::DatabaseConnection(_) => "Database Connection Error",
            BiolinkerError::Config(_) => "Configuration Error",
            BiolinkerError::Token(_) => "Token Error",
        }
    }

    /// Full detail, for logs
    pub fn message(&self) -> &str {
        match self {
            BiolinkerError::Unauthenticated(msg)
            | BiolinkerError::Forbidden(msg)
            | BiolinkerError::Blocked(msg)
            | BiolinkerError::Validation(msg)
            | BiolinkerError::NotFound(msg)
            | BiolinkerError::Storage(msg)
            | BiolinkerError::DatabaseConfig(msg)
            | BiolinkerError::DatabaseConnection(msg)
            | BiolinkerError::Config(msg)
            | BiolinkerError::Token(msg) => msg,
        }
    }

    /// Message safe to hand to an untrusted caller.
    ///
    /// Storage and startup errors collapse to a fixed string; their detail
    /// only ever reaches the log.
    pub fn public_message(&self) -> &str {
        match self {
            BiolinkerError::Storage(_)
            | BiolinkerError::DatabaseConfig(_)
            | BiolinkerError::DatabaseConnection(_)
            | BiolinkerError::Config(_) => STORAGE_FAILURE_MESSAGE,
            other => other.message(),
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            BiolinkerError::Unauthenticated(_) | BiolinkerError::Token(_) => {
                StatusCode::UNAUTHORIZED
            }
            BiolinkerError::Forbidden(_) | BiolinkerError::Blocked(_) => StatusCode::FORBIDDEN,
            BiolinkerError::Validation(_) => StatusCode::BAD_REQUEST,
            BiolinkerError::NotFound(_) => StatusCode::NOT_FOUND,
            BiolinkerError::Storage(_)
            | BiolinkerError::DatabaseConfig(_)
            | BiolinkerError::DatabaseConnection(_)
            | BiolinkerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }

    /// Whether the caller can act on this error (re-authenticate, fix input)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BiolinkerError::Unauthenticated(_)
                | BiolinkerError::Forbidden(_)
                | BiolinkerError::Blocked(_)
                | BiolinkerError::Validation(_)
                | BiolinkerError::NotFound(_)
                | BiolinkerError::Token(_)
        )
    }
}

impl fmt::Display for BiolinkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for BiolinkerError {}

impl BiolinkerError {
    pub fn unauthenticated<T: Into<String>>(msg: T) -> Self {
        BiolinkerError::Unauthenticated(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        BiolinkerError::Forbidden(msg.into())
    }

    pub fn blocked<T: Into<String>>(msg: T) -> Self {
        BiolinkerError::Blocked(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        BiolinkerError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        BiolinkerError::NotFound(msg.into())
    }

    pub fn storage<T: Into<String>>(msg: T) -> Self {
        BiolinkerError::Storage(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        BiolinkerError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        BiolinkerError::DatabaseConnection(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        BiolinkerError::Config(msg.into())
    }

    pub fn token<T: Into<String>>(msg: T) -> Self {
        BiolinkerError::Token(msg.into())
    }
}

impl From<sea_orm::DbErr> for BiolinkerError {
    fn from(err: sea_orm::DbErr) -> Self {
        error!("Storage failure: {}", err);
        BiolinkerError::Storage(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for BiolinkerError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        BiolinkerError::Token(err.to_string())
    }
}

impl From<config::ConfigError> for BiolinkerError {
    fn from(err: config::ConfigError) -> Self {
        BiolinkerError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BiolinkerError>;
