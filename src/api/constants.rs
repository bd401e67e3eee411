//! API constants

/// Versioned API root
pub const API_PREFIX: &str = "/api/v1";

pub const BEARER_PREFIX: &str = "Bearer ";

/// Default page size for audit log listings
pub const DEFAULT_AUDIT_PAGE: u64 = 100;

/// Upper bound for `?limit=` on audit log listings
pub const MAX_AUDIT_PAGE: u64 = 1000;
