//! Admin API
//!
//! - RBAC: roles, permissions, user role assignment
//! - audit log listing and purge
//! - IP blocklist
//!
//! Also home of the response envelope, error codes and helpers shared by
//! every endpoint.

mod audit;
mod blacklist;
pub mod error_code;
mod helpers;
mod rbac;
pub mod routes;
mod types;

pub use types::*;

pub use helpers::{
    CookieBuilder, api_result, error_from_biolinker, error_response, error_with_code,
    json_response, success_response,
};

pub use error_code::ErrorCode;

pub use routes::admin_routes;
