//! biolinker - RBAC and visitor analytics core for a link-in-bio platform
//!
//! # Architecture
//! - `rbac`: roles, permission resolution and per-session authorization
//! - `services`: visitor ingest, analytics aggregation, blocklist and audit log
//! - `storage`: SeaORM data access (SQLite, MySQL, PostgreSQL)
//! - `api`: HTTP services and middleware
//! - `config`: configuration management
//! - `runtime`: application lifecycle and execution modes
//! - `system`: logging

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod rbac;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
