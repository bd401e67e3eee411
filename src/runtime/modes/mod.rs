//! Execution modes: the HTTP server and one-shot CLI commands

pub mod cli;
pub mod server;

pub use cli::{create_user, generate_config};
pub use server::run_server;
