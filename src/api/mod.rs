//! HTTP surface

pub mod constants;
pub mod jwt;
pub mod middleware;
pub mod services;
pub mod state;

pub use middleware::SessionAuth;
pub use services::{api_v1_routes, health_routes};
pub use state::AppState;
