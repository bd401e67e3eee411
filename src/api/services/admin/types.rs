//! API request and response types

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i64,
    pub expires_in: u64,
    pub roles: Vec<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct MyPermissionsResponse {
    pub user_id: i64,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct AssignRolesRequest {
    pub roles: Vec<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct BlockIpRequest {
    pub ip_address: String,
    pub reason: Option<String>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct AuditLogQuery {
    pub limit: Option<u64>,
}

#[derive(Serialize, Clone, Debug)]
pub struct PurgeResponse {
    pub removed: u64,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct AnalyticsQuery {
    pub user_id: Option<i64>,
    pub days: Option<u32>,
    pub limit: Option<u64>,
}
