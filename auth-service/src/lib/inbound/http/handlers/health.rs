use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;

use super::ApiSuccess;

pub const SERVICE_NAME: &str = "auth-service";

pub async fn health() -> ApiSuccess<HealthResponseData> {
    ApiSuccess::new(
        StatusCode::OK,
        HealthResponseData {
            status: "UP".to_string(),
            service: SERVICE_NAME.to_string(),
            message: "Auth service is running".to_string(),
            timestamp: Utc::now().timestamp_millis().to_string(),
        },
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponseData {
    pub status: String,
    pub service: String,
    pub message: String,
    pub timestamp: String,
}
