use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::SessionSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub is_connected: bool,
    pub phone_number: Option<String>,
    pub qr_code: Option<String>,
    pub is_initializing: bool,
}

impl From<SessionSnapshot> for StatusResponse {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            is_connected: snapshot.is_connected(),
            is_initializing: snapshot.is_initializing(),
            phone_number: snapshot.identity,
            qr_code: snapshot.qr_code,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            connected: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            connected: None,
        }
    }

    pub fn already_connected(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            connected: Some(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub auth_dir: String,
    pub auth_dir_exists: bool,
    pub client_id: String,
}
