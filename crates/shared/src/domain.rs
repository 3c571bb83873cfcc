use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Initializing,
    AwaitingPairing,
    Connected,
    Disconnected,
    AuthFailed,
}

impl SessionStatus {
    pub fn is_connected(self) -> bool {
        self == SessionStatus::Connected
    }

    pub fn is_initializing(self) -> bool {
        matches!(
            self,
            SessionStatus::Initializing | SessionStatus::AwaitingPairing
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub qr_code: Option<String>,
    pub identity: Option<String>,
}

impl SessionSnapshot {
    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    pub fn is_initializing(&self) -> bool {
        self.status.is_initializing()
    }
}
