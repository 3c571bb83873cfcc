use std::{path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::broadcast;

pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_QR_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub client_id: String,
    pub auth_dir: PathBuf,
    pub startup_timeout: Duration,
    pub qr_max_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub from: String,
    pub body: String,
    pub from_me: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Qr(String),
    Authenticated,
    Ready,
    Message(InboundMessage),
    LoadingScreen { percent: u8, message: String },
    StateChanged(String),
    Disconnected { reason: String },
    AuthFailure { reason: String },
}

#[async_trait]
pub trait TransportClient: Send + Sync {
    async fn initialize(&self) -> anyhow::Result<()>;
    async fn destroy(&self) -> anyhow::Result<()>;
    async fn logout(&self) -> anyhow::Result<()>;
    async fn identity(&self) -> Option<String>;
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()>;
    fn subscribe_events(&self) -> broadcast::Receiver<TransportEvent>;
}

#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn build(&self, options: TransportOptions) -> anyhow::Result<Arc<dyn TransportClient>>;
}

pub struct MissingTransportConnector;

#[async_trait]
impl TransportConnector for MissingTransportConnector {
    async fn build(&self, _options: TransportOptions) -> anyhow::Result<Arc<dyn TransportClient>> {
        Err(anyhow::anyhow!(
            "no messaging transport backend is linked into this build"
        ))
    }
}
