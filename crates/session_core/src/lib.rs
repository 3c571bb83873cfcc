use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use shared::domain::{SessionSnapshot, SessionStatus};
use thiserror::Error;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{error, info, warn};
use transport::{
    InboundMessage, TransportClient, TransportConnector, TransportEvent, TransportOptions,
};

pub mod janitor;
pub mod responder;

pub const DEFAULT_AUTO_REPLY: &str = "Thanks for your message. This account is automated and \
replies here are not read. Please contact us at https://t.me/example_support instead.";

const IDENTITY_RESOLVE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub client_id: String,
    pub auth_dir: PathBuf,
    pub auto_reply: String,
    pub startup_timeout: Duration,
    pub qr_max_retries: u32,
    pub identity_resolve_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_id: "default".to_string(),
            auth_dir: PathBuf::from("./auth_state"),
            auto_reply: DEFAULT_AUTO_REPLY.to_string(),
            startup_timeout: transport::DEFAULT_STARTUP_TIMEOUT,
            qr_max_retries: transport::DEFAULT_QR_MAX_RETRIES,
            identity_resolve_delay: IDENTITY_RESOLVE_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StatusChanged(SessionStatus),
    PairingCodeIssued(String),
    IdentityResolved(String),
    AutoReplied { to: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Initiated,
    AlreadyInProgress,
    AlreadyConnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectOutcome {
    Disconnected,
    NotConnected,
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to construct transport client: {0}")]
    Construction(String),
}

#[derive(Debug, Error)]
pub enum TeardownError {
    #[error("failed to destroy transport client: {0}")]
    Destroy(String),
}

#[derive(Debug, Clone, Default)]
pub struct TeardownReport {
    pub warnings: Vec<String>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn push(&mut self, warning: String) {
        self.warnings.push(warning);
    }
}

pub struct SessionController {
    connector: Arc<dyn TransportConnector>,
    config: SessionConfig,
    inner: Mutex<SessionState>,
    active: Mutex<Option<ActiveSession>>,
    events: broadcast::Sender<SessionEvent>,
}

struct SessionState {
    status: SessionStatus,
    qr_code: Option<String>,
    identity: Option<String>,
}

struct ActiveSession {
    client: Arc<dyn TransportClient>,
    event_task: JoinHandle<()>,
    init_task: JoinHandle<()>,
}

fn session_matches(active: &Option<ActiveSession>, client: &Arc<dyn TransportClient>) -> bool {
    active
        .as_ref()
        .map(|session| Arc::ptr_eq(&session.client, client))
        .unwrap_or(false)
}

impl SessionController {
    pub fn new(connector: Arc<dyn TransportConnector>, config: SessionConfig) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            connector,
            config,
            inner: Mutex::new(SessionState {
                status: SessionStatus::Idle,
                qr_code: None,
                identity: None,
            }),
            active: Mutex::new(None),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    pub fn auth_dir(&self) -> &Path {
        &self.config.auth_dir
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.lock().await.status
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        SessionSnapshot {
            status: inner.status,
            qr_code: inner.qr_code.clone(),
            identity: inner.identity.clone(),
        }
    }

    pub async fn connect(self: &Arc<Self>) -> Result<ConnectOutcome, ConnectError> {
        // Holding the handle slot across construction keeps connect single-flight.
        let mut active = self.active.lock().await;
        {
            let mut inner = self.inner.lock().await;
            if inner.status.is_initializing() {
                return Ok(ConnectOutcome::AlreadyInProgress);
            }
            if inner.status.is_connected() && active.is_some() {
                return Ok(ConnectOutcome::AlreadyConnected);
            }
            inner.status = SessionStatus::Initializing;
            inner.qr_code = None;
            inner.identity = None;
        }
        self.emit_status(SessionStatus::Initializing);

        let client = match self.connector.build(self.transport_options()).await {
            Ok(client) => client,
            Err(err) => {
                error!(%err, "transport client construction failed");
                {
                    let mut inner = self.inner.lock().await;
                    inner.status = SessionStatus::Disconnected;
                }
                self.emit_status(SessionStatus::Disconnected);
                return Err(ConnectError::Construction(err.to_string()));
            }
        };

        // Subscribe before initialization starts: the first pairing code can
        // arrive immediately after the transport boots.
        let transport_events = client.subscribe_events();
        let event_task = self.spawn_event_task(Arc::clone(&client), transport_events);
        let init_task = self.spawn_init_task(Arc::clone(&client));

        *active = Some(ActiveSession {
            client,
            event_task,
            init_task,
        });
        info!(client_id = %self.config.client_id, "session initialization started");
        Ok(ConnectOutcome::Initiated)
    }

    pub async fn disconnect(&self) -> Result<DisconnectOutcome, TeardownError> {
        let Some(session) = self.take_active().await else {
            info!("disconnect requested with no active session");
            return Ok(DisconnectOutcome::NotConnected);
        };

        session.init_task.abort();
        let destroyed = session.client.destroy().await;
        session.event_task.abort();

        self.reset_state(SessionStatus::Disconnected).await;

        match destroyed {
            Ok(()) => {
                info!("session disconnected");
                Ok(DisconnectOutcome::Disconnected)
            }
            Err(err) => {
                warn!(%err, "transport destroy failed during disconnect");
                Err(TeardownError::Destroy(err.to_string()))
            }
        }
    }

    pub async fn logout(&self) -> TeardownReport {
        let mut report = TeardownReport::default();

        if let Some(session) = self.take_active().await {
            session.init_task.abort();
            if let Err(err) = session.client.logout().await {
                warn!(%err, "transport logout failed");
                report.push(format!("transport logout failed: {err}"));
            }
            if let Err(err) = session.client.destroy().await {
                warn!(%err, "transport destroy failed during logout");
                report.push(format!("transport destroy failed: {err}"));
            }
            session.event_task.abort();
        }

        self.reset_state(SessionStatus::Idle).await;

        // The janitor only runs once the handle is gone, so the transport no
        // longer holds files under the credential directory.
        for warning in
            janitor::purge_credentials(&self.config.auth_dir, &self.config.client_id).await
        {
            report.push(warning);
        }

        if report.is_clean() {
            info!("logged out and cleared saved session");
        } else {
            warn!(
                warnings = report.warnings.len(),
                "logout finished with warnings"
            );
        }
        report
    }

    fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            client_id: self.config.client_id.clone(),
            auth_dir: self.config.auth_dir.clone(),
            startup_timeout: self.config.startup_timeout,
            qr_max_retries: self.config.qr_max_retries,
        }
    }

    async fn take_active(&self) -> Option<ActiveSession> {
        self.active.lock().await.take()
    }

    async fn reset_state(&self, status: SessionStatus) {
        {
            let mut inner = self.inner.lock().await;
            inner.status = status;
            inner.qr_code = None;
            inner.identity = None;
        }
        self.emit_status(status);
    }

    fn emit_status(&self, status: SessionStatus) {
        let _ = self.events.send(SessionEvent::StatusChanged(status));
    }

    fn spawn_event_task(
        self: &Arc<Self>,
        client: Arc<dyn TransportClient>,
        mut events: broadcast::Receiver<TransportEvent>,
    ) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if !controller.handle_transport_event(&client, event).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "transport event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn spawn_init_task(self: &Arc<Self>, client: Arc<dyn TransportClient>) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = client.initialize().await {
                error!(%err, "transport initialization failed");
                controller.handle_init_failure(&client).await;
            }
        })
    }

    // Returns false once this client's event stream should no longer be
    // consumed (stale stream or terminal transport event).
    async fn handle_transport_event(
        self: &Arc<Self>,
        client: &Arc<dyn TransportClient>,
        event: TransportEvent,
    ) -> bool {
        match event {
            TransportEvent::Qr(code) => self.handle_pairing_code(client, code).await,
            TransportEvent::Authenticated => {
                info!("transport authenticated; waiting for ready");
                true
            }
            TransportEvent::Ready => self.handle_ready(client).await,
            TransportEvent::Message(message) => {
                self.handle_inbound_message(client, message).await;
                true
            }
            TransportEvent::LoadingScreen { percent, message } => {
                info!(percent, message = %message, "transport loading");
                true
            }
            TransportEvent::StateChanged(state) => {
                info!(state = %state, "transport connection state changed");
                true
            }
            TransportEvent::Disconnected { reason } => {
                warn!(reason = %reason, "transport disconnected");
                self.handle_transport_gone(client, SessionStatus::Disconnected)
                    .await;
                false
            }
            TransportEvent::AuthFailure { reason } => {
                error!(reason = %reason, "transport authentication failed");
                self.handle_transport_gone(client, SessionStatus::AuthFailed)
                    .await;
                false
            }
        }
    }

    async fn handle_pairing_code(&self, client: &Arc<dyn TransportClient>, code: String) -> bool {
        let refreshed = {
            let active = self.active.lock().await;
            if !session_matches(&active, client) {
                return false;
            }
            let mut inner = self.inner.lock().await;
            if !inner.status.is_initializing() {
                warn!(status = ?inner.status, "ignoring pairing code outside initialization");
                return true;
            }
            let refreshed = inner.status == SessionStatus::AwaitingPairing;
            inner.status = SessionStatus::AwaitingPairing;
            inner.qr_code = Some(code.clone());
            refreshed
        };

        if refreshed {
            info!("pairing code refreshed; previous code is invalid");
        } else {
            info!("pairing code received");
            self.emit_status(SessionStatus::AwaitingPairing);
        }
        let _ = self.events.send(SessionEvent::PairingCodeIssued(code));
        true
    }

    async fn handle_ready(self: &Arc<Self>, client: &Arc<dyn TransportClient>) -> bool {
        {
            let active = self.active.lock().await;
            if !session_matches(&active, client) {
                return false;
            }
            let mut inner = self.inner.lock().await;
            inner.status = SessionStatus::Connected;
            inner.qr_code = None;
        }

        info!("session connected");
        self.emit_status(SessionStatus::Connected);
        self.spawn_identity_probe(Arc::clone(client));
        true
    }

    async fn handle_transport_gone(&self, client: &Arc<dyn TransportClient>, status: SessionStatus) {
        {
            let mut active = self.active.lock().await;
            if !session_matches(&active, client) {
                return;
            }
            if let Some(session) = active.take() {
                session.init_task.abort();
            }
            let mut inner = self.inner.lock().await;
            inner.status = status;
            inner.qr_code = None;
            inner.identity = None;
        }
        self.emit_status(status);
    }

    async fn handle_init_failure(&self, client: &Arc<dyn TransportClient>) {
        {
            let mut active = self.active.lock().await;
            if !session_matches(&active, client) {
                return;
            }
            {
                let mut inner = self.inner.lock().await;
                if !inner.status.is_initializing() {
                    return;
                }
                inner.status = SessionStatus::Disconnected;
                inner.qr_code = None;
            }
            if let Some(session) = active.take() {
                session.event_task.abort();
            }
        }
        self.emit_status(SessionStatus::Disconnected);
    }

    async fn handle_inbound_message(
        &self,
        client: &Arc<dyn TransportClient>,
        message: InboundMessage,
    ) {
        let status = { self.inner.lock().await.status };
        if !responder::should_reply(&message, status) {
            return;
        }

        match client
            .send_message(&message.from, &self.config.auto_reply)
            .await
        {
            Ok(()) => {
                info!(to = %message.from, "sent auto-reply");
                let _ = self
                    .events
                    .send(SessionEvent::AutoReplied { to: message.from });
            }
            Err(err) => warn!(%err, to = %message.from, "failed to send auto-reply"),
        }
    }

    fn spawn_identity_probe(self: &Arc<Self>, client: Arc<dyn TransportClient>) {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            // Transports may not expose the account identity at ready-time.
            tokio::time::sleep(controller.config.identity_resolve_delay).await;

            let Some(identity) = client.identity().await else {
                info!("account identity not available yet");
                return;
            };

            {
                let active = controller.active.lock().await;
                if !session_matches(&active, &client) {
                    return;
                }
                let mut inner = controller.inner.lock().await;
                if !inner.status.is_connected() {
                    return;
                }
                inner.identity = Some(identity.clone());
            }
            info!(identity = %identity, "resolved session identity");
            let _ = controller
                .events
                .send(SessionEvent::IdentityResolved(identity));
        });
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
