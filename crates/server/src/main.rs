use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use session_core::{ConnectOutcome, DisconnectOutcome, SessionController, SessionEvent};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{ActionResponse, HealthResponse, StatusResponse},
};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use transport::MissingTransportConnector;

mod config;
mod qr;

use config::load_settings;

#[derive(Clone)]
struct AppState {
    controller: Arc<SessionController>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let controller = SessionController::new(
        Arc::new(MissingTransportConnector),
        settings.session_config(),
    );

    spawn_pairing_echo(controller.subscribe_events());

    let state = AppState {
        controller: Arc::clone(&controller),
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, client_id = %controller.client_id(), "session gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(controller))
        .await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/connect", post(connect))
        .route("/qr", get(qr))
        .route("/qr-image.svg", get(qr_image))
        .route("/disconnect", post(disconnect))
        .route("/logout", post(logout))
        .route("/health", get(health))
        .with_state(state)
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse::from(state.controller.snapshot().await))
}

async fn connect(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ActionResponse>, (StatusCode, Json<ApiError>)> {
    match state.controller.connect().await {
        Ok(ConnectOutcome::Initiated) => Ok(Json(ActionResponse::ok(
            "Connection initiated. Poll /qr for the pairing code.",
        ))),
        Ok(ConnectOutcome::AlreadyInProgress) => Ok(Json(ActionResponse::rejected(
            "Connection already in progress",
        ))),
        Ok(ConnectOutcome::AlreadyConnected) => Ok(Json(ActionResponse::already_connected(
            "Session already connected",
        ))),
        Err(err) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::new(ErrorCode::Construction, err.to_string())),
        )),
    }
}

async fn qr(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.controller.snapshot().await;
    if snapshot.is_connected() {
        Json(serde_json::json!({
            "connected": true,
            "message": "Session already connected",
        }))
    } else {
        Json(serde_json::json!({
            "qrCode": snapshot.qr_code,
            "connected": false,
        }))
    }
}

async fn qr_image(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.controller.snapshot().await;
    let Some(payload) = snapshot.qr_code else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match qr::render_svg(&payload) {
        Ok(svg) => {
            let mut headers = HeaderMap::new();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("image/svg+xml"),
            );
            headers.insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-store, no-cache, must-revalidate, proxy-revalidate"),
            );
            headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
            headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
            (StatusCode::OK, headers, svg).into_response()
        }
        Err(err) => {
            error!(%err, "failed to render pairing code image");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new(ErrorCode::Internal, err.to_string())),
            )
                .into_response()
        }
    }
}

async fn disconnect(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ActionResponse>, (StatusCode, Json<ApiError>)> {
    match state.controller.disconnect().await {
        Ok(DisconnectOutcome::Disconnected) => Ok(Json(ActionResponse::ok("Session disconnected"))),
        Ok(DisconnectOutcome::NotConnected) => {
            Ok(Json(ActionResponse::ok("Session was not connected")))
        }
        Err(err) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::new(ErrorCode::Teardown, err.to_string())),
        )),
    }
}

async fn logout(State(state): State<Arc<AppState>>) -> Json<ActionResponse> {
    // Warnings are collected and logged by the controller; the envelope is
    // always success because cleanup is unconditional.
    state.controller.logout().await;
    Json(ActionResponse::ok("Logged out and cleared saved session"))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let auth_dir = state.controller.auth_dir();
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        auth_dir: auth_dir.display().to_string(),
        auth_dir_exists: auth_dir.is_dir(),
        client_id: state.controller.client_id().to_string(),
    })
}

// Mirrors the pairing code to the console so the gateway is usable without
// the HTTP image endpoint.
fn spawn_pairing_echo(mut events: broadcast::Receiver<SessionEvent>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::PairingCodeIssued(code)) => match qr::render_terminal(&code) {
                    Ok(block) => info!("scan the pairing code below:\n{block}"),
                    Err(err) => warn!(%err, "could not render pairing code for the console"),
                },
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "pairing echo lagged behind session events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown_signal(controller: Arc<SessionController>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received; disconnecting session");
    if let Err(err) = controller.disconnect().await {
        warn!(%err, "session teardown during shutdown reported an error");
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
