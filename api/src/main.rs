use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::SecondsFormat;
use pulsecam_capture::CameraSource;
use pulsecam_common::config::Config;
use pulsecam_monitor::{HeartRateZone, MonitorSession, MonitorStatus, SessionState};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

struct AppState {
    session: Mutex<MonitorSession<CameraSource>>,
    status: watch::Receiver<MonitorStatus>,
}

impl AppState {
    fn new(session: MonitorSession<CameraSource>) -> Self {
        let status = session.subscribe();
        Self {
            session: Mutex::new(session),
            status,
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, PartialEq)]
struct StatusResponse {
    state: SessionState,
    bpm: Option<u32>,
    zone: Option<HeartRateZone>,
    /// RFC 3339, millisecond precision.
    measured_at: Option<String>,
    fault: Option<String>,
}

impl From<&MonitorStatus> for StatusResponse {
    fn from(status: &MonitorStatus) -> Self {
        Self {
            state: status.state,
            bpm: status.bpm,
            zone: status.zone(),
            measured_at: status
                .measured_at
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
            fault: status.fault.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /status
async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = StatusResponse::from(&*state.status.borrow());
    Json(body)
}

/// POST /start
async fn start_monitoring(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut session = state.session.lock().await;
    match session.start().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            warn!(error = %e, "start request failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /stop
async fn stop_monitoring(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.session.lock().await.stop();
    StatusCode::NO_CONTENT
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/start", post(start_monitoring))
        .route("/stop", post(stop_monitoring))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    let source = match CameraSource::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "invalid camera configuration");
            std::process::exit(1);
        }
    };
    let state = Arc::new(AppState::new(MonitorSession::from_config(source, &config)));

    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.api.port);
    info!(addr, camera_mode = config.camera.mode, "pulsecam API server starting");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap_or_else(|e| {
        eprintln!("Failed to bind to {addr}: {e}");
        std::process::exit(1);
    });
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server exited");
        std::process::exit(1);
    }
}
