use pulsecam_capture::CameraSource;
use pulsecam_common::config::Config;
use pulsecam_common::FrameSource;
use pulsecam_monitor::{MonitorSession, SessionState};
use std::path::PathBuf;
use tracing::{error, info, warn};

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

    info!(
        source = source.name(),
        fps = config.camera.fps,
        buffer_capacity = config.analysis.buffer_capacity,
        interval_ms = config.analysis.interval_ms,
        "starting pulsecam monitor"
    );

    let mut session = MonitorSession::from_config(source, &config);
    if let Err(e) = session.start().await {
        error!(error = %e, "could not start monitoring");
        std::process::exit(1);
    }

    let mut status = session.subscribe();
    loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                if current.state == SessionState::Idle {
                    match current.fault {
                        Some(fault) => error!(fault, "monitoring ended"),
                        None => warn!("monitoring ended"),
                    }
                    break;
                }
                if let (Some(bpm), Some(zone)) = (current.bpm, current.zone()) {
                    info!(bpm, zone = zone.describe(), "reading");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, stopping");
                break;
            }
        }
    }

    session.stop();
}
