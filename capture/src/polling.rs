use pulsecam_common::config::CameraConfig;
use pulsecam_common::{AcquisitionError, FrameError, FrameSource};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::channel::{offer, ChannelHandle, FrameResult, FRAME_QUEUE_DEPTH};
use crate::decode::decode_jpeg;
use crate::{acquisition_error_for_status, http_client};

/// Failed fetches tolerated in a row before the camera counts as lost.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Polling fallback: fetch one JPEG per interval from a single-frame endpoint.
pub struct PollingSource {
    frame_url: String,
    interval: Duration,
    connect_timeout: Duration,
}

impl PollingSource {
    pub fn new(frame_url: impl Into<String>, interval: Duration, connect_timeout: Duration) -> Self {
        Self {
            frame_url: frame_url.into(),
            interval: interval.max(Duration::from_millis(1)),
            connect_timeout,
        }
    }

    /// Derives the single-frame URL from the stream URL (`/stream` → `/frame`).
    pub fn from_config(config: &CameraConfig) -> Self {
        let url = format!(
            "{}?quality={}&width={}&height={}",
            config.url.replace("/stream", "/frame"),
            config.quality,
            config.width,
            config.height
        );
        Self::new(
            url,
            config.frame_interval(),
            Duration::from_secs(config.connect_timeout_secs),
        )
    }

    pub fn frame_url(&self) -> &str {
        &self.frame_url
    }
}

impl FrameSource for PollingSource {
    type Handle = ChannelHandle;

    async fn open(&self) -> Result<ChannelHandle, AcquisitionError> {
        info!(url = self.frame_url, "probing camera frame endpoint");
        let client = http_client(self.connect_timeout)?;

        // One probe request so permission and absence errors surface from open().
        let probe = client
            .get(&self.frame_url)
            .send()
            .await
            .map_err(|e| AcquisitionError::Unavailable(e.to_string()))?;
        if !probe.status().is_success() {
            return Err(acquisition_error_for_status(probe.status().as_u16()));
        }

        let (tx, rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
        let url = self.frame_url.clone();
        let interval = self.interval;
        let task = tokio::spawn(async move {
            run_polling(client, url, interval, tx).await;
        });
        Ok(ChannelHandle::new(rx, task))
    }

    fn name(&self) -> &str {
        "polling"
    }
}

async fn run_polling(
    client: reqwest::Client,
    frame_url: String,
    interval: Duration,
    tx: mpsc::Sender<FrameResult>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut failures = 0u32;

    loop {
        ticker.tick().await;

        let item = match fetch_frame(&client, &frame_url).await {
            Ok(body) => {
                failures = 0;
                decode_jpeg(&body)
            }
            Err(reason) => {
                failures += 1;
                warn!(failures, reason, "failed to fetch camera frame");
                if failures < MAX_CONSECUTIVE_FAILURES {
                    continue;
                }
                Err(FrameError::Transport(format!(
                    "{reason} ({failures} attempts in a row)"
                )))
            }
        };

        let failed = item.is_err();
        if !offer(&tx, item) || failed {
            return;
        }
    }
}

/// One GET of the frame endpoint. Any non-2xx status counts as a failure.
async fn fetch_frame(client: &reqwest::Client, frame_url: &str) -> Result<bytes::Bytes, String> {
    let resp = client
        .get(frame_url)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if !resp.status().is_success() {
        return Err(format!("camera returned HTTP {}", resp.status()));
    }
    resp.bytes().await.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{jpeg, next_result, serve_frames};

    fn polling(url: String) -> PollingSource {
        PollingSource::new(url, Duration::from_millis(10), Duration::from_millis(500))
    }

    #[test]
    fn from_config_targets_frame_endpoint() {
        let config = CameraConfig {
            url: "http://cam.local/stream".into(),
            quality: 60,
            fps: 20.0,
            ..CameraConfig::default()
        };
        let source = PollingSource::from_config(&config);
        assert_eq!(
            source.frame_url(),
            "http://cam.local/frame?quality=60&width=640&height=480"
        );
        assert_eq!(source.interval, Duration::from_millis(50));
    }

    #[tokio::test]
    async fn unreachable_camera_fails_to_open() {
        let source = PollingSource::new(
            "http://127.0.0.1:9/frame",
            Duration::from_millis(33),
            Duration::from_millis(200),
        );
        let err = source.open().await.err().expect("open should fail");
        assert!(matches!(err, AcquisitionError::Unavailable(_)));
    }

    #[tokio::test]
    async fn refused_probe_maps_status() {
        let url = serve_frames(|n| (n == 0).then(|| (403, Vec::new()))).await;
        let err = polling(url).open().await.err().expect("open should fail");
        assert!(matches!(err, AcquisitionError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn polled_frames_are_delivered() {
        let body = jpeg([200, 40, 40]);
        let url = serve_frames(move |_| Some((200, body.clone()))).await;

        let mut handle = polling(url).open().await.unwrap();
        let frame = next_result(&mut handle).await.unwrap();
        assert_eq!((frame.width(), frame.height()), (16, 16));
        assert!(frame.pixels()[0].abs_diff(200) <= 8);
    }

    #[tokio::test]
    async fn camera_going_away_is_fatal() {
        // Only the probe is answered; every later fetch is refused.
        let url = serve_frames(|n| (n == 0).then(|| (200, Vec::new()))).await;

        let mut handle = polling(url).open().await.unwrap();
        let err = next_result(&mut handle).await.unwrap_err();
        assert!(matches!(err, FrameError::Transport(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn repeated_error_status_is_fatal() {
        let body = jpeg([90, 90, 90]);
        let url = serve_frames(move |n| match n {
            0 | 1 => Some((200, body.clone())),
            _ => Some((500, Vec::new())),
        })
        .await;

        let mut handle = polling(url).open().await.unwrap();
        assert!(next_result(&mut handle).await.is_ok());
        match next_result(&mut handle).await {
            Err(FrameError::Transport(reason)) => assert!(reason.contains("500"), "{reason}"),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_failed_fetch_is_tolerated() {
        let body = jpeg([120, 30, 30]);
        let url = serve_frames(move |n| match n {
            2 => Some((503, Vec::new())),
            _ => Some((200, body.clone())),
        })
        .await;

        let mut handle = polling(url).open().await.unwrap();
        // Fetch #1 succeeds, #2 fails once, #3 succeeds again.
        assert!(next_result(&mut handle).await.is_ok());
        assert!(next_result(&mut handle).await.is_ok());
    }
}
