//! Frame sources for the pulse monitor: live MJPEG streams, single-frame
//! polling, and a synthetic pulse generator.

pub mod channel;
pub mod decode;
pub mod mjpeg;
pub mod polling;
pub mod synthetic;

#[cfg(test)]
mod testing;

use pulsecam_common::config::{Config, ConfigError};
use pulsecam_common::{AcquisitionError, Frame, FrameError, FrameHandle, FrameSource};
use std::time::Duration;

pub use channel::ChannelHandle;
pub use mjpeg::{MjpegParser, MjpegSource};
pub use polling::PollingSource;
pub use synthetic::{SyntheticHandle, SyntheticSource};

/// Camera selected by `[camera] mode`.
pub enum CameraSource {
    Mjpeg(MjpegSource),
    Polling(PollingSource),
    Synthetic(SyntheticSource),
}

impl CameraSource {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        match config.camera.mode.as_str() {
            "mjpeg" => Ok(Self::Mjpeg(MjpegSource::from_config(&config.camera))),
            "polling" => Ok(Self::Polling(PollingSource::from_config(&config.camera))),
            "synthetic" => Ok(Self::Synthetic(SyntheticSource::from_config(
                &config.camera,
                &config.synthetic,
            ))),
            other => Err(ConfigError::Invalid(format!(
                "unknown camera mode '{other}', expected 'mjpeg', 'polling' or 'synthetic'"
            ))),
        }
    }
}

pub enum CameraHandle {
    Stream(ChannelHandle),
    Synthetic(SyntheticHandle),
}

impl FrameSource for CameraSource {
    type Handle = CameraHandle;

    async fn open(&self) -> Result<CameraHandle, AcquisitionError> {
        match self {
            Self::Mjpeg(source) => source.open().await.map(CameraHandle::Stream),
            Self::Polling(source) => source.open().await.map(CameraHandle::Stream),
            Self::Synthetic(source) => source.open().await.map(CameraHandle::Synthetic),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Mjpeg(source) => source.name(),
            Self::Polling(source) => source.name(),
            Self::Synthetic(source) => source.name(),
        }
    }
}

impl FrameHandle for CameraHandle {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        match self {
            Self::Stream(handle) => handle.next_frame(),
            Self::Synthetic(handle) => handle.next_frame(),
        }
    }

    fn close(&mut self) {
        match self {
            Self::Stream(handle) => handle.close(),
            Self::Synthetic(handle) => handle.close(),
        }
    }
}

pub(crate) fn http_client(connect_timeout: Duration) -> Result<reqwest::Client, AcquisitionError> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .build()
        .map_err(|e| AcquisitionError::Unavailable(e.to_string()))
}

/// Map a camera endpoint's HTTP status to the acquisition failure it signals.
pub fn acquisition_error_for_status(status: u16) -> AcquisitionError {
    match status {
        401 | 403 => AcquisitionError::PermissionDenied(format!("HTTP status {status}")),
        404 | 410 => AcquisitionError::DeviceAbsent(format!("HTTP status {status}")),
        409 | 423 | 503 => AcquisitionError::DeviceBusy(format!("HTTP status {status}")),
        _ => AcquisitionError::Unavailable(format!("HTTP status {status}")),
    }
}
