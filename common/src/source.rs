use std::future::Future;

use crate::frame::{Frame, FrameError};

/// A camera or other producer of live frames.
///
/// Opening is asynchronous (device negotiation, HTTP connect); polling an
/// opened handle never blocks.
pub trait FrameSource: Send + Sync {
    type Handle: FrameHandle;

    /// Acquire the device. Failure leaves nothing open.
    fn open(&self) -> impl Future<Output = Result<Self::Handle, AcquisitionError>> + Send;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// An opened frame source.
pub trait FrameHandle: Send + 'static {
    /// Non-blocking poll for the next frame.
    ///
    /// `Ok(None)` means no frame is ready yet. Errors are fatal to the
    /// consumer: the device failed or delivered something undecodable.
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError>;

    /// Release the device. Must be safe to call more than once.
    fn close(&mut self);
}

#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),
    #[error("camera busy: {0}")]
    DeviceBusy(String),
    #[error("camera not found: {0}")]
    DeviceAbsent(String),
    #[error("camera unavailable: {0}")]
    Unavailable(String),
}
