//! Heart-rate estimation from camera frames.
//!
//! [`signal`] holds the pure pipeline: frame to sample, sample window,
//! peak scan and BPM validation. [`session`] drives it from a live
//! [`FrameSource`](pulsecam_common::FrameSource) with start/stop semantics.

pub mod session;
pub mod signal;

pub use session::{MonitorSession, MonitorStatus, PulseTracker, SessionState};
pub use signal::{HeartRateZone, TickOutcome};
