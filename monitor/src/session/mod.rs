//! Monitoring session lifecycle.
//!
//! A session owns one frame handle and one [`PulseTracker`]. Both live in a
//! single mutex-guarded core shared with the per-frame task, so a frame
//! append and an analysis snapshot never interleave, and `stop()` can close
//! the handle and reset the tracker synchronously. Every task is tagged with
//! the epoch it was started in; a tick from an older epoch exits without
//! touching anything.

pub mod state;
pub mod tracker;

pub use state::{MonitorStatus, SessionState};
pub use tracker::PulseTracker;

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use pulsecam_common::config::{AnalysisConfig, Config};
use pulsecam_common::{AcquisitionError, FrameHandle, FrameSource};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::signal::{HeartRateZone, TickOutcome};

/// Shortest poll period a session will run at.
pub const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

struct SessionCore<H> {
    state: SessionState,
    epoch: u64,
    handle: Option<H>,
    tracker: PulseTracker,
    status: watch::Sender<MonitorStatus>,
}

impl<H: FrameHandle> SessionCore<H> {
    /// Release the camera, forget all samples and publish `Idle`.
    fn enter_idle(&mut self, fault: Option<String>) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
        }
        self.tracker.reset();
        self.state = SessionState::Idle;
        self.status.send_replace(MonitorStatus {
            state: SessionState::Idle,
            bpm: None,
            measured_at: None,
            fault,
        });
    }

    /// One per-frame step. Returns `false` once the calling task must exit.
    fn step(&mut self, epoch: u64, now: Instant) -> bool {
        if self.epoch != epoch || self.state != SessionState::Monitoring {
            return false;
        }
        let Some(handle) = self.handle.as_mut() else {
            return false;
        };

        match handle.next_frame() {
            Ok(Some(frame)) => {
                self.tracker.push_frame(&frame);
                if let Some(TickOutcome::Accepted(bpm)) = self.tracker.analyze_if_due(now) {
                    info!(bpm, zone = ?HeartRateZone::classify(bpm), "heart rate updated");
                    self.status.send_modify(|status| {
                        status.bpm = Some(bpm);
                        status.measured_at = Some(Utc::now());
                    });
                }
                true
            }
            Ok(None) => {
                trace!("no frame ready");
                true
            }
            Err(e) => {
                error!(error = %e, "frame source failed, stopping session");
                self.epoch += 1;
                self.enter_idle(Some(e.to_string()));
                false
            }
        }
    }
}

/// Lock the core, turning a poisoned lock into a faulted `Idle` session.
fn lock_core<H: FrameHandle>(core: &Mutex<SessionCore<H>>) -> MutexGuard<'_, SessionCore<H>> {
    match core.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            error!("session state poisoned by a panicked frame step, resetting");
            let mut guard = poisoned.into_inner();
            guard.epoch += 1;
            guard.enter_idle(Some("session state corrupted".into()));
            core.clear_poison();
            guard
        }
    }
}

async fn run_frame_loop<H: FrameHandle>(
    core: Arc<Mutex<SessionCore<H>>>,
    epoch: u64,
    frame_interval: Duration,
) {
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let now = Instant::now();
        let step = panic::catch_unwind(AssertUnwindSafe(|| lock_core(&core).step(epoch, now)));
        match step {
            Ok(true) => {}
            Ok(false) => break,
            Err(_) => {
                // Re-locking recovers the poisoned core into a faulted Idle.
                drop(lock_core(&core));
                break;
            }
        }
    }
    debug!(epoch, "frame loop finished");
}

/// One monitoring UI's heart-rate session over an injected frame source.
pub struct MonitorSession<S: FrameSource> {
    source: S,
    frame_interval: Duration,
    core: Arc<Mutex<SessionCore<S::Handle>>>,
    status_rx: watch::Receiver<MonitorStatus>,
    task: Option<JoinHandle<()>>,
}

impl<S: FrameSource> MonitorSession<S> {
    /// `frame_interval` is clamped to at least [`MIN_FRAME_INTERVAL`].
    pub fn new(source: S, analysis: &AnalysisConfig, frame_interval: Duration) -> Self {
        let frame_interval = frame_interval.max(MIN_FRAME_INTERVAL);
        let (status, status_rx) = watch::channel(MonitorStatus::default());
        let core = SessionCore {
            state: SessionState::Idle,
            epoch: 0,
            handle: None,
            tracker: PulseTracker::new(analysis),
            status,
        };
        Self {
            source,
            frame_interval,
            core: Arc::new(Mutex::new(core)),
            status_rx,
            task: None,
        }
    }

    /// Analysis settings from `[analysis]`, poll cadence from `camera.fps`.
    pub fn from_config(source: S, config: &Config) -> Self {
        Self::new(source, &config.analysis, config.camera.frame_interval())
    }

    /// Open the camera and begin sampling. A no-op while already monitoring.
    ///
    /// On failure nothing changes: the session stays `Idle`.
    pub async fn start(&mut self) -> Result<(), AcquisitionError> {
        if self.state() == SessionState::Monitoring {
            debug!(source = self.source.name(), "start requested while already monitoring");
            return Ok(());
        }
        // A session that faulted on its own leaves a finished task behind.
        if let Some(task) = self.task.take() {
            task.abort();
        }

        let handle = match self.source.open().await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, source = self.source.name(), "failed to open camera");
                return Err(e);
            }
        };

        let epoch = {
            let mut core = lock_core(&self.core);
            core.epoch += 1;
            core.tracker.reset();
            core.handle = Some(handle);
            core.state = SessionState::Monitoring;
            core.status.send_replace(MonitorStatus {
                state: SessionState::Monitoring,
                ..MonitorStatus::default()
            });
            core.epoch
        };

        self.task = Some(tokio::spawn(run_frame_loop(
            Arc::clone(&self.core),
            epoch,
            self.frame_interval,
        )));
        info!(
            source = self.source.name(),
            epoch,
            frame_interval_ms = self.frame_interval.as_millis() as u64,
            "monitoring started"
        );
        Ok(())
    }

    /// Cancel sampling, release the camera and clear all readings.
    /// Safe to call at any time and any number of times.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let mut core = lock_core(&self.core);
        if core.state == SessionState::Idle {
            trace!("stop requested while idle");
            return;
        }
        core.epoch += 1;
        core.enter_idle(None);
        info!(source = self.source.name(), "monitoring stopped");
    }

    pub fn state(&self) -> SessionState {
        self.status_rx.borrow().state
    }

    pub fn current_bpm(&self) -> Option<u32> {
        self.status_rx.borrow().bpm
    }

    pub fn status(&self) -> MonitorStatus {
        self.status_rx.borrow().clone()
    }

    /// Receiver notified on every state change and accepted estimate.
    pub fn subscribe(&self) -> watch::Receiver<MonitorStatus> {
        self.status_rx.clone()
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: FrameSource> Drop for MonitorSession<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
