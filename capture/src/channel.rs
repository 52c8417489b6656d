use pulsecam_common::{Frame, FrameError, FrameHandle};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Frames queued between a reader task and the session. Small on purpose:
/// a slow consumer should see fresh frames, not a backlog.
pub const FRAME_QUEUE_DEPTH: usize = 4;

pub type FrameResult = Result<Frame, FrameError>;

/// Handle for sources whose frames arrive from a background reader task.
pub struct ChannelHandle {
    rx: mpsc::Receiver<FrameResult>,
    task: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    pub fn new(rx: mpsc::Receiver<FrameResult>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            task: Some(task),
        }
    }
}

impl FrameHandle for ChannelHandle {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        match self.rx.try_recv() {
            Ok(Ok(frame)) => Ok(Some(frame)),
            Ok(Err(e)) => Err(e),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(FrameError::SourceClosed),
        }
    }

    fn close(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("stopping frame reader task");
            task.abort();
        }
        self.rx.close();
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Queue a frame without waiting. Returns `false` once the handle is gone.
pub(crate) fn offer(tx: &mpsc::Sender<FrameResult>, item: FrameResult) -> bool {
    match tx.try_send(item) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            trace!("frame queue full, dropping frame");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}
