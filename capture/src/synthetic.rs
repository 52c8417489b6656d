use pulsecam_common::config::{CameraConfig, SyntheticConfig};
use pulsecam_common::{AcquisitionError, Frame, FrameError, FrameHandle, FrameSource};
use std::f64::consts::TAU;
use tracing::info;

/// Side length of frames from [`SyntheticSource::new`]. The signal is
/// spatially uniform, so a larger frame only costs time.
const DEFAULT_SIDE: u32 = 8;

/// Generates uniform frames whose red level follows a sinusoidal pulse.
///
/// One frame is produced per poll; the waveform advances by one sample at
/// `sample_rate` per frame, so the pulse rate seen by the analyser equals
/// `bpm` when the session polls at the same rate.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    bpm: f64,
    sample_rate: f64,
    baseline: f64,
    amplitude: f64,
    width: u32,
    height: u32,
}

impl SyntheticSource {
    pub fn new(bpm: f64, sample_rate: f64) -> Self {
        Self {
            bpm,
            sample_rate,
            baseline: 128.0,
            amplitude: 40.0,
            width: DEFAULT_SIDE,
            height: DEFAULT_SIDE,
        }
    }

    pub fn from_config(camera: &CameraConfig, synthetic: &SyntheticConfig) -> Self {
        Self::new(synthetic.bpm, camera.fps)
            .with_levels(synthetic.baseline, synthetic.amplitude)
            .with_size(camera.width, camera.height)
    }

    pub fn with_levels(mut self, baseline: f64, amplitude: f64) -> Self {
        self.baseline = baseline;
        self.amplitude = amplitude;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }
}

impl FrameSource for SyntheticSource {
    type Handle = SyntheticHandle;

    async fn open(&self) -> Result<SyntheticHandle, AcquisitionError> {
        if self.width == 0 || self.height == 0 {
            return Err(AcquisitionError::DeviceAbsent(format!(
                "synthetic camera has zero area ({}x{})",
                self.width, self.height
            )));
        }
        info!(bpm = self.bpm, sample_rate = self.sample_rate, "synthetic camera opened");
        Ok(SyntheticHandle {
            source: self.clone(),
            index: 0,
            closed: false,
        })
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

pub struct SyntheticHandle {
    source: SyntheticSource,
    index: u64,
    closed: bool,
}

impl SyntheticHandle {
    fn red_level(&self) -> u8 {
        let s = &self.source;
        let phase = TAU * (s.bpm / 60.0) * (self.index as f64 / s.sample_rate);
        (s.baseline + s.amplitude * phase.sin()).round().clamp(0.0, 255.0) as u8
    }
}

impl FrameHandle for SyntheticHandle {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        if self.closed {
            return Err(FrameError::SourceClosed);
        }
        let red = self.red_level();
        self.index += 1;
        Frame::solid(self.source.width, self.source.height, [red, 60, 60]).map(Some)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
