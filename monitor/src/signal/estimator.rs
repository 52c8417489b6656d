use pulsecam_common::config::AnalysisConfig;
use serde::Serialize;

/// Sampling rate assumed when converting peak spacing to BPM.
///
/// This is the nominal camera rate, not a measured one. A source delivering
/// at another rate biases every estimate by the same ratio.
pub const FPS_ASSUMED: f64 = 30.0;
/// Lowest physiologically plausible estimate.
pub const BPM_MIN: u32 = 40;
/// Highest physiologically plausible estimate.
pub const BPM_MAX: u32 = 200;

/// Result of one analysis tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Estimate replaced with this value.
    Accepted(u32),
    /// Fewer than two peaks; estimate untouched.
    InsufficientData,
    /// Computed value fell outside the plausible range; estimate untouched.
    OutOfRange(u32),
}

/// Converts peak spacing into a validated heart rate and keeps the last
/// accepted value across inconclusive ticks.
#[derive(Debug, Clone)]
pub struct BpmEstimator {
    fps: f64,
    bpm_min: u32,
    bpm_max: u32,
    current: Option<u32>,
}

impl Default for BpmEstimator {
    fn default() -> Self {
        Self::new(FPS_ASSUMED, BPM_MIN, BPM_MAX)
    }
}

impl BpmEstimator {
    pub fn new(fps: f64, bpm_min: u32, bpm_max: u32) -> Self {
        Self {
            fps,
            bpm_min,
            bpm_max,
            current: None,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.assumed_fps, config.bpm_min, config.bpm_max)
    }

    /// Rounded BPM implied by the mean spacing of `peaks`, unvalidated.
    pub fn raw_bpm(&self, peaks: &[usize]) -> Option<f64> {
        let (first, last) = match peaks {
            [first, .., last] => (*first, *last),
            _ => return None,
        };
        let avg_interval = (last - first) as f64 / (peaks.len() - 1) as f64;
        if avg_interval <= 0.0 {
            return None;
        }
        Some((60.0 / (avg_interval / self.fps)).round())
    }

    /// Evaluate one tick's peaks, replacing the estimate only when the
    /// result is in range.
    pub fn update(&mut self, peaks: &[usize]) -> TickOutcome {
        let Some(bpm) = self.raw_bpm(peaks) else {
            return TickOutcome::InsufficientData;
        };
        if bpm < self.bpm_min as f64 || bpm > self.bpm_max as f64 {
            return TickOutcome::OutOfRange(bpm as u32);
        }
        let bpm = bpm as u32;
        self.current = Some(bpm);
        TickOutcome::Accepted(bpm)
    }

    pub fn current(&self) -> Option<u32> {
        self.current
    }

    /// Forget the estimate. Only a session reset should do this.
    pub fn reset(&mut self) {
        self.current = None;
    }
}

/// Coarse resting heart-rate band shown next to the reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeartRateZone {
    BelowNormal,
    Normal,
    Elevated,
}

impl HeartRateZone {
    pub fn classify(bpm: u32) -> Self {
        match bpm {
            0..=59 => HeartRateZone::BelowNormal,
            60..=100 => HeartRateZone::Normal,
            _ => HeartRateZone::Elevated,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            HeartRateZone::BelowNormal => "heart rate is below normal range",
            HeartRateZone::Normal => "heart rate is normal",
            HeartRateZone::Elevated => "heart rate is elevated",
        }
    }
}
