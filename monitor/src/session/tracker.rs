use std::time::Duration;

use pulsecam_common::config::AnalysisConfig;
use pulsecam_common::Frame;
use tokio::time::Instant;
use tracing::debug;

use crate::signal::{extract, BpmEstimator, PeakDetector, Sample, SampleBuffer, TickOutcome};

/// Per-session signal state: the sample buffer, the analysis gate and the
/// retained estimate. Time is passed in so the gate can be driven by tests.
#[derive(Debug, Clone)]
pub struct PulseTracker {
    buffer: SampleBuffer,
    detector: PeakDetector,
    estimator: BpmEstimator,
    analysis_interval: Duration,
    /// Analysis needs strictly more samples than this.
    gate_samples: usize,
    last_analysis: Option<Instant>,
}

impl Default for PulseTracker {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl PulseTracker {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            buffer: SampleBuffer::new(config.buffer_capacity),
            detector: PeakDetector::new(config.min_samples),
            estimator: BpmEstimator::from_config(config),
            analysis_interval: Duration::from_millis(config.interval_ms),
            gate_samples: config.min_samples,
            last_analysis: None,
        }
    }

    /// Reduce a frame to a sample and buffer it.
    pub fn push_frame(&mut self, frame: &Frame) -> Sample {
        let sample = extract(frame);
        self.buffer.append(sample);
        sample
    }

    /// Run an analysis tick if the gate is open at `now`.
    ///
    /// The gate opens when the buffer holds more than `min_samples` and
    /// either no analysis has run since the last reset or at least the
    /// analysis interval has passed.
    pub fn analyze_if_due(&mut self, now: Instant) -> Option<TickOutcome> {
        if self.buffer.len() <= self.gate_samples {
            return None;
        }
        if let Some(last) = self.last_analysis {
            if now.saturating_duration_since(last) < self.analysis_interval {
                return None;
            }
        }
        self.last_analysis = Some(now);

        let snapshot = self.buffer.snapshot();
        let peaks = self.detector.detect(&snapshot);
        let outcome = self.estimator.update(&peaks);
        debug!(
            samples = snapshot.len(),
            peaks = peaks.len(),
            ?outcome,
            "analysis tick"
        );
        Some(outcome)
    }

    pub fn current_bpm(&self) -> Option<u32> {
        self.estimator.current()
    }

    pub fn sample_count(&self) -> usize {
        self.buffer.len()
    }

    /// Drop all samples, the estimate and the gate timestamp.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.estimator.reset();
        self.last_analysis = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(red: u8) -> Frame {
        Frame::solid(2, 2, [red, 0, 0]).unwrap()
    }

    /// One 25-sample pulse period (72 BPM at 30 fps) as red levels.
    fn pulse(i: usize) -> u8 {
        let phase = std::f64::consts::TAU * (i % 25) as f64 / 25.0;
        (128.0 + 40.0 * phase.sin()).round() as u8
    }

    fn feed(tracker: &mut PulseTracker, range: std::ops::Range<usize>) {
        for i in range {
            tracker.push_frame(&frame(pulse(i)));
        }
    }

    #[test]
    fn push_frame_buffers_mean_red() {
        let mut tracker = PulseTracker::default();
        let sample = tracker.push_frame(&frame(77));
        assert_eq!(sample.value(), 77.0);
        assert_eq!(tracker.sample_count(), 1);
    }

    #[test]
    fn gate_waits_for_more_than_min_samples() {
        let mut tracker = PulseTracker::default();
        let now = Instant::now();
        feed(&mut tracker, 0..60);
        assert_eq!(tracker.analyze_if_due(now), None);

        feed(&mut tracker, 60..61);
        assert_eq!(tracker.analyze_if_due(now), Some(TickOutcome::Accepted(72)));
        assert_eq!(tracker.current_bpm(), Some(72));
    }

    #[test]
    fn gate_rate_limits_analysis() {
        let mut tracker = PulseTracker::default();
        let start = Instant::now();
        feed(&mut tracker, 0..80);

        assert!(tracker.analyze_if_due(start).is_some());
        assert!(tracker
            .analyze_if_due(start + Duration::from_millis(1999))
            .is_none());
        assert!(tracker
            .analyze_if_due(start + Duration::from_millis(2000))
            .is_some());
    }

    #[test]
    fn flat_signal_keeps_previous_estimate() {
        let mut tracker = PulseTracker::default();
        let start = Instant::now();
        feed(&mut tracker, 0..80);
        assert_eq!(tracker.analyze_if_due(start), Some(TickOutcome::Accepted(72)));

        // Flood the buffer with a flat signal: no peaks at all.
        for _ in 0..256 {
            tracker.push_frame(&frame(128));
        }
        assert_eq!(
            tracker.analyze_if_due(start + Duration::from_secs(3)),
            Some(TickOutcome::InsufficientData)
        );
        assert_eq!(tracker.current_bpm(), Some(72));
    }

    #[test]
    fn fast_flicker_is_discarded() {
        let mut tracker = PulseTracker::default();
        let start = Instant::now();
        feed(&mut tracker, 0..80);
        tracker.analyze_if_due(start);

        // Period-6 flicker → 300 BPM, outside the plausible range.
        for i in 0..256 {
            let red = if i % 6 == 3 { 200 } else { 100 };
            tracker.push_frame(&frame(red));
        }
        assert_eq!(
            tracker.analyze_if_due(start + Duration::from_secs(3)),
            Some(TickOutcome::OutOfRange(300))
        );
        assert_eq!(tracker.current_bpm(), Some(72));
    }

    #[test]
    fn reset_starts_from_scratch() {
        let mut tracker = PulseTracker::default();
        let start = Instant::now();
        feed(&mut tracker, 0..80);
        tracker.analyze_if_due(start);

        tracker.reset();
        assert_eq!(tracker.sample_count(), 0);
        assert_eq!(tracker.current_bpm(), None);

        // The gate timestamp is cleared too: the next full buffer analyses
        // immediately, not 2 s after the pre-reset tick.
        feed(&mut tracker, 0..61);
        assert!(tracker.analyze_if_due(start).is_some());
    }
}
