//! Per-frame signal reduction and periodicity analysis.

pub mod buffer;
pub mod estimator;
pub mod extractor;
pub mod peaks;

pub use buffer::SampleBuffer;
pub use estimator::{BpmEstimator, HeartRateZone, TickOutcome};
pub use extractor::{extract, Sample};
pub use peaks::{find_peaks, PeakDetector};
