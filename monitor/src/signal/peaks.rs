/// Minimum snapshot length for a meaningful peak scan (2 s at 30 fps).
pub const MIN_SAMPLES: usize = 60;

/// Indices of strict local maxima lying above the mean of `samples`.
///
/// A plateau is never a peak: both neighbours must be strictly lower.
/// Endpoints are never peaks.
pub fn find_peaks(samples: &[f32]) -> Vec<usize> {
    if samples.len() < 3 {
        return Vec::new();
    }
    let threshold =
        samples.iter().map(|&s| s as f64).sum::<f64>() / samples.len() as f64;

    samples
        .windows(3)
        .enumerate()
        .filter(|(_, w)| (w[1] as f64) > threshold && w[1] > w[0] && w[1] > w[2])
        .map(|(i, _)| i + 1)
        .collect()
}

/// Peak scan that refuses to look at too-short snapshots.
#[derive(Debug, Clone, Copy)]
pub struct PeakDetector {
    min_samples: usize,
}

impl Default for PeakDetector {
    fn default() -> Self {
        Self::new(MIN_SAMPLES)
    }
}

impl PeakDetector {
    pub fn new(min_samples: usize) -> Self {
        Self { min_samples }
    }

    /// Peaks of `samples`, or none at all below `min_samples`.
    pub fn detect(&self, samples: &[f32]) -> Vec<usize> {
        if samples.len() < self.min_samples {
            return Vec::new();
        }
        find_peaks(samples)
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_maxima_above_mean() {
        // mean ≈ 2.86; 3, 5 and 6 are strict local maxima above it
        let samples = [1.0, 3.0, 2.0, 5.0, 2.0, 6.0, 1.0];
        assert_eq!(find_peaks(&samples), vec![1, 3, 5]);
    }

    #[test]
    fn plateau_is_not_a_peak() {
        assert!(find_peaks(&[1.0, 5.0, 5.0, 1.0]).is_empty());
    }

    #[test]
    fn local_max_below_mean_ignored() {
        // 2 at index 1 is a local max but below the mean (≈5.14)
        let samples = [1.0, 2.0, 1.0, 9.0, 9.0, 10.0, 4.0];
        assert_eq!(find_peaks(&samples), vec![5]);
    }

    #[test]
    fn endpoints_never_flagged() {
        assert!(find_peaks(&[9.0, 1.0, 1.0, 9.0]).is_empty());
    }

    #[test]
    fn degenerate_inputs_yield_nothing() {
        assert!(find_peaks(&[]).is_empty());
        assert!(find_peaks(&[5.0]).is_empty());
        assert!(find_peaks(&[1.0, 5.0]).is_empty());
        assert!(find_peaks(&[3.0; 100]).is_empty());
    }

    #[test]
    fn deterministic_across_calls() {
        let samples: Vec<f32> = (0..120).map(|i| ((i as f32) * 0.4).sin()).collect();
        assert_eq!(find_peaks(&samples), find_peaks(&samples));
    }

    #[test]
    fn detector_requires_min_samples() {
        let detector = PeakDetector::default();
        let short = [1.0, 3.0, 2.0, 5.0, 2.0, 6.0, 1.0];
        assert!(detector.detect(&short).is_empty());

        // Period-10 triangle wave, 60 samples: peaks at 5, 15, ..., 55.
        let long: Vec<f32> = (0..60).map(|i| 5.0 - ((i % 10) as f32 - 5.0).abs()).collect();
        assert_eq!(detector.detect(&long), vec![5, 15, 25, 35, 45, 55]);
    }
}
