use std::collections::VecDeque;

use super::extractor::Sample;

/// Default capacity: 256 samples, roughly 8.5 s at 30 fps.
pub const N_MAX: usize = 256;

/// Bounded FIFO of recent samples, oldest first.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(N_MAX)
    }
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Push to the tail, evicting from the head past capacity.
    pub fn append(&mut self, sample: Sample) {
        self.samples.push_back(sample.value());
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Ordered copy of the current contents.
    pub fn snapshot(&self) -> Vec<f32> {
        self.samples.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
