//! Fixed-capacity sliding window over the most recent samples.

use std::collections::VecDeque;
use tracing::debug;

use crate::model::{MetricId, Sample};

/// Insertion-ordered FIFO of the most recent `capacity` samples.
///
/// Appends are O(1) amortized and never re-sort: live samples are
/// expected to arrive after the ones already stored. When an append
/// pushes the length past `capacity`, the oldest entries are evicted
/// from the front, bounding memory regardless of stream duration.
#[derive(Debug)]
pub struct SlidingWindowBuffer {
    capacity: usize,
    samples: VecDeque<Sample>,
}

impl SlidingWindowBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, samples: VecDeque::with_capacity(capacity) }
    }

    /// Appends a sample, evicting from the front once over capacity.
    ///
    /// An out-of-order append (timestamp before the last stored one) is
    /// tolerated and stored as-is; it is logged because it breaks the
    /// ascending-order expectation of downstream chart code.
    pub fn append(&mut self, sample: Sample) {
        if let Some(last) = self.samples.back() {
            if sample.timestamp() < last.timestamp() {
                debug!(
                    timestamp = %sample.timestamp(),
                    last = %last.timestamp(),
                    "out-of-order append to sliding window"
                );
            }
        }
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// The current contents in append order.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().cloned().collect()
    }

    /// Values of one metric across the window, in append order.
    pub fn metric_values(&self, metric: MetricId) -> Vec<f64> {
        self.samples.iter().filter_map(|s| s.value(metric)).collect()
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
