use crate::models::{MetricKind, MetricSample};
use std::collections::{BTreeMap, VecDeque};
use std::num::NonZeroUsize;

pub const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(20) {
    Some(n) => n,
    None => panic!("default capacity must be non-zero"),
};

/// Fixed-capacity sliding window of the most recent samples for one metric.
///
/// Samples are kept in append order and the oldest one is evicted once the
/// window is full. Only the sample count is bounded; the time span covered
/// depends on how often the producer appends.
#[derive(Debug, Clone)]
pub struct MetricWindow {
    capacity: NonZeroUsize,
    samples: VecDeque<MetricSample>,
}

impl MetricWindow {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity.get()),
        }
    }

    pub fn append(&mut self, sample: MetricSample) -> &Self {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity.get() {
            self.samples.pop_front();
        }
        self
    }

    pub fn latest(&self) -> Option<MetricSample> {
        self.samples.back().copied()
    }

    /// Copy of the window contents, oldest first.
    pub fn snapshot(&self) -> Vec<MetricSample> {
        self.samples.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }
}

impl Default for MetricWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// One window per live metric, owned by whoever consumes the sample stream.
#[derive(Debug, Clone)]
pub struct MetricBoard {
    windows: BTreeMap<MetricKind, MetricWindow>,
}

impl MetricBoard {
    pub fn new(capacity: NonZeroUsize) -> Self {
        let windows = MetricKind::ALL
            .into_iter()
            .map(|kind| (kind, MetricWindow::new(capacity)))
            .collect();
        Self { windows }
    }

    pub fn record(&mut self, kind: MetricKind, sample: MetricSample) -> &MetricWindow {
        let capacity = self.capacity();
        self.windows
            .entry(kind)
            .or_insert_with(|| MetricWindow::new(capacity))
            .append(sample)
    }

    pub fn window(&self, kind: MetricKind) -> Option<&MetricWindow> {
        self.windows.get(&kind)
    }

    pub fn latest(&self, kind: MetricKind) -> Option<MetricSample> {
        self.window(kind).and_then(MetricWindow::latest)
    }

    fn capacity(&self) -> NonZeroUsize {
        self.windows
            .values()
            .next()
            .map(|w| w.capacity)
            .unwrap_or(DEFAULT_CAPACITY)
    }
}
