use std::time::{Duration, Instant};

/// Keeps the last successfully fetched value of a snapshot.
///
/// Every request still goes to the data source; this only backs the
/// stale-but-valid fallback used when the source is unreachable.
pub struct SnapshotCache<T: Clone> {
    value: Option<T>,
    cached_at: Option<Instant>,
}

/// A served value, flagged when it came from the cache instead of the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub stale: bool,
}

impl<T: Clone> Default for SnapshotCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> SnapshotCache<T> {
    pub fn new() -> Self {
        Self {
            value: None,
            cached_at: None,
        }
    }

    /// The last stored value, flagged stale.
    pub fn last_known(&self) -> Option<Cached<T>> {
        self.value.clone().map(|value| Cached { value, stale: true })
    }

    pub fn set(&mut self, value: T) {
        self.value = Some(value);
        self.cached_at = Some(Instant::now());
    }

    /// Time since the last successful `set`.
    pub fn age(&self) -> Option<Duration> {
        self.cached_at.map(|at| at.elapsed())
    }
}
