//! Bounded buffer of recent pace values for the live sparkline.

use std::collections::VecDeque;

/// Default number of samples kept
pub const DEFAULT_CAPACITY: usize = 30;

/// Fixed-capacity FIFO of pace samples (seconds per km). Not persisted.
#[derive(Debug, Clone)]
pub struct PaceHistory {
    values: VecDeque<f64>,
    capacity: usize,
}

impl PaceHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, evicting the oldest once full
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// Fastest and slowest pace in the window, for scaling the sparkline
    pub fn range(&self) -> Option<(f64, f64)> {
        let mut iter = self.values.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

impl Default for PaceHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
