//! Sliding-window smoothing of gaze ratios.

use crate::core::ratio::GazeRatio;
use std::collections::VecDeque;

/// Default number of samples averaged per axis.
pub const DEFAULT_WINDOW: usize = 10;

/// Per-axis moving average over the last `capacity` samples.
///
/// Missing frames are never pushed, so the last smoothed value simply
/// persists across detection gaps.
#[derive(Debug, Clone)]
pub struct Smoother {
    capacity: usize,
    horizontal: VecDeque<f64>,
    vertical: VecDeque<f64>,
}

impl Smoother {
    /// Create a smoother. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            horizontal: VecDeque::with_capacity(capacity),
            vertical: VecDeque::with_capacity(capacity),
        }
    }

    /// Add a raw sample, evicting the oldest when full, and return the new mean.
    pub fn push(&mut self, ratio: GazeRatio) -> GazeRatio {
        if self.horizontal.len() == self.capacity {
            self.horizontal.pop_front();
            self.vertical.pop_front();
        }
        self.horizontal.push_back(ratio.horizontal);
        self.vertical.push_back(ratio.vertical);

        GazeRatio {
            horizontal: mean(&self.horizontal),
            vertical: mean(&self.vertical),
        }
    }

    /// Current smoothed ratio, or `None` before the first sample.
    pub fn current(&self) -> Option<GazeRatio> {
        if self.horizontal.is_empty() {
            return None;
        }
        Some(GazeRatio {
            horizontal: mean(&self.horizontal),
            vertical: mean(&self.vertical),
        })
    }

    pub fn len(&self) -> usize {
        self.horizontal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.horizontal.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all held samples.
    pub fn clear(&mut self) {
        self.horizontal.clear();
        self.vertical.clear();
    }
}

impl Default for Smoother {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

fn mean(values: &VecDeque<f64>) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_has_no_data() {
        let smoother = Smoother::new(10);
        assert!(smoother.current().is_none());
        assert!(smoother.is_empty());
    }

    #[test]
    fn test_warm_up_averages_partial_window() {
        let mut smoother = Smoother::new(10);
        smoother.push(GazeRatio::new(0.4, 0.2));
        let smoothed = smoother.push(GazeRatio::new(0.6, 0.4));
        assert!((smoothed.horizontal - 0.5).abs() < 1e-12);
        assert!((smoothed.vertical - 0.3).abs() < 1e-12);
        assert_eq!(smoother.len(), 2);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut smoother = Smoother::new(3);
        for h in [1.0, 2.0, 3.0, 4.0] {
            smoother.push(GazeRatio::new(h, 0.0));
        }
        assert_eq!(smoother.len(), 3);
        let current = smoother.current().unwrap();
        assert!((current.horizontal - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut smoother = Smoother::new(0);
        assert_eq!(smoother.capacity(), 1);
        smoother.push(GazeRatio::new(0.1, 0.1));
        let last = smoother.push(GazeRatio::new(0.9, 0.7));
        assert_eq!(last, GazeRatio::new(0.9, 0.7));
    }
}
