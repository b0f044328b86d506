use std::collections::VecDeque;

/// Evictions between full re-summations of the window, bounding the
/// floating-point drift of the incremental running sum.
const RESYNC_EVERY: u64 = 1024;

/// Evicting a value this many times larger than the remaining sum cancels
/// away the sum's precision, so the window re-sums at once.
const CANCELLATION_RATIO: f64 = 1e6;

/// Fixed-capacity FIFO of the most recent sample values with an incremental
/// running sum, so `mean()` is O(1).
#[derive(Debug, Clone)]
pub struct RollingWindow {
    values:    VecDeque<f64>,
    capacity:  usize,
    sum:       f64,
    evictions: u64,
}

impl RollingWindow {
    /// Capacity is clamped to at least one value.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0.0,
            evictions: 0,
        }
    }

    /// Push a new value, evicting the oldest if at capacity.
    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        let mut resync = false;
        if self.values.len() > self.capacity {
            if let Some(oldest) = self.values.pop_front() {
                self.sum -= oldest;
                self.evictions += 1;
                resync = self.evictions % RESYNC_EVERY == 0
                    || oldest.abs() > self.sum.abs() * CANCELLATION_RATIO;
            }
        }
        // An overflowed sum never recovers by subtraction.
        if resync || !self.sum.is_finite() {
            self.resync();
        }
    }

    /// Average of the values in the window, `0.0` when empty.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.sum / self.values.len() as f64
    }

    /// Population standard deviation around [`RollingWindow::mean`].
    pub fn std_dev(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .values
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / self.values.len() as f64;
        variance.sqrt()
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

    /// Running sum of the current contents.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Values from oldest to newest.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    fn resync(&mut self) {
        self.sum = self.values.iter().sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_window_mean_is_zero() {
        let window = RollingWindow::new(5);
        assert_eq!(window.mean(), 0.0);
        assert_eq!(window.std_dev(), 0.0);
        assert!(window.is_empty());
    }

    #[test]
    fn oldest_value_is_evicted() {
        let mut window = RollingWindow::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            window.push(v);
        }
        assert_eq!(window.values().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
        assert_eq!(window.sum(), 9.0);
        assert_eq!(window.mean(), 3.0);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut window = RollingWindow::new(0);
        window.push(7.0);
        window.push(8.0);
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.len(), 1);
        assert_eq!(window.mean(), 8.0);
    }

    #[test]
    fn std_dev_is_population_std_dev() {
        let mut window = RollingWindow::new(8);
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            window.push(v);
        }
        assert_eq!(window.mean(), 5.0);
        assert!((window.std_dev() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn long_runs_stay_in_sync() {
        let mut window = RollingWindow::new(7);
        for i in 0..10_000u32 {
            window.push(f64::from(i % 97) * 0.1 + 1e6);
        }
        let exact: f64 = window.values().sum();
        assert!((window.sum() - exact).abs() < 1e-4);
    }

    #[test]
    fn overflowed_sum_recovers_once_giants_leave() {
        let mut window = RollingWindow::new(10);
        window.push(1e308);
        window.push(1e308);
        assert!(window.sum().is_infinite());

        for _ in 0..20 {
            window.push(5.0);
        }
        assert_eq!(window.sum(), 50.0);
        assert_eq!(window.mean(), 5.0);
        assert_eq!(window.std_dev(), 0.0);
    }

    #[test]
    fn small_values_survive_a_giant_leaving() {
        let mut window = RollingWindow::new(3);
        window.push(1e20);
        window.push(1.0);
        window.push(2.0);
        // 1e20 + 3 rounds to 1e20; only a re-sum recovers the 3.
        window.push(4.0);
        assert_eq!(window.sum(), 7.0);
    }

    fn magnitude() -> impl Strategy<Value = f64> {
        prop_oneof![
            -1.0e3f64..1.0e3,
            -1.0e308f64..1.0e308,
            Just(f64::MAX),
        ]
    }

    proptest! {
        #[test]
        fn sum_stays_finite_across_huge_magnitudes(
            capacity in 1usize..16,
            values in proptest::collection::vec(magnitude(), 0..256),
        ) {
            let mut window = RollingWindow::new(capacity);
            let mut largest = 0.0f64;
            for v in values {
                window.push(v);
                largest = largest.max(v.abs());

                let exact: f64 = window.values().sum();
                if exact.is_finite() {
                    prop_assert!(window.sum().is_finite(),
                        "running {} vs exact {}", window.sum(), exact);
                    // Rounding error is bounded by the largest magnitude ever held.
                    let tolerance = 1e-9 * (1.0 + largest) * capacity as f64;
                    prop_assert!((window.sum() - exact).abs() <= tolerance,
                        "running {} vs exact {}", window.sum(), exact);
                }
            }
        }

        #[test]
        fn running_sum_matches_brute_force(
            capacity in 1usize..64,
            values in proptest::collection::vec(-1.0e3f64..1.0e3, 0..512),
        ) {
            let mut window = RollingWindow::new(capacity);
            for v in values {
                window.push(v);
                prop_assert!(window.len() <= capacity);

                let exact: f64 = window.values().sum();
                let tolerance = 1e-6 * (1.0 + exact.abs());
                prop_assert!((window.sum() - exact).abs() <= tolerance,
                    "running {} vs exact {}", window.sum(), exact);
            }
        }
    }
}
