use serde::Serialize;

/// Mean and population standard deviation of one trailing window.
///
/// Both are `None` while the window holds fewer than `min_periods` samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WindowStats {
    /// Number of samples in the window.
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

impl WindowStats {
    /// Standardized deviation of `value` against this window.
    ///
    /// `None` when the window is not yet scored or has zero spread.
    pub fn z_score(&self, value: f64) -> Option<f64> {
        match (self.mean, self.std) {
            (Some(mean), Some(std)) if std != 0.0 => Some((value - mean) / std),
            _ => None,
        }
    }
}

/// Sliding trailing window over a dated metric series.
///
/// Holds the series plus a moving `[start, end)` range. Each step extends
/// the window to include the next day and drops the oldest one once the
/// window is full, yielding the statistics for the window ending at that day.
#[derive(Debug, Clone)]
pub struct RollingWindow<'a> {
    /// Metric values, oldest first.
    values: &'a [f64],
    /// Maximum number of values in a window.
    size: usize,
    /// Minimum number of values before statistics are defined.
    min_periods: usize,
    start: usize,
    end: usize,
}

impl<'a> RollingWindow<'a> {
    /// `size` and `min_periods` are clamped to at least 1.
    pub fn new(values: &'a [f64], size: usize, min_periods: usize) -> Self {
        Self {
            values,
            size: size.max(1),
            min_periods: min_periods.max(1),
            start: 0,
            end: 0,
        }
    }

    /// Values currently inside the window.
    pub fn window(&self) -> &'a [f64] {
        let values: &'a [f64] = self.values;
        &values[self.start..self.end]
    }

    fn stats(&self) -> WindowStats {
        let window = self.window();
        let count = window.len();
        if count < self.min_periods {
            return WindowStats { count, mean: None, std: None };
        }

        // A constant window has its value as exact mean and no spread.
        let first = window[0];
        if window.iter().all(|v| *v == first) {
            return WindowStats { count, mean: Some(first), std: Some(0.0) };
        }

        let n = count as f64;
        let mean = window.iter().sum::<f64>() / n;
        let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        WindowStats {
            count,
            mean: Some(mean),
            std: Some(variance.sqrt()),
        }
    }
}

impl Iterator for RollingWindow<'_> {
    type Item = WindowStats;

    fn next(&mut self) -> Option<WindowStats> {
        if self.end >= self.values.len() {
            return None;
        }
        self.end += 1;
        if self.end - self.start > self.size {
            self.start += 1;
        }
        Some(self.stats())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.values.len() - self.end;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RollingWindow<'_> {}

/// Trailing statistics for every position of `values`.
pub fn rolling_stats(values: &[f64], size: usize, min_periods: usize) -> Vec<WindowStats> {
    RollingWindow::new(values, size, min_periods).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn warm_up_positions_are_unscored() {
        let stats = rolling_stats(&[1.0, 2.0, 3.0, 4.0], 7, 3);
        assert_eq!(stats.len(), 4);
        assert_eq!(stats[0], WindowStats { count: 1, mean: None, std: None });
        assert_eq!(stats[1].mean, None);
        assert_eq!(stats[1].std, None);
        assert!(close(stats[2].mean.unwrap(), 2.0));
        assert!(close(stats[3].mean.unwrap(), 2.5));
    }

    #[test]
    fn population_std_divides_by_count() {
        // [2, 4, 4, 4, 5, 5, 7, 9] has population std exactly 2.
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = rolling_stats(&values, 8, 3);
        let last = stats[7];
        assert_eq!(last.count, 8);
        assert!(close(last.mean.unwrap(), 5.0));
        assert!(close(last.std.unwrap(), 2.0));
    }

    #[test]
    fn window_slides_and_drops_oldest() {
        let values = [100.0, 1.0, 2.0, 3.0];
        let mut window = RollingWindow::new(&values, 3, 1);
        window.next();
        window.next();
        window.next();
        assert_eq!(window.window(), &[100.0, 1.0, 2.0]);
        let stats = window.next().unwrap();
        assert_eq!(window.window(), &[1.0, 2.0, 3.0]);
        assert_eq!(stats.count, 3);
        assert!(close(stats.mean.unwrap(), 2.0));
        assert!(window.next().is_none());
    }

    #[test]
    fn constant_window_has_exact_zero_std() {
        let values = [0.1; 10];
        for stats in rolling_stats(&values, 7, 3).into_iter().skip(2) {
            assert_eq!(stats.mean, Some(0.1));
            assert_eq!(stats.std, Some(0.0));
            assert_eq!(stats.z_score(0.1), None);
        }
    }

    #[test]
    fn z_score_matches_formula() {
        let stats = WindowStats { count: 5, mean: Some(10.0), std: Some(4.0) };
        assert_eq!(stats.z_score(18.0), Some(2.0));
        assert_eq!(stats.z_score(6.0), Some(-1.0));
    }

    #[test]
    fn z_score_null_without_baseline() {
        let stats = WindowStats { count: 2, mean: None, std: None };
        assert_eq!(stats.z_score(50.0), None);
    }

    #[test]
    fn window_of_one() {
        let stats = rolling_stats(&[3.0, 5.0], 1, 1);
        assert_eq!(stats[1].mean, Some(5.0));
        assert_eq!(stats[1].std, Some(0.0));
    }

    #[test]
    fn empty_series() {
        assert!(rolling_stats(&[], 7, 3).is_empty());
    }
}
