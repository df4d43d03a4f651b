// =============================================================================
// Rolling Window Statistics
// =============================================================================
//
// Trailing mean and sample standard deviation (n - 1 denominator) over a
// fixed number of observations, current observation included.
//
// The accumulator is the window itself. Until it holds `window` values the
// fold yields `None`: the first `window - 1` outputs are the warm-up region,
// not an error. Each full window is evaluated two-pass (mean, then squared
// deviations) so a constant window gives a standard deviation of exactly 0.
// =============================================================================

use std::collections::VecDeque;

/// Mean and sample standard deviation of one full window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub std_dev: f64,
}

/// Streaming trailing-window accumulator.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    window: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    /// `window` must be at least 2 for the sample deviation to be defined.
    pub fn new(window: usize) -> Self {
        Self {
            window,
            values: VecDeque::with_capacity(window + 1),
        }
    }

    /// Push the next observation and return the statistics of the trailing
    /// window, or `None` while still warming up.
    pub fn push(&mut self, value: f64) -> Option<WindowStats> {
        self.values.push_back(value);
        if self.values.len() > self.window {
            self.values.pop_front();
        }
        if self.window < 2 || self.values.len() < self.window {
            return None;
        }

        let n = self.window as f64;
        let mean = self.values.iter().sum::<f64>() / n;
        let ss: f64 = self.values.iter().map(|v| (v - mean).powi(2)).sum();
        Some(WindowStats {
            mean,
            std_dev: (ss / (n - 1.0)).sqrt(),
        })
    }
}

/// Rolling statistics for every position of `values`.
#[cfg(test)]
pub fn rolling_stats(values: &[f64], window: usize) -> Vec<Option<WindowStats>> {
    let mut acc = RollingWindow::new(window);
    values.iter().map(|&v| acc.push(v)).collect()
}
