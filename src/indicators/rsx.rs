// =============================================================================
// RSX: Smoothed Relative Strength Momentum
// =============================================================================
//
// Step 1: delta_t = close_t - close_{t-1}  (undefined on the first bar)
// Step 2: up = max(delta, 0), down = max(-delta, 0)
// Step 3: smooth both with the bias-adjusted exponential mean, alpha = 1/period
// Step 4: ratio = up_ema / (down_ema + eps)
//          rsx   = 100 - 100 / (1 + ratio)
//
// The epsilon keeps a flat or one-sided market defined: no down moves gives a
// huge ratio (rsx -> 100), no moves at all gives ratio 0. Neither is an error.
// =============================================================================

use super::ewm::ExponentialMean;
use crate::runtime_config::RsxParams;

/// RSX value for every close. The first entry is `None`.
pub fn calculate_rsx(closes: &[f64], params: &RsxParams) -> Vec<Option<f64>> {
    let alpha = 1.0 / params.period.max(1) as f64;
    let mut up_mean = ExponentialMean::with_alpha(alpha);
    let mut down_mean = ExponentialMean::with_alpha(alpha);
    let mut prev: Option<f64> = None;

    closes
        .iter()
        .map(|&close| {
            let delta = prev.map(|p| close - p);
            prev = Some(close);

            let up = up_mean.update(delta.map(|d| d.max(0.0)));
            let down = down_mean.update(delta.map(|d| (-d).max(0.0)));
            match (up, down) {
                (Some(up), Some(down)) => {
                    let ratio = up / (down + params.epsilon);
                    Some(100.0 - 100.0 / (1.0 + ratio))
                }
                _ => None,
            }
        })
        .collect()
}
