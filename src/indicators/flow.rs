// =============================================================================
// Smart Money Flow Oscillator
// =============================================================================
//
// Volume anomaly, confirmed by price acceleration, squashed into 0-100:
//
//   vol_z     = (volume - mean_20) / (std_20 + eps)
//   price_acc = diff(pct_change(close)), leading undefined values -> 0
//   signal    = 0.8 * vol_z + 0.2 * price_acc
//   flow_raw  = clamp(clip(signal, -3, 3) * 16.67 + 50, 0, 100)
//   flow      = ewm(flow_raw, span = 3)
//
// The clamp after rescaling matters: 3 * 16.67 = 50.01, so an unclamped
// saturated day would sit at -0.01 or 100.01. With the inputs held to
// [0, 100] the smoothing (a convex combination) cannot leave that range.
//
// The first `window - 1` bars have no volume baseline and carry no value.
// =============================================================================

use serde::Serialize;

use super::ewm::ExponentialMean;
use super::rolling::RollingWindow;
use crate::runtime_config::FlowParams;

/// Lower / upper bound of the oscillator.
pub const FLOW_MIN: f64 = 0.0;
pub const FLOW_MAX: f64 = 100.0;
/// Value of a zero composite signal.
pub const FLOW_NEUTRAL: f64 = 50.0;

/// Every intermediate series of the computation, aligned with the input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowComponents {
    pub volume_z: Vec<Option<f64>>,
    pub price_acc: Vec<f64>,
    pub signal: Vec<Option<f64>>,
    pub flow: Vec<Option<f64>>,
}

/// Volume z-score against the trailing `window`-bar baseline.
pub fn volume_zscore(volumes: &[f64], window: usize, epsilon: f64) -> Vec<Option<f64>> {
    let mut baseline = RollingWindow::new(window);
    volumes
        .iter()
        .map(|&v| {
            baseline
                .push(v)
                .map(|s| (v - s.mean) / (s.std_dev + epsilon))
        })
        .collect()
}

/// Day-over-day change of the day-over-day percentage return.
///
/// The first two positions have no second difference and are 0. A zero
/// previous close contributes a zero return.
pub fn price_acceleration(closes: &[f64]) -> Vec<f64> {
    let mut prev_close: Option<f64> = None;
    let mut prev_return: Option<f64> = None;

    closes
        .iter()
        .map(|&close| {
            // A return off a zero close is infinite and would pin the signal
            // at the clip. Treat the zero as a bad print that moves nothing.
            let ret = prev_close.map(|p| if p == 0.0 { 0.0 } else { close / p - 1.0 });
            let acc = match (ret, prev_return) {
                (Some(r), Some(pr)) => r - pr,
                _ => 0.0,
            };
            prev_close = Some(close);
            prev_return = ret;
            acc
        })
        .collect()
}

/// Compute the Flow oscillator and its components from closes and volumes.
///
/// `closes` and `volumes` must be the same length (one entry per bar).
pub fn calculate_flow(closes: &[f64], volumes: &[f64], params: &FlowParams) -> FlowComponents {
    debug_assert_eq!(closes.len(), volumes.len());

    let volume_z = volume_zscore(volumes, params.window, params.epsilon);
    let price_acc = price_acceleration(closes);

    let signal: Vec<Option<f64>> = volume_z
        .iter()
        .zip(&price_acc)
        .map(|(z, acc)| z.map(|z| params.volume_weight * z + params.price_weight * acc))
        .collect();

    let mut smoother = ExponentialMean::with_span(params.smoothing_span);
    let flow = signal
        .iter()
        .map(|s| {
            let raw = s.map(|s| rescale(s, params));
            smoother.update(raw)
        })
        .collect();

    FlowComponents {
        volume_z,
        price_acc,
        signal,
        flow,
    }
}

/// Clip the composite signal and map it onto the oscillator range.
fn rescale(signal: f64, params: &FlowParams) -> f64 {
    let clipped = signal.clamp(-params.clip, params.clip);
    (clipped * params.scale + FLOW_NEUTRAL).clamp(FLOW_MIN, FLOW_MAX)
}
