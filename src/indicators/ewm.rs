// =============================================================================
// Exponentially Weighted Mean
// =============================================================================
//
// Bias-adjusted form: every past observation keeps a weight of
// (1 - alpha)^age and the output is the weighted average
//
//   y_t = sum_i (1 - alpha)^i * x_{t-i}  /  sum_i (1 - alpha)^i
//
// computed recursively with one running weight. Early outputs are therefore
// not dragged towards an arbitrary seed, and every output is a convex
// combination of the inputs seen so far: it can never leave their range.
//
// Missing inputs before the first observation produce no output. Missing
// inputs afterwards age the history (the weight still decays) and repeat the
// previous output.
// =============================================================================

/// Recursive exponentially weighted mean.
#[derive(Debug, Clone)]
pub struct ExponentialMean {
    decay: f64,
    weight: f64,
    value: Option<f64>,
}

impl ExponentialMean {
    /// Smoothing factor `alpha` in (0, 1].
    pub fn with_alpha(alpha: f64) -> Self {
        Self {
            decay: 1.0 - alpha,
            weight: 1.0,
            value: None,
        }
    }

    /// `alpha = 2 / (span + 1)`, so `span >= 1` keeps alpha in (0, 1].
    pub fn with_span(span: f64) -> Self {
        Self::with_alpha(2.0 / (span + 1.0))
    }

    /// Feed the next input and return the current mean.
    pub fn update(&mut self, input: Option<f64>) -> Option<f64> {
        match (self.value, input) {
            (None, Some(x)) => {
                self.value = Some(x);
                self.weight = 1.0;
            }
            (None, None) => {}
            (Some(mean), input) => {
                self.weight *= self.decay;
                if let Some(x) = input {
                    if mean != x {
                        self.value = Some((self.weight * mean + x) / (self.weight + 1.0));
                    }
                    self.weight += 1.0;
                }
            }
        }
        self.value
    }
}

/// Smooth a whole series with smoothing factor `alpha`.
#[cfg(test)]
pub fn ewm(values: &[Option<f64>], alpha: f64) -> Vec<Option<f64>> {
    let mut acc = ExponentialMean::with_alpha(alpha);
    values.iter().map(|&v| acc.update(v)).collect()
}
