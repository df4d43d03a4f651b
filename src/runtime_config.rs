// =============================================================================
// Runtime Configuration: instrument table and indicator parameters
// =============================================================================
//
// Loaded once at startup and handed to the engine by value; nothing mutates it
// afterwards. All fields carry `#[serde(default)]` so that a partial (or empty)
// JSON file still loads, with the missing parts taken from the defaults.
//
// =============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_instruments() -> BTreeMap<String, String> {
    [
        ("gc", "GC=F"),
        ("cl", "CL=F"),
        ("pl", "PL=F"),
        ("6e", "6E=F"),
        ("6j", "6J=F"),
        ("dx", "DX=F"),
    ]
    .into_iter()
    .map(|(k, s)| (k.to_string(), s.to_string()))
    .collect()
}

fn default_lookback_days() -> u32 {
    175
}

fn default_min_bars() -> usize {
    20
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_window() -> usize {
    20
}

fn default_epsilon() -> f64 {
    1e-8
}

fn default_volume_weight() -> f64 {
    0.8
}

fn default_price_weight() -> f64 {
    0.2
}

fn default_clip() -> f64 {
    3.0
}

fn default_scale() -> f64 {
    16.67
}

fn default_smoothing_span() -> f64 {
    3.0
}

fn default_rsx_period() -> usize {
    9
}

fn default_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; smart-money-flow/1.0)".to_string()
}

// =============================================================================
// FlowParams
// =============================================================================

/// Parameters of the Smart Money Flow oscillator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowParams {
    /// Trailing window for the volume mean / standard deviation.
    #[serde(default = "default_window")]
    pub window: usize,

    /// Added to the rolling standard deviation before dividing.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    /// Weight of the volume z-score in the composite signal.
    #[serde(default = "default_volume_weight")]
    pub volume_weight: f64,

    /// Weight of the price acceleration term in the composite signal.
    #[serde(default = "default_price_weight")]
    pub price_weight: f64,

    /// Composite signal is clipped to `[-clip, clip]`.
    #[serde(default = "default_clip")]
    pub clip: f64,

    /// Linear rescale factor: `flow = clipped * scale + 50`.
    #[serde(default = "default_scale")]
    pub scale: f64,

    /// Span of the final exponential smoothing (alpha = 2 / (span + 1)).
    #[serde(default = "default_smoothing_span")]
    pub smoothing_span: f64,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            window: default_window(),
            epsilon: default_epsilon(),
            volume_weight: default_volume_weight(),
            price_weight: default_price_weight(),
            clip: default_clip(),
            scale: default_scale(),
            smoothing_span: default_smoothing_span(),
        }
    }
}

// =============================================================================
// RsxParams
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsxParams {
    /// Smoothing period; alpha = 1 / period.
    #[serde(default = "default_rsx_period")]
    pub period: usize,

    /// Added to the smoothed down-move before dividing.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

impl Default for RsxParams {
    fn default() -> Self {
        Self {
            period: default_rsx_period(),
            epsilon: default_epsilon(),
        }
    }
}

// =============================================================================
// DataSourceConfig
// =============================================================================

/// Connection settings for the daily bar vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration for the engine and its HTTP surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Instrument key (e.g. `gc`) -> data-source symbol (e.g. `GC=F`).
    #[serde(default = "default_instruments")]
    pub instruments: BTreeMap<String, String>,

    /// Calendar days of history requested per query.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Minimum number of usable bars before any statistic is computed.
    #[serde(default = "default_min_bars")]
    pub min_bars: usize,

    #[serde(default)]
    pub flow: FlowParams,

    #[serde(default)]
    pub rsx: RsxParams,

    #[serde(default)]
    pub data_source: DataSourceConfig,

    /// Address the HTTP API binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            instruments: default_instruments(),
            lookback_days: default_lookback_days(),
            min_bars: default_min_bars(),
            flow: FlowParams::default(),
            rsx: RsxParams::default(),
            data_source: DataSourceConfig::default(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error so the caller can fall back to defaults
    /// with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            instruments = ?config.instruments.keys().collect::<Vec<_>>(),
            lookback_days = config.lookback_days,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Apply overrides from an environment lookup function.
    ///
    /// Recognised keys: `SMF_BIND_ADDR` (or `PORT`), `SMF_LOOKBACK_DAYS`,
    /// `SMF_INSTRUMENTS` as `key=SYMBOL,key=SYMBOL`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("SMF_BIND_ADDR") {
            self.bind_addr = addr;
        } else if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("invalid PORT '{port}'"))?;
            self.bind_addr = format!("0.0.0.0:{port}");
        }

        if let Some(days) = lookup("SMF_LOOKBACK_DAYS") {
            self.lookback_days = days
                .trim()
                .parse()
                .with_context(|| format!("invalid SMF_LOOKBACK_DAYS '{days}'"))?;
        }

        if let Some(list) = lookup("SMF_INSTRUMENTS") {
            let mut instruments = BTreeMap::new();
            for pair in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let (key, symbol) = pair
                    .split_once('=')
                    .with_context(|| format!("instrument entry '{pair}' is not key=SYMBOL"))?;
                instruments.insert(key.trim().to_lowercase(), symbol.trim().to_string());
            }
            self.instruments = instruments;
        }

        Ok(())
    }

    /// Reject parameter combinations the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.instruments.is_empty() {
            bail!("instrument table is empty");
        }
        if let Some((key, _)) = self.instruments.iter().find(|(_, s)| s.trim().is_empty()) {
            bail!("instrument '{key}' has an empty symbol");
        }
        if self.flow.window < 2 {
            bail!("flow.window must be >= 2 (got {})", self.flow.window);
        }
        if self.min_bars < self.flow.window {
            bail!(
                "min_bars ({}) must be >= flow.window ({})",
                self.min_bars,
                self.flow.window
            );
        }
        if !(self.flow.clip > 0.0) {
            bail!("flow.clip must be positive (got {})", self.flow.clip);
        }
        // alpha = 2 / (span + 1) leaves (0, 1] below a span of 1, and the
        // smoothed Flow would no longer stay inside the rescaled range.
        if !(self.flow.smoothing_span >= 1.0) {
            bail!(
                "flow.smoothing_span must be >= 1 (got {})",
                self.flow.smoothing_span
            );
        }
        if !(self.flow.epsilon >= 0.0) || !(self.rsx.epsilon >= 0.0) {
            bail!(
                "flow.epsilon and rsx.epsilon must be >= 0 (got {}, {})",
                self.flow.epsilon,
                self.rsx.epsilon
            );
        }
        if self.rsx.period == 0 {
            bail!("rsx.period must be >= 1");
        }
        if self.lookback_days == 0 {
            bail!("lookback_days must be >= 1");
        }
        Ok(())
    }

    /// Data-source symbol for an instrument key (case-insensitive).
    pub fn symbol_for(&self, key: &str) -> Option<&str> {
        self.instruments
            .get(&key.to_lowercase())
            .map(String::as_str)
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.instruments.len(), 6);
        assert_eq!(cfg.symbol_for("gc"), Some("GC=F"));
        assert_eq!(cfg.symbol_for("DX"), Some("DX=F"));
        assert_eq!(cfg.lookback_days, 175);
        assert_eq!(cfg.min_bars, 20);
        assert_eq!(cfg.flow.window, 20);
        assert!((cfg.flow.volume_weight - 0.8).abs() < f64::EPSILON);
        assert!((cfg.flow.price_weight - 0.2).abs() < f64::EPSILON);
        assert!((cfg.flow.scale - 16.67).abs() < f64::EPSILON);
        assert_eq!(cfg.rsx.period, 9);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, RuntimeConfig::default());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "instruments": { "si": "SI=F" }, "flow": { "smoothing_span": 5.0 } }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.instruments.len(), 1);
        assert_eq!(cfg.symbol_for("si"), Some("SI=F"));
        assert!((cfg.flow.smoothing_span - 5.0).abs() < f64::EPSILON);
        assert_eq!(cfg.flow.window, 20);
        assert_eq!(cfg.rsx.period, 9);
    }

    #[test]
    fn load_missing_file_errors() {
        assert!(RuntimeConfig::load("/nonexistent/smart_money_flow.json").is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = RuntimeConfig::default();
        cfg.apply_env(env(&[
            ("PORT", "9090"),
            ("SMF_LOOKBACK_DAYS", "180"),
            ("SMF_INSTRUMENTS", "GC=GC=F, si=SI=F"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:9090");
        assert_eq!(cfg.lookback_days, 180);
        assert_eq!(cfg.instruments.len(), 2);
        assert_eq!(cfg.symbol_for("gc"), Some("GC=F"));
    }

    #[test]
    fn bind_addr_wins_over_port() {
        let mut cfg = RuntimeConfig::default();
        cfg.apply_env(env(&[("SMF_BIND_ADDR", "127.0.0.1:1234"), ("PORT", "9090")]))
            .unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:1234");
    }

    #[test]
    fn bad_env_values_error() {
        let mut cfg = RuntimeConfig::default();
        assert!(cfg.apply_env(env(&[("PORT", "eighty")])).is_err());
        assert!(cfg.apply_env(env(&[("SMF_INSTRUMENTS", "gc")])).is_err());
    }

    #[test]
    fn validate_rejects_degenerate_params() {
        let mut cfg = RuntimeConfig::default();
        cfg.min_bars = 10;
        assert!(cfg.validate().is_err());

        let mut cfg = RuntimeConfig::default();
        cfg.instruments.clear();
        assert!(cfg.validate().is_err());

        let mut cfg = RuntimeConfig::default();
        cfg.rsx.period = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_spans_below_one_and_negative_epsilon() {
        for span in [0.2, 0.999, -3.0, f64::NAN] {
            let mut cfg = RuntimeConfig::default();
            cfg.flow.smoothing_span = span;
            let err = cfg.validate().unwrap_err();
            assert!(err.to_string().contains("smoothing_span"), "{err}");
        }

        let mut cfg = RuntimeConfig::default();
        cfg.flow.smoothing_span = 1.0;
        assert!(cfg.validate().is_ok());

        let mut cfg = RuntimeConfig::default();
        cfg.flow.epsilon = -1e-8;
        assert!(cfg.validate().is_err());

        let mut cfg = RuntimeConfig::default();
        cfg.rsx.epsilon = f64::NAN;
        assert!(cfg.validate().is_err());
    }
}
