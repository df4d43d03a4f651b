// In-memory `BarSource` for tests: canned frames per symbol, everything else
// fails like an unreachable vendor would.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

use super::{BarSource, ColumnKey, RawFrame};

#[derive(Default)]
pub struct InMemoryBarSource {
    frames: HashMap<String, RawFrame>,
}

impl InMemoryBarSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame(mut self, symbol: &str, frame: RawFrame) -> Self {
        self.frames.insert(symbol.to_string(), frame);
        self
    }

    /// Vendor-shaped frame (`(field, symbol)` headers) from closes and volumes.
    pub fn vendor_frame(symbol: &str, closes: &[f64], volumes: &[f64]) -> RawFrame {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let index = (0..closes.len())
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect();
        RawFrame::new(index)
            .with_column(
                ColumnKey::multi(["Close", symbol]),
                closes.iter().map(|c| Some(*c)).collect(),
            )
            .with_column(
                ColumnKey::multi(["Volume", symbol]),
                volumes.iter().map(|v| Some(*v)).collect(),
            )
    }
}

#[async_trait]
impl BarSource for InMemoryBarSource {
    async fn fetch_daily_bars(&self, symbol: &str, _lookback_days: u32) -> Result<RawFrame> {
        self.frames
            .get(symbol)
            .cloned()
            .ok_or_else(|| anyhow!("connection refused for {symbol}"))
    }
}
