// =============================================================================
// Market Data Module
// =============================================================================
//
// Daily bar ingestion: the `BarSource` seam the engine fetches through, the
// Yahoo Finance adapter behind it, and the normalizer that turns whatever the
// vendor returned into a validated `BarSeries`.

pub mod frame;
#[cfg(test)]
pub mod memory;
pub mod yahoo;

use anyhow::Result;
use async_trait::async_trait;

pub use frame::{normalize, ColumnKey, RawFrame};
pub use yahoo::YahooClient;

/// Provider of raw daily OHLCV tables.
///
/// One call per instrument per query. Implementations may fail for any
/// transport reason; the engine reports such failures as insufficient data.
#[async_trait]
pub trait BarSource: Send + Sync {
    async fn fetch_daily_bars(&self, symbol: &str, lookback_days: u32) -> Result<RawFrame>;
}
