// =============================================================================
// Flow Engine: reporting facade over the analytics pipeline
// =============================================================================
//
// Point query:  key -> fetch -> normalize -> Flow + RSX -> classify -> report
// Batch query:  the point query for every requested instrument, run
//               concurrently; failures are recorded and skipped, and the
//               successes feed the cross-instrument sentiment summary.
//
// The engine owns its configuration by value and keeps no mutable state, so
// one instance can serve any number of concurrent queries.
// =============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, InstrumentFailure};
use crate::indicators::{calculate_flow, calculate_rsx, FlowComponents};
use crate::market_data::{normalize, BarSource, RawFrame};
use crate::runtime_config::RuntimeConfig;
use crate::sentiment::{summarize, DistributionRow, SentimentSummary};
use crate::types::{BucketCounts, SentimentBucket};

// =============================================================================
// Report types
// =============================================================================

/// One bar with its derived oscillator values and the Flow inputs behind them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
    pub volume_z: Option<f64>,
    pub price_acc: f64,
    pub signal: Option<f64>,
    pub flow: Option<f64>,
    pub rsx: Option<f64>,
}

/// Result of a point query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentReport {
    pub instrument: String,
    pub symbol: String,
    pub last_flow: f64,
    pub last_rsx: f64,
    pub last_date: NaiveDate,
    /// Bucket of `last_flow`.
    pub sentiment: SentimentBucket,
    /// Day counts per bucket over the whole defined Flow series.
    pub bucket_counts: BucketCounts,
    /// Full aligned series, for chart renderers.
    pub series: Vec<IndicatorPoint>,
}

impl InstrumentReport {
    pub fn flow_values(&self) -> Vec<Option<f64>> {
        self.series.iter().map(|p| p.flow).collect()
    }
}

/// Result of a batch query. Always produced, whatever failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniverseReport {
    pub reports: BTreeMap<String, InstrumentReport>,
    pub failures: Vec<InstrumentFailure>,
    pub sentiment: SentimentSummary,
    /// Instrument keys labelling the `counts` columns of `distribution`.
    pub distribution_columns: Vec<String>,
    pub distribution: Vec<DistributionRow>,
}

// =============================================================================
// FlowEngine
// =============================================================================

#[derive(Clone)]
pub struct FlowEngine {
    config: RuntimeConfig,
    source: Arc<dyn BarSource>,
}

impl FlowEngine {
    pub fn new(config: RuntimeConfig, source: Arc<dyn BarSource>) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Run the pure part of the pipeline on an already fetched frame.
    pub fn analyze(
        &self,
        key: &str,
        symbol: &str,
        frame: &RawFrame,
    ) -> Result<InstrumentReport, EngineError> {
        let bars = normalize(frame, symbol, self.config.min_bars)
            .map_err(|e| e.with_instrument(key))?;

        let closes = bars.closes();
        let volumes = bars.volumes();
        let FlowComponents {
            volume_z,
            price_acc,
            signal,
            flow,
        } = calculate_flow(&closes, &volumes, &self.config.flow);
        let rsx = calculate_rsx(&closes, &self.config.rsx);

        let summary = summarize(flow.iter().copied())
            .ok_or_else(|| EngineError::insufficient(key, "no defined flow values"))?;
        let last_rsx = rsx
            .last()
            .copied()
            .flatten()
            .ok_or_else(|| EngineError::insufficient(key, "no defined RSX value"))?;
        let last_date = bars
            .last_date()
            .ok_or_else(|| EngineError::insufficient(key, "empty series"))?;

        let series = bars
            .bars()
            .iter()
            .enumerate()
            .map(|(i, bar)| IndicatorPoint {
                date: bar.date,
                close: bar.close,
                volume: bar.volume,
                volume_z: volume_z[i],
                price_acc: price_acc[i],
                signal: signal[i],
                flow: flow[i],
                rsx: rsx[i],
            })
            .collect();

        debug!(
            instrument = key,
            bars = bars.len(),
            classified = summary.counts.total(),
            last_flow = summary.last,
            last_rsx,
            "instrument analysed"
        );

        Ok(InstrumentReport {
            instrument: key.to_string(),
            symbol: symbol.to_string(),
            last_flow: summary.last,
            last_rsx,
            last_date,
            sentiment: summary.current,
            bucket_counts: summary.counts,
            series,
        })
    }

    /// Point query for one instrument key.
    pub async fn instrument_report(&self, key: &str) -> Result<InstrumentReport, EngineError> {
        let key = key.trim().to_lowercase();
        let symbol = self
            .config
            .symbol_for(&key)
            .ok_or_else(|| EngineError::UnknownInstrument {
                instrument: key.clone(),
            })?;

        let frame = match self
            .source
            .fetch_daily_bars(symbol, self.config.lookback_days)
            .await
        {
            Ok(frame) => frame,
            Err(e) => {
                warn!(instrument = %key, symbol, error = %e, "daily bar fetch failed");
                return Err(EngineError::insufficient(&key, format!("fetch failed: {e}")));
            }
        };

        self.analyze(&key, symbol, &frame).inspect_err(log_failure)
    }

    /// Batch query over `keys`, or over every configured instrument.
    ///
    /// Each instrument runs independently; a failure is recorded in
    /// `failures` and never affects another instrument's result.
    pub async fn universe_report(&self, keys: Option<&[String]>) -> UniverseReport {
        let keys: Vec<String> = match keys {
            Some(keys) => keys.iter().map(|k| k.trim().to_lowercase()).collect(),
            None => self.config.instruments.keys().cloned().collect(),
        };

        let results = join_all(keys.iter().map(|k| self.instrument_report(k))).await;

        let mut reports = BTreeMap::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(report) => {
                    reports.insert(report.instrument.clone(), report);
                }
                Err(e) => failures.push(e.to_failure()),
            }
        }

        let flows: Vec<(&str, Vec<Option<f64>>)> = reports
            .iter()
            .map(|(k, r)| (k.as_str(), r.flow_values()))
            .collect();
        let sentiment =
            SentimentSummary::from_series(flows.iter().map(|(k, f)| (*k, f.as_slice())));
        let distribution = sentiment.grid();
        let distribution_columns = sentiment
            .instrument_keys()
            .into_iter()
            .map(str::to_string)
            .collect();

        info!(
            requested = keys.len(),
            succeeded = reports.len(),
            failed = failures.len(),
            "universe report built"
        );

        UniverseReport {
            reports,
            failures,
            sentiment,
            distribution_columns,
            distribution,
        }
    }
}

/// Malformed frames point at an upstream contract change and are logged
/// louder than plain data gaps.
fn log_failure(err: &EngineError) {
    match err {
        EngineError::MalformedShape { instrument, detail } => {
            error!(instrument = %instrument, detail = %detail, code = err.code(), "malformed frame from data source");
        }
        _ => {
            warn!(instrument = %err.instrument(), code = err.code(), error = %err, "instrument skipped");
        }
    }
}
