// =============================================================================
// Yahoo Finance Chart Client: daily futures bars
// =============================================================================
//
// GET /v8/finance/chart/{symbol}?period1=..&period2=..&interval=1d
//
// The response is columnar: one timestamp array plus parallel open / high /
// low / close / volume arrays that may contain nulls. The client keeps it that
// way and emits a vendor-shaped `RawFrame` with `(field, symbol)` headers; the
// normalizer owns all validation.
// =============================================================================

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{BarSource, ColumnKey, RawFrame};
use crate::runtime_config::DataSourceConfig;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    /// Exchange offset from UTC in seconds; bar timestamps are exchange-local
    /// session opens, so the offset is needed to land on the right date.
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Daily bar source backed by the public Yahoo Finance chart endpoint.
#[derive(Clone)]
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
}

impl YahooClient {
    pub fn new(config: &DataSourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to build reqwest client for YahooClient")?;

        debug!(base_url = %config.base_url, "YahooClient initialised");

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl BarSource for YahooClient {
    #[instrument(skip(self), name = "yahoo::fetch_daily_bars")]
    async fn fetch_daily_bars(&self, symbol: &str, lookback_days: u32) -> Result<RawFrame> {
        let period2 = Utc::now().timestamp();
        let period1 = period2 - i64::from(lookback_days) * 86_400;
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("includePrePost", "false".to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("GET chart for {symbol}"))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .with_context(|| format!("failed to read chart response for {symbol}"))?;

        if !status.is_success() && !body.trim_start().starts_with('{') {
            bail!("chart API returned {status} for {symbol}");
        }

        let frame = frame_from_chart(symbol, &body)?;
        debug!(symbol, rows = frame.len(), "daily bars fetched");
        Ok(frame)
    }
}

/// Decode a chart response body into a vendor-shaped frame.
fn frame_from_chart(symbol: &str, body: &str) -> Result<RawFrame> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .with_context(|| format!("failed to parse chart response for {symbol}"))?;

    if let Some(err) = envelope.chart.error {
        bail!("chart API error for {symbol}: {} ({})", err.description, err.code);
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(RawFrame::default());
    };

    let mut index = result
        .timestamp
        .iter()
        .map(|&ts| to_session_date(ts, result.meta.gmtoffset))
        .collect::<Result<Vec<NaiveDate>>>()?;

    let mut quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    if merge_live_row(&mut index, &mut quote) {
        debug!(symbol, "merged live bar into the last session");
    }
    let fields = [
        ("Open", quote.open),
        ("High", quote.high),
        ("Low", quote.low),
        ("Close", quote.close),
        ("Volume", quote.volume),
    ];

    let mut frame = RawFrame::new(index);
    for (name, values) in fields {
        if !values.is_empty() {
            frame = frame.with_column(ColumnKey::multi([name, symbol]), values);
        }
    }
    Ok(frame)
}

/// During a session the endpoint can append the in-progress bar as its own
/// row stamped on the same date as the last completed one. Fold it into that
/// session: first open, widest range, latest close, summed volume.
///
/// Returns `true` when a row was merged. Misaligned columns are left alone for
/// the normalizer to reject.
fn merge_live_row(index: &mut Vec<NaiveDate>, quote: &mut Quote) -> bool {
    let n = index.len();
    if n < 2 || index[n - 1] != index[n - 2] {
        return false;
    }
    let columns = [
        &quote.open,
        &quote.high,
        &quote.low,
        &quote.close,
        &quote.volume,
    ];
    if columns.iter().any(|c| !c.is_empty() && c.len() != n) {
        return false;
    }

    fn fold(
        column: &mut Vec<Option<f64>>,
        combine: impl Fn(f64, f64) -> f64,
    ) {
        if let (Some(live), Some(session)) = (column.pop(), column.last_mut()) {
            *session = match (*session, live) {
                (Some(a), Some(b)) => Some(combine(a, b)),
                (a, b) => a.or(b),
            };
        }
    }

    fold(&mut quote.open, |session, _| session);
    fold(&mut quote.high, f64::max);
    fold(&mut quote.low, f64::min);
    fold(&mut quote.close, |_, live| live);
    fold(&mut quote.volume, |session, live| session + live);
    index.pop();
    true
}

fn to_session_date(ts: i64, gmtoffset: i64) -> Result<NaiveDate> {
    DateTime::from_timestamp(ts + gmtoffset, 0)
        .map(|dt| dt.date_naive())
        .with_context(|| format!("invalid bar timestamp {ts}"))
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::normalize;

    const SAMPLE: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "symbol": "GC=F", "gmtoffset": -14400 },
                "timestamp": [1718596800, 1718683200, 1718769600],
                "indicators": {
                    "quote": [{
                        "open":   [2330.1, 2320.0, null],
                        "high":   [2340.0, 2331.5, null],
                        "low":    [2310.2, 2311.0, null],
                        "close":  [2318.5, 2329.9, null],
                        "volume": [176000, 160500, null]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn decodes_vendor_shaped_frame() {
        let frame = frame_from_chart("GC=F", SAMPLE).unwrap();
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.columns.len(), 5);
        assert!(frame
            .columns
            .iter()
            .all(|(k, _)| k.depth() == 2 && k.0[1] == "GC=F"));
        // 1718596800 = 2024-06-17 04:00 UTC = 00:00 New York.
        assert_eq!(frame.index[0], NaiveDate::from_ymd_opt(2024, 6, 17).unwrap());
    }

    #[test]
    fn null_rows_survive_decoding_and_are_dropped_by_normalizer() {
        let frame = frame_from_chart("GC=F", SAMPLE).unwrap();
        let (_, closes) = frame
            .columns
            .iter()
            .find(|(k, _)| k.0[0] == "Close")
            .unwrap();
        assert_eq!(closes[2], None);

        let series = normalize(&frame, "GC=F", 2).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[1].volume, 160_500.0);
    }

    /// `n` completed sessions at New York midnight, plus optionally a live
    /// bar ten hours into the last session.
    fn chart_body(n: usize, with_live: bool) -> String {
        let first = 1_718_596_800i64;
        let mut ts: Vec<i64> = (0..n as i64).map(|i| first + i * 86_400).collect();
        let mut close: Vec<f64> = (0..n).map(|i| 2300.0 + i as f64).collect();
        let mut volume: Vec<f64> = vec![1.0e5; n];
        let mut high: Vec<f64> = close.iter().map(|c| c + 5.0).collect();
        let mut low: Vec<f64> = close.iter().map(|c| c - 5.0).collect();
        let mut open = close.clone();
        if with_live {
            ts.push(ts[n - 1] + 10 * 3_600);
            open.push(2400.0);
            high.push(2500.0);
            low.push(2000.0);
            close.push(2450.0);
            volume.push(2.5e4);
        }
        serde_json::json!({
            "chart": {
                "result": [{
                    "meta": { "gmtoffset": -14400 },
                    "timestamp": ts,
                    "indicators": { "quote": [{
                        "open": open, "high": high, "low": low,
                        "close": close, "volume": volume
                    }]}
                }],
                "error": null
            }
        })
        .to_string()
    }

    #[test]
    fn live_bar_on_last_session_date_is_merged() {
        let frame = frame_from_chart("GC=F", &chart_body(25, true)).unwrap();
        assert_eq!(frame.len(), 25);

        let series = normalize(&frame, "GC=F", 20).unwrap();
        assert_eq!(series.len(), 25);
        let last = series.bars()[24];
        assert_eq!(last.date, frame.index[23] + chrono::Duration::days(1));
        assert_eq!(last.open, Some(2324.0));
        assert_eq!(last.high, Some(2500.0));
        assert_eq!(last.low, Some(2000.0));
        assert_eq!(last.close, 2450.0);
        assert_eq!(last.volume, 1.25e5);
        // Earlier sessions are untouched.
        assert_eq!(series.bars()[23].close, 2323.0);
    }

    #[test]
    fn frame_without_live_bar_is_unchanged() {
        let frame = frame_from_chart("GC=F", &chart_body(25, false)).unwrap();
        assert_eq!(frame.len(), 25);
        assert_eq!(normalize(&frame, "GC=F", 20).unwrap().bars()[24].close, 2324.0);
    }

    #[test]
    fn live_bar_with_missing_fields_keeps_session_values() {
        let mut index = vec![
            NaiveDate::from_ymd_opt(2024, 7, 10).unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 11).unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 11).unwrap(),
        ];
        let mut quote = Quote {
            open: vec![Some(1.0), Some(2.0), None],
            high: vec![Some(1.5), Some(2.5), Some(3.0)],
            low: vec![Some(0.5), None, Some(1.8)],
            close: vec![Some(1.2), Some(2.2), None],
            volume: vec![Some(10.0), Some(20.0), None],
        };
        assert!(merge_live_row(&mut index, &mut quote));
        assert_eq!(index.len(), 2);
        assert_eq!(quote.open, vec![Some(1.0), Some(2.0)]);
        assert_eq!(quote.high, vec![Some(1.5), Some(3.0)]);
        assert_eq!(quote.low, vec![Some(0.5), Some(1.8)]);
        assert_eq!(quote.close, vec![Some(1.2), Some(2.2)]);
        assert_eq!(quote.volume, vec![Some(10.0), Some(20.0)]);
    }

    #[test]
    fn interior_duplicate_dates_are_left_for_the_normalizer() {
        let d = NaiveDate::from_ymd_opt(2024, 7, 10).unwrap();
        let mut index = vec![d, d, d + chrono::Duration::days(1)];
        let mut quote = Quote {
            close: vec![Some(1.0); 3],
            volume: vec![Some(1.0); 3],
            ..Quote::default()
        };
        assert!(!merge_live_row(&mut index, &mut quote));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn api_error_is_reported() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = frame_from_chart("XX=F", body).unwrap_err();
        assert!(err.to_string().contains("No data found"));
    }

    #[test]
    fn empty_result_yields_empty_frame() {
        let body = r#"{"chart":{"result":[],"error":null}}"#;
        let frame = frame_from_chart("GC=F", body).unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn garbage_body_is_an_error() {
        assert!(frame_from_chart("GC=F", "<html>rate limited</html>").is_err());
    }
}
