// =============================================================================
// Raw Frames & the Series Normalizer
// =============================================================================
//
// A `RawFrame` is whatever the vendor handed back: a date index plus named
// columns, where a column name may have several levels (vendors like to embed
// the symbol, e.g. `("Close", "GC=F")`). `normalize` turns it into a
// `BarSeries`:
//
//   1. Collapse multi-level headers to single-level field names. This runs
//      first and unconditionally; a silently mis-shaped frame would corrupt
//      every statistic downstream.
//   2. Check every column is as long as the index.
//   3. Drop rows without Close or Volume. No forward-fill, no interpolation.
//   4. Sort ascending by date and reject duplicate dates.
//   5. Reject series shorter than the minimum window.
// =============================================================================

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

const CLOSE: &str = "Close";
const VOLUME: &str = "Volume";

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// Hierarchical column name, outermost level first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnKey(pub Vec<String>);

impl ColumnKey {
    #[cfg(test)]
    pub fn single(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    pub fn multi<I, S>(levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(levels.into_iter().map(Into::into).collect())
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

/// Untrusted daily table as returned by a data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    pub index: Vec<NaiveDate>,
    pub columns: Vec<(ColumnKey, Vec<Option<f64>>)>,
}

impl RawFrame {
    pub fn new(index: Vec<NaiveDate>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// Builder-style column append.
    pub fn with_column(mut self, key: ColumnKey, values: Vec<Option<f64>>) -> Self {
        self.columns.push((key, values));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty() || self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }
}

// ---------------------------------------------------------------------------
// Normalized output
// ---------------------------------------------------------------------------

/// One trading day. Only `close` and `volume` feed the indicators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: f64,
}

/// Bars for one instrument, strictly ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// Validate and canonicalize `frame` into a `BarSeries` of at least
/// `min_bars` entries. `label` names the instrument in any error.
pub fn normalize(frame: &RawFrame, label: &str, min_bars: usize) -> Result<BarSeries, EngineError> {
    if frame.is_empty() {
        return Err(EngineError::insufficient(label, "source returned no data"));
    }

    let columns = collapse_columns(frame, label)?;

    for (name, values) in &columns {
        if values.len() != frame.index.len() {
            return Err(EngineError::malformed(
                label,
                format!(
                    "column '{name}' has {} values for {} dates",
                    values.len(),
                    frame.index.len()
                ),
            ));
        }
    }

    let close = columns
        .get(CLOSE)
        .ok_or_else(|| EngineError::malformed(label, "missing 'Close' column"))?;
    let volume = columns
        .get(VOLUME)
        .ok_or_else(|| EngineError::malformed(label, "missing 'Volume' column"))?;
    let field = |name: &str, i: usize| -> Option<f64> {
        columns
            .get(name)
            .and_then(|v| v[i])
            .filter(|x| x.is_finite())
    };

    let mut bars: Vec<Bar> = frame
        .index
        .iter()
        .enumerate()
        .filter_map(|(i, &date)| {
            let close = close[i].filter(|x| x.is_finite())?;
            let volume = volume[i].filter(|x| x.is_finite())?;
            Some(Bar {
                date,
                open: field("Open", i),
                high: field("High", i),
                low: field("Low", i),
                close,
                volume,
            })
        })
        .collect();

    bars.sort_by_key(|b| b.date);
    if let Some(pair) = bars.windows(2).find(|w| w[0].date == w[1].date) {
        return Err(EngineError::malformed(
            label,
            format!("duplicate date {}", pair[0].date),
        ));
    }

    if bars.len() < min_bars {
        return Err(EngineError::insufficient(
            label,
            format!("{} usable bars, need {min_bars}", bars.len()),
        ));
    }

    Ok(BarSeries { bars })
}

/// Collapse hierarchical headers to single-level field names.
///
/// The level kept is the one that names both `Close` and `Volume`; any other
/// levels (usually the ticker) are dropped.
fn collapse_columns<'a>(
    frame: &'a RawFrame,
    label: &str,
) -> Result<HashMap<String, &'a Vec<Option<f64>>>, EngineError> {
    let depth = frame.columns[0].0.depth();
    if depth == 0 {
        return Err(EngineError::malformed(label, "column with no name"));
    }
    if frame.columns.iter().any(|(k, _)| k.depth() != depth) {
        return Err(EngineError::malformed(label, "ragged column levels"));
    }

    let level = (0..depth)
        .find(|&lvl| {
            let has = |name: &str| frame.columns.iter().any(|(k, _)| k.0[lvl] == name);
            has(CLOSE) && has(VOLUME)
        })
        .ok_or_else(|| {
            EngineError::malformed(label, "no column level carries both 'Close' and 'Volume'")
        })?;

    let mut collapsed = HashMap::with_capacity(frame.columns.len());
    for (key, values) in &frame.columns {
        let name = key.0[level].clone();
        if collapsed.insert(name.clone(), values).is_some() {
            return Err(EngineError::malformed(
                label,
                format!("duplicate column '{name}' after collapsing levels"),
            ));
        }
    }
    Ok(collapsed)
}
