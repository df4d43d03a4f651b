// =============================================================================
// Sentiment Classifier: Flow value buckets and their distribution
// =============================================================================
//
// Per value:        first bucket (highest first) whose range contains v.
// Per instrument:   bucket counts over the whole defined Flow series, plus
//                   the latest value reported separately.
// Cross-instrument: the same, keyed by instrument. Instruments without a
//                   series are simply absent.
// =============================================================================

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{BucketCounts, SentimentBucket};

/// Classify a Flow value. `None` for non-finite input.
///
/// Boundaries are right-inclusive: 70 is Bulls, 55 Neutral, 45 Bears,
/// 30 Strong Bears. 0 (and anything below) is Strong Bears, anything above
/// 100 is Strong Bulls.
pub fn classify(value: f64) -> Option<SentimentBucket> {
    if !value.is_finite() {
        return None;
    }
    let bucket = SentimentBucket::ALL
        .into_iter()
        .find(|b| value > b.lower_bound())
        .unwrap_or(SentimentBucket::StrongBears);
    Some(bucket)
}

/// Sentiment of one instrument over its observed window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentSentiment {
    /// Most recent Flow value.
    pub last: f64,
    /// Bucket of the most recent value.
    pub current: SentimentBucket,
    /// Day counts per bucket across the whole series.
    pub counts: BucketCounts,
}

/// Aggregate a series of Flow values. Undefined (warm-up) and non-finite
/// entries are not counted. `None` when nothing is classifiable.
pub fn summarize<I>(flow: I) -> Option<InstrumentSentiment>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut counts = BucketCounts::default();
    let mut last = None;
    for value in flow.into_iter().flatten() {
        if let Some(bucket) = classify(value) {
            counts.increment(bucket);
            last = Some((value, bucket));
        }
    }
    last.map(|(last, current)| InstrumentSentiment {
        last,
        current,
        counts,
    })
}

/// Sentiment of a set of instruments, keyed by instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SentimentSummary {
    pub instruments: BTreeMap<String, InstrumentSentiment>,
}

/// One row of the distribution grid: a bucket and its day count per
/// instrument, in the summary's instrument order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionRow {
    pub bucket: SentimentBucket,
    pub counts: Vec<usize>,
}

impl SentimentSummary {
    /// Build from instrument -> Flow series. Instruments whose series has no
    /// classifiable value are left out; they never affect the others.
    pub fn from_series<'a, I>(series: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [Option<f64>])>,
    {
        let instruments = series
            .into_iter()
            .filter_map(|(key, flow)| {
                summarize(flow.iter().copied()).map(|s| (key.to_string(), s))
            })
            .collect();
        Self { instruments }
    }

    pub fn instrument_keys(&self) -> Vec<&str> {
        self.instruments.keys().map(String::as_str).collect()
    }

    /// Bucket x instrument count grid for the distribution view.
    pub fn grid(&self) -> Vec<DistributionRow> {
        SentimentBucket::ALL
            .into_iter()
            .map(|bucket| DistributionRow {
                bucket,
                counts: self
                    .instruments
                    .values()
                    .map(|s| s.counts.get(bucket))
                    .collect(),
            })
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SentimentBucket::*;

    // ---- classify --------------------------------------------------------

    #[test]
    fn boundaries_follow_right_inclusive_rule() {
        assert_eq!(classify(100.0), Some(StrongBulls));
        assert_eq!(classify(70.000001), Some(StrongBulls));
        assert_eq!(classify(70.0), Some(Bulls));
        assert_eq!(classify(55.0), Some(Neutral));
        assert_eq!(classify(45.0), Some(Bears));
        assert_eq!(classify(30.0), Some(StrongBears));
        assert_eq!(classify(0.0), Some(StrongBears));
    }

    #[test]
    fn interior_values() {
        assert_eq!(classify(85.0), Some(StrongBulls));
        assert_eq!(classify(60.0), Some(Bulls));
        assert_eq!(classify(50.0), Some(Neutral));
        assert_eq!(classify(31.0), Some(Bears));
        assert_eq!(classify(12.5), Some(StrongBears));
    }

    #[test]
    fn out_of_domain_and_non_finite() {
        assert_eq!(classify(100.01), Some(StrongBulls));
        assert_eq!(classify(-0.01), Some(StrongBears));
        assert_eq!(classify(f64::NAN), None);
        assert_eq!(classify(f64::INFINITY), None);
    }

    #[test]
    fn classification_is_total_and_exclusive() {
        // Sweep [0, 100] in steps of 0.05 and check against the range table.
        for i in 0..=2000 {
            let v = i as f64 * 0.05;
            let matching: Vec<_> = SentimentBucket::ALL
                .into_iter()
                .filter(|b| {
                    let above = if *b == StrongBears {
                        v >= b.lower_bound()
                    } else {
                        v > b.lower_bound()
                    };
                    above && v <= b.upper_bound()
                })
                .collect();
            assert_eq!(matching.len(), 1, "v = {v} matched {matching:?}");
            assert_eq!(classify(v), Some(matching[0]));
        }
    }

    // ---- summarize -------------------------------------------------------

    #[test]
    fn counts_sum_to_classified_length_and_last_is_reported() {
        let flow = vec![None, None, Some(80.0), Some(60.0), Some(50.0), Some(40.0), Some(10.0), Some(72.0)];
        let s = summarize(flow.iter().copied()).unwrap();
        assert_eq!(s.counts.0, [2, 1, 1, 1, 1]);
        assert_eq!(s.counts.total(), 6);
        assert_eq!(s.last, 72.0);
        assert_eq!(s.current, StrongBulls);
    }

    #[test]
    fn all_undefined_has_no_summary() {
        assert!(summarize(vec![None::<f64>, None]).is_none());
        assert!(summarize(Vec::<Option<f64>>::new()).is_none());
    }

    // ---- cross-instrument ------------------------------------------------

    #[test]
    fn summary_skips_empty_series_without_affecting_others() {
        let gc = vec![None, Some(75.0), Some(76.0)];
        let cl: Vec<Option<f64>> = vec![None, None];
        let dx = vec![Some(20.0)];
        let summary = SentimentSummary::from_series([
            ("gc", gc.as_slice()),
            ("cl", cl.as_slice()),
            ("dx", dx.as_slice()),
        ]);
        assert_eq!(summary.instrument_keys(), vec!["dx", "gc"]);
        assert_eq!(summary.instruments["gc"].counts.get(StrongBulls), 2);
        assert_eq!(summary.instruments["dx"].current, StrongBears);
    }

    #[test]
    fn grid_is_bucket_by_instrument() {
        let a = vec![Some(80.0), Some(80.0), Some(50.0)];
        let b = vec![Some(10.0)];
        let summary = SentimentSummary::from_series([("a", a.as_slice()), ("b", b.as_slice())]);
        let grid = summary.grid();
        assert_eq!(grid.len(), 5);
        assert_eq!(grid[0].bucket, StrongBulls);
        assert_eq!(grid[0].counts, vec![2, 0]);
        assert_eq!(grid[2].counts, vec![1, 0]);
        assert_eq!(grid[4].counts, vec![0, 1]);
        let column_totals: Vec<usize> = (0..2).map(|i| grid.iter().map(|r| r.counts[i]).sum()).collect();
        assert_eq!(column_totals, vec![3, 1]);
    }
}
