// =============================================================================
// Text Reports: chat-style summaries of engine results
// =============================================================================

use crate::engine::{InstrumentReport, UniverseReport};
use crate::runtime_config::RuntimeConfig;
use crate::types::SentimentBucket;

/// Short per-instrument message:
///
/// ```text
/// GC:
/// Smart Money Flow: 61.2%
/// RSX(9): 55.0
/// Date: 17.06.2024
/// ```
pub fn instrument_message(report: &InstrumentReport, rsx_period: usize) -> String {
    format!(
        "{}:\nSmart Money Flow: {}\nRSX({}): {}\nDate: {}",
        report.instrument.to_uppercase(),
        fmt_value(report.last_flow, "%"),
        rsx_period,
        fmt_value(report.last_rsx, ""),
        report.last_date.format("%d.%m.%Y"),
    )
}

/// Current sentiment per instrument followed by the bucket day counts.
pub fn distribution_message(batch: &UniverseReport, lookback_days: u32) -> String {
    let mut out = format!("Smart Money Flow Distribution ({lookback_days} days)\n");

    if batch.sentiment.instruments.is_empty() {
        out.push_str("No instrument had enough data.");
        return out;
    }

    for (key, s) in &batch.sentiment.instruments {
        out.push_str(&format!(
            "\n{}: {:.1}% {}",
            key.to_uppercase(),
            s.last,
            s.current
        ));
        let counts: Vec<String> = s
            .counts
            .iter()
            .filter(|(_, n)| *n > 0)
            .map(|(b, n)| format!("{b} {n} d."))
            .collect();
        if !counts.is_empty() {
            out.push_str(&format!(" ({})", counts.join(", ")));
        }
    }

    if !batch.failures.is_empty() {
        let skipped: Vec<String> = batch
            .failures
            .iter()
            .map(|f| f.instrument.to_uppercase())
            .collect();
        out.push_str(&format!("\n\nSkipped: {}", skipped.join(", ")));
    }
    out
}

/// Command overview listing the configured instruments and the bucket ranges.
pub fn help_text(config: &RuntimeConfig) -> String {
    let keys: Vec<String> = config
        .instruments
        .keys()
        .map(|k| format!("/{k}"))
        .collect();
    let mut out = format!(
        "Smart Money Flow commands:\n{}: flow and RSX per instrument\n/dist: distribution\n/all: every instrument + distribution\n\nBuckets:",
        keys.join(" ")
    );
    for bucket in SentimentBucket::ALL {
        let open = if bucket == SentimentBucket::StrongBears { '[' } else { '(' };
        out.push_str(&format!(
            "\n{bucket}: {open}{}, {}]",
            bucket.lower_bound(),
            bucket.upper_bound()
        ));
    }
    out
}

fn fmt_value(value: f64, suffix: &str) -> String {
    if value.is_finite() {
        format!("{value:.1}{suffix}")
    } else {
        "n/a".to_string()
    }
}
