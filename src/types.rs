// =============================================================================
// Shared types used across the Smart Money Flow engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// Five ordered sentiment classes partitioning the Flow domain [0, 100].
///
/// Ranges are right-inclusive, except the lowest class which also includes 0:
/// `StrongBulls (70,100]`, `Bulls (55,70]`, `Neutral (45,55]`,
/// `Bears (30,45]`, `StrongBears [0,30]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentBucket {
    StrongBulls,
    Bulls,
    Neutral,
    Bears,
    StrongBears,
}

impl SentimentBucket {
    /// All buckets, highest first. Index positions match [`BucketCounts`].
    pub const ALL: [SentimentBucket; 5] = [
        Self::StrongBulls,
        Self::Bulls,
        Self::Neutral,
        Self::Bears,
        Self::StrongBears,
    ];

    /// Exclusive lower bound of the bucket (the lowest bucket is closed at 0).
    pub fn lower_bound(self) -> f64 {
        match self {
            Self::StrongBulls => 70.0,
            Self::Bulls => 55.0,
            Self::Neutral => 45.0,
            Self::Bears => 30.0,
            Self::StrongBears => 0.0,
        }
    }

    /// Inclusive upper bound of the bucket.
    pub fn upper_bound(self) -> f64 {
        match self {
            Self::StrongBulls => 100.0,
            Self::Bulls => 70.0,
            Self::Neutral => 55.0,
            Self::Bears => 45.0,
            Self::StrongBears => 30.0,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::StrongBulls => 0,
            Self::Bulls => 1,
            Self::Neutral => 2,
            Self::Bears => 3,
            Self::StrongBears => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::StrongBulls => "Strong Bulls",
            Self::Bulls => "Bulls",
            Self::Neutral => "Neutral",
            Self::Bears => "Bears",
            Self::StrongBears => "Strong Bears",
        }
    }
}

impl std::fmt::Display for SentimentBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Number of trading days per sentiment bucket, ordered as
/// [`SentimentBucket::ALL`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCounts(pub [usize; 5]);

impl BucketCounts {
    pub fn increment(&mut self, bucket: SentimentBucket) {
        self.0[bucket.index()] += 1;
    }

    pub fn get(&self, bucket: SentimentBucket) -> usize {
        self.0[bucket.index()]
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// `(bucket, count)` pairs, highest bucket first.
    pub fn iter(&self) -> impl Iterator<Item = (SentimentBucket, usize)> + '_ {
        SentimentBucket::ALL.iter().map(move |b| (*b, self.get(*b)))
    }
}
