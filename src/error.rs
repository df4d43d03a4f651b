// =============================================================================
// Engine Errors: per-instrument failure taxonomy
// =============================================================================
//
// Every failure carries the instrument key it belongs to and a stable reason
// code. Failures never cross the batch boundary: the facade records them next
// to the successful instruments instead of propagating them.
// =============================================================================

use serde::Serialize;
use thiserror::Error;

/// Failure of a single instrument's pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The source returned nothing, the fetch failed, or too few usable bars
    /// remained after normalization.
    #[error("{instrument}: insufficient data ({detail})")]
    InsufficientData { instrument: String, detail: String },

    /// The source returned a frame whose columns cannot be collapsed to the
    /// expected single-level shape.
    #[error("{instrument}: malformed frame ({detail})")]
    MalformedShape { instrument: String, detail: String },

    /// The key is not present in the configured instrument table.
    #[error("unknown instrument '{instrument}'")]
    UnknownInstrument { instrument: String },
}

impl EngineError {
    pub fn insufficient(instrument: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InsufficientData {
            instrument: instrument.into(),
            detail: detail.into(),
        }
    }

    pub fn malformed(instrument: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedShape {
            instrument: instrument.into(),
            detail: detail.into(),
        }
    }

    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "insufficient_data",
            Self::MalformedShape { .. } => "malformed_shape",
            Self::UnknownInstrument { .. } => "unknown_instrument",
        }
    }

    pub fn instrument(&self) -> &str {
        match self {
            Self::InsufficientData { instrument, .. }
            | Self::MalformedShape { instrument, .. }
            | Self::UnknownInstrument { instrument } => instrument,
        }
    }

    /// Re-tag the failure with the caller's instrument key. The normalizer
    /// only knows the vendor symbol; the facade reports by key.
    pub fn with_instrument(self, key: &str) -> Self {
        let instrument = key.to_string();
        match self {
            Self::InsufficientData { detail, .. } => Self::InsufficientData { instrument, detail },
            Self::MalformedShape { detail, .. } => Self::MalformedShape { instrument, detail },
            Self::UnknownInstrument { .. } => Self::UnknownInstrument { instrument },
        }
    }

    pub fn to_failure(&self) -> InstrumentFailure {
        InstrumentFailure {
            instrument: self.instrument().to_string(),
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Serializable failure record surfaced by batch queries and the HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentFailure {
    pub instrument: String,
    pub code: &'static str,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(EngineError::insufficient("gc", "x").code(), "insufficient_data");
        assert_eq!(EngineError::malformed("gc", "x").code(), "malformed_shape");
        let unknown = EngineError::UnknownInstrument {
            instrument: "zz".into(),
        };
        assert_eq!(unknown.code(), "unknown_instrument");
    }

    #[test]
    fn retag_keeps_variant_and_detail() {
        let err = EngineError::malformed("GC=F", "duplicate column 'Close'").with_instrument("gc");
        assert_eq!(err.instrument(), "gc");
        assert_eq!(err.code(), "malformed_shape");
        assert!(err.to_string().contains("duplicate column"));
    }

    #[test]
    fn failure_record_carries_key_and_code() {
        let failure = EngineError::insufficient("cl", "12 bars, need 20").to_failure();
        assert_eq!(failure.instrument, "cl");
        assert_eq!(failure.code, "insufficient_data");
        assert_eq!(failure.message, "cl: insufficient data (12 bars, need 20)");
    }
}
