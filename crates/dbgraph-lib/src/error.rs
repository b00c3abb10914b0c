//! Error taxonomy surfaced by graph construction

use crate::encoding::EncodingError;
use crate::transport::TransportError;
use thiserror::Error;

/// Errors reported to callers of the graph construction API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A window contained a byte outside the alphabet.
    ///
    /// The read extractor recovers from this locally by skipping the window,
    /// so it only reaches callers that encode k-mers directly.
    #[error(transparent)]
    InvalidSymbol(#[from] EncodingError),

    /// The build could not complete on every worker. Partial shards are not
    /// usable, so this is reported once for the whole run.
    #[error("Graph construction failed: {0}")]
    ConstructionFailed(String),

    /// Parameters rejected before any input was read
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<TransportError> for GraphError {
    fn from(err: TransportError) -> Self {
        GraphError::ConstructionFailed(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T, E = GraphError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_is_construction_failure() {
        let err: GraphError = TransportError::PeerDisconnected { rank: 3 }.into();
        assert!(matches!(err, GraphError::ConstructionFailed(_)));
        assert!(err.to_string().contains("worker 3"));
    }

    #[test]
    fn test_encoding_error_is_invalid_symbol() {
        let err: GraphError = EncodingError::InvalidSymbol { symbol: 'N', position: 4 }.into();
        assert!(matches!(err, GraphError::InvalidSymbol(_)));
        assert_eq!(err.to_string(), "Invalid symbol 'N' at position 4");
    }
}
