//! Error types for ferropar

use crate::datatype::DatatypeTag;
use thiserror::Error;

/// Result type for ferropar operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for group configuration, engine validation and message passing.
///
/// Configuration errors are detected before any data is exchanged and depend
/// only on values every rank agrees on, so every rank reports the same one.
/// Everything else is a protocol error and is fatal for the whole group.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Group size must be at least one
    #[error("Invalid group size: {0}")]
    InvalidGroupSize(i32),

    /// Scan input must contain at least one element
    #[error("Input is empty")]
    EmptyInput,

    /// Scan input length must be a power of two
    #[error("Input length {0} is not a power of two")]
    NotPowerOfTwo(usize),

    /// Input length must split into equal shards
    #[error("Input length {len} is not divisible by group size {group_size}")]
    NotDivisible {
        /// Logical array length
        len: usize,
        /// Number of ranks in the group
        group_size: i32,
    },

    /// Scan needs at least one element per rank
    #[error("Input length {len} is smaller than group size {group_size}")]
    FewerElementsThanRanks {
        /// Logical array length
        len: usize,
        /// Number of ranks in the group
        group_size: i32,
    },

    /// Histogram needs at least one bin
    #[error("Invalid bin count: {0}")]
    InvalidBinCount(usize),

    /// Histogram upper bound lies below the lower bound
    #[error("Invalid value range: [{min}, {max}]")]
    InvalidRange {
        /// Inclusive lower bound
        min: i64,
        /// Inclusive upper bound
        max: i64,
    },

    /// Histogram range holds fewer values than there are bins
    #[error("Value range of {range} is smaller than bin count {num_bins}")]
    RangeSmallerThanBins {
        /// Number of values in `[min, max]`
        range: i128,
        /// Requested number of bins
        num_bins: usize,
    },

    /// Malformed configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid rank specified
    #[error("Invalid rank: {0}")]
    InvalidRank(i32),

    /// User tags must be non-negative
    #[error("Invalid tag: {0}")]
    InvalidTag(i32),

    /// Buffer sizes do not fit the operation
    #[error("Invalid buffer")]
    InvalidBuffer,

    /// Incoming message does not fit the receive buffer
    #[error("Message of {count} elements truncated to buffer of {capacity}")]
    Truncated {
        /// Elements in the message
        count: usize,
        /// Elements in the receive buffer
        capacity: usize,
    },

    /// Incoming message carries a different element type
    #[error("Datatype mismatch: expected {expected:?}, got {actual:?}")]
    DatatypeMismatch {
        /// Type requested by the receiver
        expected: DatatypeTag,
        /// Type sent by the peer
        actual: DatatypeTag,
    },

    /// Peer exited before the exchange completed
    #[error("Peer rank {0} disconnected")]
    PeerDisconnected(i32),

    /// No matching message arrived in time
    #[error("Timed out waiting for tag {tag} from rank {peer}")]
    Timeout {
        /// Rank the message was expected from
        peer: i32,
        /// Tag the message was expected with
        tag: i32,
    },

    /// A rank panicked while running
    #[error("Rank {0} panicked")]
    RankPanicked(i32),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error is a configuration error, detected before any data is exchanged.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidGroupSize(_)
                | Error::EmptyInput
                | Error::NotPowerOfTwo(_)
                | Error::NotDivisible { .. }
                | Error::FewerElementsThanRanks { .. }
                | Error::InvalidBinCount(_)
                | Error::InvalidRange { .. }
                | Error::RangeSmallerThanBins { .. }
                | Error::InvalidConfig(_)
        )
    }
}
