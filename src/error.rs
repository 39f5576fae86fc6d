//! Error types for queue operations

use thiserror::Error;

/// Validation failures raised by [`QueueEngine`](crate::engine::QueueEngine) commands.
///
/// Every variant is produced before any mutation happens, so a failed
/// command leaves the queue, cursor and playback state exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Index outside the valid range, or not part of the required permutation
    #[error("Invalid position: {0}")]
    InvalidPosition(usize),

    /// Reorder list length does not match the queue length
    #[error("Invalid length: expected {expected} positions, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// A non-empty input was required
    #[error("Empty sequence")]
    EmptySequence,
}

/// Result type for queue operations
pub type Result<T> = std::result::Result<T, QueueError>;
