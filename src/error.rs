// Error handling for attestation validation and max-cover aggregation

use thiserror::Error;

/// Aggregation error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    // Construction errors
    /// Max-cover problem requested over no attestations at all
    #[error("Invalid attestation count: at least one attestation required")]
    InvalidAttestationCount,

    // Validation errors
    /// Attestation list is empty
    #[error("Empty list: nothing to validate")]
    EmptyInput,
    /// Attestation carries no aggregation bits, or a zero-length bit list
    #[error("Bitlist cannot be nil or empty (attestation {index})")]
    MissingBitset { index: usize },
    /// Attestation bit list length differs from the first attestation's
    #[error("Bitlists of different length: attestation {index} has {found} bits, expected {expected}")]
    LengthMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    /// Two max-cover candidates carry the same key
    #[error("Duplicate candidate key {key}")]
    DuplicateKey { key: usize },

    // Bit list errors
    /// Serialized bit list has no length sentinel
    #[error("Malformed bitlist: {reason}")]
    MalformedBitlist { reason: String },
    /// Bit index past the end of the list
    #[error("Bit index {index} out of range for bitlist of length {len}")]
    BitIndexOutOfRange { index: usize, len: usize },

    // Collaborator errors
    /// Signature combiner rejected the selected signatures
    #[error("Signature aggregation failed: {message}")]
    SignatureAggregation { message: String },
}

impl AggregationError {
    /// Whether the error means the batch itself is unusable this round,
    /// as opposed to a failure inside a collaborator.
    pub const fn is_poisoned_batch(&self) -> bool {
        matches!(
            self,
            Self::InvalidAttestationCount
                | Self::EmptyInput
                | Self::MissingBitset { .. }
                | Self::LengthMismatch { .. }
                | Self::DuplicateKey { .. }
                | Self::MalformedBitlist { .. }
        )
    }
}
