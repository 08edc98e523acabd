// Attestation data model, cover options and aggregation results

use crate::bitlist::Bitlist;
use serde::{Deserialize, Serialize};

/// The vote content shared by every member of a committee.
///
/// Attestations are only ever aggregated with others carrying identical
/// `AttestationData`; grouping by data is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AttestationData {
    /// Slot the vote was cast for
    pub slot: u64,
    /// Committee within the slot
    pub committee_index: u64,
    /// Head block root the committee voted for
    pub beacon_block_root: [u8; 32],
}

/// A possibly aggregated committee vote.
///
/// # Fields
///
/// * `aggregation_bits` - One bit per committee member; a set bit means that
///   member's signature is part of `signature`. `None` models a vote that
///   arrived without a bit list and is rejected by validation.
/// * `data` - The vote content
/// * `signature` - Aggregate signature bytes, opaque to this crate
///
/// # Examples
///
/// ```
/// use attestation_maxcover::{Attestation, AttestationData, Bitlist};
///
/// let att = Attestation {
///     aggregation_bits: Some(Bitlist::from_bytes(&[0b0000_1010, 0b1]).unwrap()),
///     data: AttestationData::default(),
///     signature: vec![0u8; 96],
/// };
/// assert_eq!(att.aggregation_bits.as_ref().map(Bitlist::count), Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attestation {
    pub aggregation_bits: Option<Bitlist>,
    pub data: AttestationData,
    pub signature: Vec<u8>,
}

impl Attestation {
    /// Creates an attestation with the given bits and default data.
    pub fn with_bits(bits: Bitlist) -> Self {
        Self {
            aggregation_bits: Some(bits),
            ..Self::default()
        }
    }
}

/// Parameters of one greedy cover run.
///
/// The default is an unbounded run in disjoint mode, which is the mode whose
/// output may be handed to a signature combiner.
///
/// ```
/// use attestation_maxcover::CoverOptions;
///
/// let options = CoverOptions::default().with_limit(4);
/// assert_eq!(options.limit, Some(4));
/// assert!(!options.allow_overlaps);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverOptions {
    /// Maximum number of candidates to select (`None` = no bound)
    pub limit: Option<usize>,
    /// Allow selected candidates to share set bits
    pub allow_overlaps: bool,
}

impl CoverOptions {
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn with_overlaps(mut self, allow_overlaps: bool) -> Self {
        self.allow_overlaps = allow_overlaps;
        self
    }
}

/// Outcome of a cover run.
///
/// # Fields
///
/// * `keys` - Indices into the original input, in selection order
/// * `coverage` - OR of the bits of every selected candidate
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Aggregation {
    pub keys: Vec<usize>,
    pub coverage: Bitlist,
}

impl Aggregation {
    /// Number of validators covered by the selection.
    pub fn covered(&self) -> usize {
        self.coverage.count()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
