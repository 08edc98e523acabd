// Greedy weighted maximum coverage over committee bit lists

use crate::bitlist::Bitlist;
use crate::error::AggregationError;
use crate::types::{Aggregation, CoverOptions};
use std::collections::HashSet;
use tracing::{debug, trace};

/// One bit list under consideration, plus the bookkeeping the greedy loop
/// keeps for it.
///
/// # Fields
///
/// * `key` - Position of the bit list in the caller's input; unique per problem
/// * `bits` - The bit list itself, borrowed from the caller
/// * `score` - Marginal coverage computed in the most recent round
/// * `processed` - Set once the candidate is selected or can no longer be selected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxCoverCandidate<'a> {
    pub key: usize,
    pub bits: &'a Bitlist,
    pub score: usize,
    pub processed: bool,
}

impl<'a> MaxCoverCandidate<'a> {
    pub const fn new(key: usize, bits: &'a Bitlist) -> Self {
        Self {
            key,
            bits,
            score: 0,
            processed: false,
        }
    }
}

/// Candidates of one problem, in input order.
///
/// Entries are never removed or reordered; the greedy loop filters on
/// `processed` instead.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MaxCoverCandidates<'a>(Vec<MaxCoverCandidate<'a>>);

impl<'a> MaxCoverCandidates<'a> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MaxCoverCandidate<'a>> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[MaxCoverCandidate<'a>] {
        &self.0
    }

    /// Number of candidates not yet processed.
    pub fn remaining(&self) -> usize {
        self.0.iter().filter(|c| !c.processed).count()
    }

    /// OR of every candidate's bits, processed or not. Candidates whose
    /// length differs from the first one's are skipped.
    pub fn union(&self) -> Bitlist {
        let mut iter = self.0.iter();
        let Some(first) = iter.next() else {
            return Bitlist::default();
        };
        let len = first.bits.len();
        let mut union = first.bits.clone();
        for candidate in iter.filter(|c| c.bits.len() == len) {
            union.union_with(candidate.bits);
        }
        union
    }

    /// Marks processed every unprocessed candidate whose bits equal those of
    /// an earlier unprocessed candidate. Returns how many were marked.
    pub fn dedup(&mut self) -> usize {
        let mut seen: HashSet<&Bitlist> = HashSet::new();
        let mut removed = 0;
        for candidate in self.0.iter_mut().filter(|c| !c.processed) {
            if !seen.insert(candidate.bits) {
                candidate.processed = true;
                removed += 1;
            }
        }
        removed
    }
}

impl<'a> MaxCoverCandidates<'a> {
    /// Wraps candidates already checked by [`MaxCoverProblem::new`].
    pub(crate) fn from_checked(candidates: Vec<MaxCoverCandidate<'a>>) -> Self {
        Self(candidates)
    }
}

impl<'a, 'b> IntoIterator for &'b MaxCoverCandidates<'a> {
    type Item = &'b MaxCoverCandidate<'a>;
    type IntoIter = std::slice::Iter<'b, MaxCoverCandidate<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A single aggregation round: candidates of uniform bit length and unique
/// keys, consumed by one call to [`MaxCoverProblem::cover`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxCoverProblem<'a> {
    pub candidates: MaxCoverCandidates<'a>,
}

impl<'a> MaxCoverProblem<'a> {
    /// Creates a problem from at least one candidate, all of the same length
    /// and each with its own key.
    ///
    /// # Errors
    ///
    /// * `InvalidAttestationCount` - `candidates` is empty
    /// * `LengthMismatch` - some candidate's length differs from the first one's
    /// * `DuplicateKey` - two candidates share a key
    pub fn new(candidates: Vec<MaxCoverCandidate<'a>>) -> Result<Self, AggregationError> {
        let Some(first) = candidates.first() else {
            return Err(AggregationError::InvalidAttestationCount);
        };
        let expected = first.bits.len();
        let mut keys = HashSet::with_capacity(candidates.len());
        for (index, candidate) in candidates.iter().enumerate() {
            if candidate.bits.len() != expected {
                return Err(AggregationError::LengthMismatch {
                    index,
                    expected,
                    found: candidate.bits.len(),
                });
            }
            if !keys.insert(candidate.key) {
                return Err(AggregationError::DuplicateKey { key: candidate.key });
            }
        }
        Ok(Self {
            candidates: MaxCoverCandidates::from_checked(candidates),
        })
    }

    /// Bit length shared by every candidate.
    pub fn bit_len(&self) -> usize {
        self.candidates.0.first().map_or(0, |c| c.bits.len())
    }

    /// Greedily selects candidates approximating maximum coverage.
    ///
    /// Each round rescores the unprocessed candidates and picks the highest
    /// score, the smallest key winning ties. In disjoint mode the score is
    /// the full popcount and every candidate overlapping a winner is retired
    /// on the spot; with overlaps allowed the score is the number of bits
    /// not yet covered. The loop stops at `options.limit` selections or when
    /// the best score is zero.
    ///
    /// # Performance
    ///
    /// O(N) per round and at most N rounds, O(N²) overall.
    ///
    /// The problem is consumed; clone it first to cover the same candidates
    /// again from a fresh state.
    ///
    /// # Examples
    ///
    /// ```
    /// use attestation_maxcover::{Bitlist, CoverOptions, MaxCoverCandidate, MaxCoverProblem};
    ///
    /// let bits = [
    ///     Bitlist::from_bytes(&[0b0000_1010, 0b1]).unwrap(),
    ///     Bitlist::from_bytes(&[0b1111_1010, 0b1]).unwrap(),
    ///     Bitlist::from_bytes(&[0b0000_0001, 0b1]).unwrap(),
    /// ];
    /// let candidates = bits
    ///     .iter()
    ///     .enumerate()
    ///     .map(|(key, bits)| MaxCoverCandidate::new(key, bits))
    ///     .collect();
    ///
    /// let problem = MaxCoverProblem::new(candidates).unwrap();
    /// let aggregation = problem.cover(CoverOptions::default());
    /// assert_eq!(aggregation.keys, vec![1, 2]);
    /// assert_eq!(aggregation.covered(), 7);
    /// ```
    pub fn cover(mut self, options: CoverOptions) -> Aggregation {
        self.run(options)
    }

    fn run(&mut self, options: CoverOptions) -> Aggregation {
        let mut coverage = Bitlist::with_len(self.bit_len());
        let mut keys = Vec::new();
        let limit = options.limit.unwrap_or(usize::MAX);

        while keys.len() < limit {
            let candidates = &mut self.candidates.0;

            for candidate in candidates.iter_mut().filter(|c| !c.processed) {
                candidate.score = if options.allow_overlaps {
                    candidate.bits.count_and_not(&coverage)
                } else {
                    candidate.bits.count()
                };
            }

            let Some(winner) = candidates
                .iter()
                .enumerate()
                .filter(|(_, c)| !c.processed)
                .max_by(|(_, a), (_, b)| a.score.cmp(&b.score).then(b.key.cmp(&a.key)))
                .map(|(pos, _)| pos)
            else {
                break;
            };
            if candidates[winner].score == 0 {
                break;
            }

            let selected = &mut candidates[winner];
            selected.processed = true;
            let bits = selected.bits;
            trace!(key = selected.key, score = selected.score, "selected candidate");
            keys.push(selected.key);
            coverage.union_with(bits);

            if !options.allow_overlaps {
                for candidate in candidates
                    .iter_mut()
                    .filter(|c| !c.processed && c.bits.overlaps(bits))
                {
                    candidate.processed = true;
                }
            }
        }

        debug!(
            candidates = self.candidates.len(),
            selected = keys.len(),
            covered = coverage.count(),
            allow_overlaps = options.allow_overlaps,
            "max cover complete"
        );

        Aggregation { keys, coverage }
    }
}

/// Runs a cover over plain bit lists, keyed by slice position.
pub fn max_cover(
    bitlists: &[Bitlist],
    options: CoverOptions,
) -> Result<Aggregation, AggregationError> {
    let candidates = bitlists
        .iter()
        .enumerate()
        .map(|(key, bits)| MaxCoverCandidate::new(key, bits))
        .collect();
    let problem = MaxCoverProblem::new(candidates)?;
    Ok(problem.cover(options))
}
