//! Attestation Max-Cover Aggregation Library
//!
//! This library decides which committee attestations can be merged into a
//! single aggregate, so that a node propagates a few large aggregates instead
//! of many small, partially-overlapping ones.
//!
//! # Overview
//!
//! Each attestation carries a fixed-length [`Bitlist`], one bit per committee
//! member. Picking the fewest pairwise-disjoint bit lists that cover the most
//! members is a weighted maximum-coverage problem; this crate solves it with a
//! deterministic greedy approximation, so every node fed the same input picks
//! the same aggregates.
//!
//! - [`validate`] / [`new_max_cover`]: reject malformed batches up front
//! - [`MaxCoverProblem::cover`]: the greedy selection
//! - [`aggregate_attestations`]: repeated rounds of selection and merging,
//!   with signature combination delegated to a [`SignatureAggregator`]
//!
//! # Example
//!
//! ```
//! use attestation_maxcover::{select, Attestation, Bitlist, CoverOptions};
//!
//! let atts = vec![
//!     Attestation::with_bits(Bitlist::from_indices(8, &[0, 1]).unwrap()),
//!     Attestation::with_bits(Bitlist::from_indices(8, &[1, 2, 3]).unwrap()),
//!     Attestation::with_bits(Bitlist::from_indices(8, &[6]).unwrap()),
//! ];
//!
//! let aggregation = select(&atts, CoverOptions::default()).expect("valid batch");
//! assert_eq!(aggregation.keys, vec![1, 2]);
//! ```
//!
//! # Features
//!
//! - Deterministic selection (smallest key wins ties)
//! - Disjoint mode for signature merging, overlap mode for coverage estimates
//! - O(N²) worst case for N candidates
//! - Serialization support for attestations and results

pub mod aggregator;
pub mod bitlist;
pub mod error;
pub mod maxcover;
pub mod types;

// Re-export commonly used types and functions for convenience
pub use aggregator::{SignatureAggregator, aggregate_attestations, new_max_cover, select, validate};
pub use bitlist::Bitlist;
pub use error::AggregationError;
pub use maxcover::{MaxCoverCandidate, MaxCoverCandidates, MaxCoverProblem, max_cover};
pub use types::{Aggregation, Attestation, AttestationData, CoverOptions};
