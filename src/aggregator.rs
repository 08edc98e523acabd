// Attestation validation, max-cover construction and aggregation rounds

use crate::bitlist::Bitlist;
use crate::error::AggregationError;
use crate::maxcover::{MaxCoverCandidate, MaxCoverProblem};
use crate::types::{Aggregation, Attestation, CoverOptions};
use tracing::debug;

/// Combines the signatures of disjoint attestations into one.
///
/// This is the boundary to the signature scheme: the max-cover core only
/// decides which attestations may be merged and relies on the combiner for
/// the cryptography. Signatures are passed in selection order.
///
/// Closures with the matching signature implement the trait:
///
/// ```
/// use attestation_maxcover::{AggregationError, SignatureAggregator};
///
/// let concat = |sigs: &[&[u8]]| -> Result<Vec<u8>, AggregationError> { Ok(sigs.concat()) };
/// assert_eq!(concat.aggregate_signatures(&[b"ab", b"c"]).unwrap(), b"abc".to_vec());
/// ```
pub trait SignatureAggregator {
    fn aggregate_signatures(&self, signatures: &[&[u8]]) -> Result<Vec<u8>, AggregationError>;
}

impl<F> SignatureAggregator for F
where
    F: Fn(&[&[u8]]) -> Result<Vec<u8>, AggregationError>,
{
    fn aggregate_signatures(&self, signatures: &[&[u8]]) -> Result<Vec<u8>, AggregationError> {
        self(signatures)
    }
}

/// Validates that a list of attestations can be fed to the max-cover solver.
///
/// Checks run in one left-to-right pass and the first violation wins.
///
/// # Returns
///
/// * `Ok(())` - Every attestation carries a non-empty bit list of one common length
/// * `Err(AggregationError::EmptyInput)` - No attestations provided
/// * `Err(AggregationError::MissingBitset)` - An attestation has no bits, or zero-length bits
/// * `Err(AggregationError::LengthMismatch)` - Bit list length differs from the first one's
///
/// # Examples
///
/// ```
/// use attestation_maxcover::{validate, AggregationError, Attestation, Bitlist};
///
/// let atts = vec![
///     Attestation::with_bits(Bitlist::with_len(64)),
///     Attestation::with_bits(Bitlist::with_len(63)),
/// ];
///
/// match validate(&atts) {
///     Err(AggregationError::LengthMismatch { index, .. }) => assert_eq!(index, 1),
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
pub fn validate(atts: &[Attestation]) -> Result<(), AggregationError> {
    if atts.is_empty() {
        return Err(AggregationError::EmptyInput);
    }

    let mut expected = None;
    for (index, att) in atts.iter().enumerate() {
        let bits = match &att.aggregation_bits {
            Some(bits) if !bits.is_empty() => bits,
            _ => return Err(AggregationError::MissingBitset { index }),
        };
        match expected {
            None => expected = Some(bits.len()),
            Some(expected) if expected != bits.len() => {
                return Err(AggregationError::LengthMismatch {
                    index,
                    expected,
                    found: bits.len(),
                });
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// Builds a max-cover problem over the aggregation bits of `atts`.
///
/// Candidate keys are positions in `atts`. The problem borrows the bit
/// lists; `atts` is left untouched.
///
/// # Errors
///
/// * `InvalidAttestationCount` - `atts` is empty
/// * anything [`validate`] reports
pub fn new_max_cover(atts: &[Attestation]) -> Result<MaxCoverProblem<'_>, AggregationError> {
    if atts.is_empty() {
        return Err(AggregationError::InvalidAttestationCount);
    }
    validate(atts)?;

    let candidates = atts
        .iter()
        .enumerate()
        .filter_map(|(key, att)| {
            att.aggregation_bits
                .as_ref()
                .map(|bits| MaxCoverCandidate::new(key, bits))
        })
        .collect();
    MaxCoverProblem::new(candidates)
}

/// Selects attestations whose bits may be merged, without merging them.
///
/// # Examples
///
/// ```
/// use attestation_maxcover::{select, Attestation, Bitlist, CoverOptions};
///
/// let atts: Vec<Attestation> = [
///     [0b0000_1010u8, 0b1],
///     [0b0010_1010, 0b1],
///     [0b1111_1010, 0b1],
///     [0b0000_0010, 0b1],
///     [0b0000_0001, 0b1],
/// ]
/// .iter()
/// .map(|raw| Attestation::with_bits(Bitlist::from_bytes(raw).unwrap()))
/// .collect();
///
/// let aggregation = select(&atts, CoverOptions::default()).unwrap();
/// assert_eq!(aggregation.keys, vec![2, 4]);
/// ```
pub fn select(atts: &[Attestation], options: CoverOptions) -> Result<Aggregation, AggregationError> {
    let problem = new_max_cover(atts)?;
    Ok(problem.cover(options))
}

/// Aggregates attestations sharing the same data into as few as possible.
///
/// Each round runs a disjoint cover over the attestations not yet
/// aggregated and merges the selection into one attestation: its bits are
/// the selection's coverage, its signature the combiner's output and its data
/// that of the first selected attestation. Leftovers whose bits are already
/// contained in that coverage are dropped. Rounds continue while at least two
/// attestations remain.
///
/// # Returns
///
/// The merged attestations in the order they were produced, followed by any
/// attestations never selected, in input order. Fewer than two attestations
/// are returned as given.
///
/// # Errors
///
/// * anything [`validate`] reports, before any round runs
/// * whatever the combiner returns; no partial result is produced
pub fn aggregate_attestations<A>(
    atts: Vec<Attestation>,
    aggregator: &A,
) -> Result<Vec<Attestation>, AggregationError>
where
    A: SignatureAggregator + ?Sized,
{
    if atts.len() < 2 {
        return Ok(atts);
    }
    validate(&atts)?;

    let mut aggregated = Vec::new();
    let mut unaggregated = atts;
    let mut round = 0usize;

    while unaggregated.len() > 1 {
        let selection = select(&unaggregated, CoverOptions::default())?;
        if selection.is_empty() {
            break;
        }

        let merged = merge_selected(&unaggregated, &selection, aggregator)?;

        let mut selected = vec![false; unaggregated.len()];
        for &key in &selection.keys {
            selected[key] = true;
        }
        let before = unaggregated.len();
        unaggregated = unaggregated
            .into_iter()
            .zip(selected)
            .filter(|(att, chosen)| !chosen && !is_covered(att, &selection.coverage))
            .map(|(att, _)| att)
            .collect();

        debug!(
            round,
            selected = selection.keys.len(),
            covered = selection.covered(),
            dropped = before - selection.keys.len() - unaggregated.len(),
            remaining = unaggregated.len(),
            "aggregation round"
        );

        aggregated.push(merged);
        round += 1;
    }

    aggregated.extend(unaggregated);
    Ok(aggregated)
}

fn merge_selected<A>(
    atts: &[Attestation],
    selection: &Aggregation,
    aggregator: &A,
) -> Result<Attestation, AggregationError>
where
    A: SignatureAggregator + ?Sized,
{
    let first = &atts[selection.keys[0]];
    if selection.keys.len() == 1 {
        return Ok(first.clone());
    }

    let signatures: Vec<&[u8]> = selection
        .keys
        .iter()
        .map(|&key| atts[key].signature.as_slice())
        .collect();
    let signature = aggregator.aggregate_signatures(&signatures)?;

    Ok(Attestation {
        aggregation_bits: Some(selection.coverage.clone()),
        data: first.data.clone(),
        signature,
    })
}

fn is_covered(att: &Attestation, coverage: &Bitlist) -> bool {
    att.aggregation_bits
        .as_ref()
        .is_none_or(|bits| coverage.contains(bits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttestationData;

    fn att(raw: &[u8]) -> Attestation {
        Attestation::with_bits(Bitlist::from_bytes(raw).expect("valid bitlist"))
    }

    fn signed(raw: &[u8], signature: &[u8]) -> Attestation {
        Attestation {
            signature: signature.to_vec(),
            ..att(raw)
        }
    }

    fn five_votes() -> Vec<Attestation> {
        vec![
            att(&[0b0000_1010, 0b1]),
            att(&[0b0010_1010, 0b1]),
            att(&[0b1111_1010, 0b1]),
            att(&[0b0000_0010, 0b1]),
            att(&[0b0000_0001, 0b1]),
        ]
    }

    fn concat(signatures: &[&[u8]]) -> Result<Vec<u8>, AggregationError> {
        Ok(signatures.concat())
    }

    // Validation tests
    #[test]
    fn test_validate_empty_list() {
        assert_eq!(validate(&[]), Err(AggregationError::EmptyInput));
    }

    #[test]
    fn test_validate_first_bitlist_missing() {
        let atts = vec![Attestation::default()];
        assert_eq!(
            validate(&atts),
            Err(AggregationError::MissingBitset { index: 0 })
        );
    }

    #[test]
    fn test_validate_non_first_bitlist_missing() {
        let atts = vec![
            Attestation::with_bits(Bitlist::with_len(64)),
            Attestation::default(),
        ];
        assert_eq!(
            validate(&atts),
            Err(AggregationError::MissingBitset { index: 1 })
        );
    }

    #[test]
    fn test_validate_first_bitlist_empty() {
        let atts = vec![Attestation::with_bits(Bitlist::default())];
        assert_eq!(
            validate(&atts),
            Err(AggregationError::MissingBitset { index: 0 })
        );
    }

    #[test]
    fn test_validate_non_first_bitlist_empty() {
        let atts = vec![
            Attestation::with_bits(Bitlist::with_len(64)),
            Attestation::with_bits(Bitlist::default()),
        ];
        assert_eq!(
            validate(&atts),
            Err(AggregationError::MissingBitset { index: 1 })
        );
    }

    #[test]
    fn test_validate_bitlists_of_different_length() {
        let atts: Vec<_> = [64, 64, 63, 64]
            .into_iter()
            .map(|len| Attestation::with_bits(Bitlist::with_len(len)))
            .collect();
        assert_eq!(
            validate(&atts),
            Err(AggregationError::LengthMismatch {
                index: 2,
                expected: 64,
                found: 63
            })
        );
    }

    #[test]
    fn test_validate_first_error_wins() {
        let atts = vec![
            Attestation::with_bits(Bitlist::with_len(64)),
            Attestation::with_bits(Bitlist::with_len(32)),
            Attestation::default(),
        ];
        assert!(matches!(
            validate(&atts),
            Err(AggregationError::LengthMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn test_validate_valid_bitlists() {
        let atts: Vec<_> = (0..4)
            .map(|_| Attestation::with_bits(Bitlist::with_len(64)))
            .collect();
        assert!(validate(&atts).is_ok());
    }

    // Construction tests
    #[test]
    fn test_new_max_cover_no_attestations() {
        assert_eq!(
            new_max_cover(&[]).unwrap_err(),
            AggregationError::InvalidAttestationCount
        );
    }

    #[test]
    fn test_new_max_cover_different_lengths() {
        let atts = vec![
            Attestation::with_bits(Bitlist::with_len(64)),
            Attestation::with_bits(Bitlist::with_len(128)),
        ];
        assert!(matches!(
            new_max_cover(&atts),
            Err(AggregationError::LengthMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn test_new_max_cover_single_attestation() {
        let atts = vec![att(&[0b0000_1010, 0b1])];
        let problem = new_max_cover(&atts).unwrap();

        let bits = atts[0].aggregation_bits.as_ref().unwrap();
        assert_eq!(
            problem.candidates.as_slice(),
            &[MaxCoverCandidate::new(0, bits)]
        );
    }

    #[test]
    fn test_new_max_cover_multiple_attestations() {
        let atts = five_votes();
        let problem = new_max_cover(&atts).unwrap();

        assert_eq!(problem.candidates.len(), 5);
        for (key, candidate) in problem.candidates.iter().enumerate() {
            assert_eq!(candidate.key, key);
            assert_eq!(Some(candidate.bits), atts[key].aggregation_bits.as_ref());
            assert_eq!(candidate.score, 0);
            assert!(!candidate.processed);
        }
    }

    // Selection tests
    #[test]
    fn test_select_five_votes() {
        let atts = five_votes();
        let aggregation = select(&atts, CoverOptions::default()).unwrap();
        assert_eq!(aggregation.keys, vec![2, 4]);
        assert_eq!(aggregation.covered(), 7);
        assert_eq!(atts, five_votes());
    }

    #[test]
    fn test_select_identical_attestations() {
        let atts: Vec<_> = (0..4).map(|_| att(&[0b1001_0110, 0b1])).collect();
        let aggregation = select(&atts, CoverOptions::default()).unwrap();
        assert_eq!(aggregation.keys, vec![0]);
    }

    // Aggregation tests
    #[test]
    fn test_aggregate_fewer_than_two_unchanged() {
        let atts = vec![Attestation::default()];
        let result = aggregate_attestations(atts.clone(), &concat).unwrap();
        assert_eq!(result, atts);

        assert!(aggregate_attestations(Vec::new(), &concat).unwrap().is_empty());
    }

    #[test]
    fn test_aggregate_five_votes_into_one() {
        let mut atts = five_votes();
        for (i, att) in atts.iter_mut().enumerate() {
            att.signature = vec![i as u8];
        }

        let result = aggregate_attestations(atts, &concat).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(
            result[0].aggregation_bits,
            Some(Bitlist::from_bytes(&[0b1111_1011, 0b1]).unwrap())
        );
        assert_eq!(result[0].signature, vec![2, 4]);
    }

    #[test]
    fn test_aggregate_keeps_data_of_first_selected() {
        let data = AttestationData {
            slot: 9,
            committee_index: 1,
            beacon_block_root: [3u8; 32],
        };
        let atts: Vec<_> = [[0b0000_0011u8, 0b1], [0b0000_1100, 0b1]]
            .iter()
            .map(|raw| Attestation {
                data: data.clone(),
                ..att(raw)
            })
            .collect();

        let result = aggregate_attestations(atts, &concat).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].data, data);
    }

    #[test]
    fn test_aggregate_single_selection_passes_through() {
        // 0 and 1 overlap on bit 1, so neither round can merge anything
        let atts = vec![signed(&[0b0000_0011, 0b1], b"a"), signed(&[0b0000_0110, 0b1], b"b")];

        let result = aggregate_attestations(atts.clone(), &concat).unwrap();
        assert_eq!(result, atts);
    }

    #[test]
    fn test_aggregate_multiple_rounds() {
        let atts = vec![
            signed(&[0b0000_0011, 0b1], b"a"),
            signed(&[0b0000_0110, 0b1], b"b"),
            signed(&[0b0011_0000, 0b1], b"c"),
            signed(&[0b0110_0000, 0b1], b"d"),
        ];

        let result = aggregate_attestations(atts, &concat).unwrap();

        // round one merges a and c, round two merges b and d
        assert_eq!(result.len(), 2);
        assert_eq!(
            result[0].aggregation_bits,
            Some(Bitlist::from_bytes(&[0b0011_0011, 0b1]).unwrap())
        );
        assert_eq!(result[0].signature, b"ac".to_vec());
        assert_eq!(
            result[1].aggregation_bits,
            Some(Bitlist::from_bytes(&[0b0110_0110, 0b1]).unwrap())
        );
        assert_eq!(result[1].signature, b"bd".to_vec());
    }

    #[test]
    fn test_aggregate_drops_zero_bit_attestations() {
        let atts = vec![
            signed(&[0b0000_0000, 0b1], b"z"),
            signed(&[0b0000_0001, 0b1], b"a"),
            signed(&[0b0000_0010, 0b1], b"b"),
        ];

        let result = aggregate_attestations(atts, &concat).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].signature, b"ab".to_vec());
    }

    #[test]
    fn test_aggregate_rejects_invalid_batch() {
        let atts = vec![att(&[0b0000_0001, 0b1]), Attestation::default()];
        assert_eq!(
            aggregate_attestations(atts, &concat),
            Err(AggregationError::MissingBitset { index: 1 })
        );
    }

    #[test]
    fn test_aggregate_propagates_combiner_error() {
        let failing = |_: &[&[u8]]| -> Result<Vec<u8>, AggregationError> {
            Err(AggregationError::SignatureAggregation {
                message: "infinity point".to_string(),
            })
        };

        let result = aggregate_attestations(five_votes(), &failing);
        assert!(matches!(
            result,
            Err(AggregationError::SignatureAggregation { .. })
        ));
    }
}
