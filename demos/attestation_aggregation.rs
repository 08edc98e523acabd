//! Attestation aggregation example
//!
//! This example walks a small committee through selection and aggregation,
//! then shows how a poisoned batch is rejected.
//!
//! Run with: `cargo run --example attestation_aggregation`
//! (set `RUST_LOG=debug` to see round-by-round events)

use attestation_maxcover::{
    AggregationError, Attestation, Bitlist, CoverOptions, aggregate_attestations, select,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Attestation Aggregation Example ===\n");

    let atts: Vec<Attestation> = [
        [0b0000_1010u8, 0b1],
        [0b0010_1010, 0b1],
        [0b1111_1010, 0b1],
        [0b0000_0010, 0b1],
        [0b0000_0001, 0b1],
    ]
    .iter()
    .enumerate()
    .map(|(i, raw)| Attestation {
        aggregation_bits: Bitlist::from_bytes(raw).ok(),
        signature: format!("sig{i}").into_bytes(),
        ..Attestation::default()
    })
    .collect();

    // Scenario 1: Selection in both modes
    println!("1. Selecting mergeable attestations...");
    for (label, options) in [
        ("disjoint", CoverOptions::default()),
        ("overlapping", CoverOptions::default().with_overlaps(true)),
    ] {
        match select(&atts, options) {
            Ok(aggregation) => println!(
                "   ✓ {label}: keys {:?}, {} validators covered ({})",
                aggregation.keys,
                aggregation.covered(),
                aggregation.coverage
            ),
            Err(e) => println!("   ✗ Unexpected error: {e}"),
        }
    }
    println!();

    // Scenario 2: Full aggregation with a stand-in signature combiner
    println!("2. Aggregating...");
    let combiner = |sigs: &[&[u8]]| -> Result<Vec<u8>, AggregationError> { Ok(sigs.join(&b'+')) };
    match aggregate_attestations(atts.clone(), &combiner) {
        Ok(aggregated) => {
            println!("   ✓ {} attestations became {}", atts.len(), aggregated.len());
            for att in &aggregated {
                if let Some(bits) = &att.aggregation_bits {
                    println!(
                        "     bits {bits} signature {}",
                        String::from_utf8_lossy(&att.signature)
                    );
                }
            }
        }
        Err(e) => println!("   ✗ Unexpected error: {e}"),
    }
    println!();

    // Scenario 3: Poisoned batch
    println!("3. Testing poisoned batch rejection...");
    let mut poisoned = atts;
    poisoned[3].aggregation_bits = Some(Bitlist::with_len(16));
    match select(&poisoned, CoverOptions::default()) {
        Ok(_) => println!("   ✗ Expected error but got success"),
        Err(e @ AggregationError::LengthMismatch { .. }) => {
            println!("   ✓ Correctly rejected batch");
            println!("     Error: {e}");
        }
        Err(e) => println!("   ✗ Unexpected error: {e}"),
    }
    println!();

    println!("=== Done ===");
}
