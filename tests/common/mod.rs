//! Shared fixture: a randomly generated but structurally valid tree sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tszip::tables::{TableCollection, TreeSequence, NULL};

pub const SEQUENCE_LENGTH: f64 = 1_000_000.0;

/// Builds a valid tree sequence with the statistical texture the codec
/// policies target: sorted site positions, clustered edge parents, small
/// repeated flags, and ragged metadata of mixed lengths.
pub fn simulated_tree_sequence(seed: u64) -> TreeSequence {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut tables = TableCollection::new(SEQUENCE_LENGTH);

    tables.populations.add_row(b"{\"name\": \"pop_a\"}");
    tables.populations.add_row(b"{\"name\": \"pop_b\"}");

    let num_samples = 100usize;
    let num_internal = 99usize;
    let num_nodes = num_samples + num_internal;

    for i in 0..num_samples {
        let individual = if i % 2 == 0 { (i / 2) as i32 } else { NULL };
        tables.nodes.add_row(1, 0.0, rng.gen_range(0..2), individual, &[]);
    }
    for i in 0..num_samples / 2 {
        let metadata = format!("sample_{i}");
        tables
            .individuals
            .add_row(0, &[rng.gen_range(-90.0..90.0), rng.gen_range(-180.0..180.0)], &[NULL, NULL], metadata.as_bytes());
    }
    let mut time = 0.0;
    for _ in 0..num_internal {
        time += rng.gen_range(0.01..1.0);
        tables.nodes.add_row(0, time, 0, NULL, &[]);
    }

    // Every node but the last gets a parent later in the node table, so all
    // references stay in range and parents cluster in runs.
    for child in 0..num_nodes - 1 {
        let lo = (child + 1).max(num_samples);
        let parent = rng.gen_range(lo..num_nodes);
        let left = rng.gen_range(0.0..SEQUENCE_LENGTH / 2.0);
        let right = rng.gen_range(SEQUENCE_LENGTH / 2.0..SEQUENCE_LENGTH);
        tables
            .edges
            .add_row(left, right, parent as i32, child as i32, &[]);
    }

    // Discrete genome coordinates, as simulators emit by default: positions
    // are whole numbers stored in a float column.
    let states: [&[u8]; 4] = [b"A", b"C", b"G", b"T"];
    let mut position = 0.0;
    let mut site = 0i32;
    loop {
        position += rng.gen_range(100..5000) as f64;
        if position >= SEQUENCE_LENGTH {
            break;
        }
        tables
            .sites
            .add_row(position, states[rng.gen_range(0..4)], &[]);
        let node = rng.gen_range(0..num_nodes) as i32;
        tables
            .mutations
            .add_row(site, node, NULL, rng.gen_range(0.0..time), states[rng.gen_range(0..4)], &[]);
        site += 1;
    }

    tables
        .provenances
        .add_row(b"2026-08-23T12:00:00", b"{\"software\": {\"name\": \"sim\"}}");

    TreeSequence::new(tables).expect("generated tables must validate")
}
