// fuzz/fuzz_targets/extract.rs
//
// Arbitrary bytes through the full pipeline: must never panic, and every
// emitted row must satisfy the shape and uniqueness invariants.
#![no_main]

use std::collections::HashSet;

use contractor_harvest_core::{extract_rows, HarvestConfig, NAME_COLUMN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let config = HarvestConfig::default();
    let extraction = extract_rows(data, &config);

    let mut seen = HashSet::new();
    for row in &extraction.rows {
        assert!(row.fields().len() >= config.min_columns);
        assert!(!row.name().is_empty());
        assert_ne!(row.name(), NAME_COLUMN);
        assert!(seen.insert(row.identity_key()));
    }
});
