// crates/core/src/consolidator.rs
//! Row consolidator: candidate regions → deduplicated rows.
//!
//! The first row seen for an identity key wins; later rows with the same key
//! are dropped even when they carry more data.

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::config::HarvestConfig;
use crate::delimited::parse_records;
use crate::types::{CandidateRegion, ConsolidatedRowSet, IdentityKey, Row};

/// Set of identity keys already emitted during one run.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<IdentityKey>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key`; returns `true` the first time a key is offered.
    pub fn insert(&mut self, key: IdentityKey) -> bool {
        self.seen.insert(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Why a parsed row was not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRejection {
    TooFewColumns,
    EmptyName,
    RepeatedHeader,
}

/// Outcome of feeding one region to the consolidator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionOutcome {
    pub accepted: usize,
    pub rejected: usize,
    pub duplicates: usize,
    pub discarded: bool,
}

pub struct RowConsolidator<'c> {
    config: &'c HarvestConfig,
    dedup: Deduplicator,
    rows: ConsolidatedRowSet,
}

impl<'c> RowConsolidator<'c> {
    pub fn new(config: &'c HarvestConfig) -> Self {
        Self {
            config,
            dedup: Deduplicator::new(),
            rows: ConsolidatedRowSet::default(),
        }
    }

    /// Shape check for one parsed record against the region's header name.
    pub fn check_shape(&self, fields: &[String], header_name: &str) -> Result<(), RowRejection> {
        if fields.len() < self.config.min_columns {
            return Err(RowRejection::TooFewColumns);
        }
        let name = fields.first().map(String::as_str).unwrap_or("");
        if name.is_empty() {
            return Err(RowRejection::EmptyName);
        }
        if name == header_name {
            return Err(RowRejection::RepeatedHeader);
        }
        Ok(())
    }

    /// Parse one candidate region and merge its rows. A region that fails to
    /// tokenize is discarded whole.
    pub fn consume(&mut self, region: &CandidateRegion<'_>) -> RegionOutcome {
        let mut outcome = RegionOutcome::default();
        if region.is_header_only() {
            debug!("Skipping header-only region");
            return outcome;
        }

        let mut records = match parse_records(&region.to_delimited_text()) {
            Ok(records) => records.into_iter(),
            Err(e) => {
                warn!(error = %e, lines = region.data_lines().len(), "Discarding unparseable region");
                outcome.discarded = true;
                return outcome;
            }
        };

        let header_name = records
            .next()
            .and_then(|header| header.into_iter().next())
            .unwrap_or_default();

        for fields in records {
            if let Err(reason) = self.check_shape(&fields, &header_name) {
                debug!(?reason, fields = fields.len(), "Rejecting row");
                outcome.rejected += 1;
                continue;
            }
            let row = Row::new(fields);
            if self.dedup.insert(row.identity_key()) {
                self.rows.push(row);
                outcome.accepted += 1;
            } else {
                debug!(key = %row.identity_key(), "Dropping duplicate row");
                outcome.duplicates += 1;
            }
        }

        outcome
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn finish(self) -> ConsolidatedRowSet {
        self.rows
    }
}
