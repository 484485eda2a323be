// crates/core/src/segmenter.rs
//! Block segmenter: locates candidate table regions inside one text block.
//!
//! Two states. `Outside` scans for a header line; `InBlock` appends lines to
//! the open region until a stop condition fires. A header line seen while a
//! region is open flushes that region and opens a fresh one. Whatever is
//! still open at end of text is flushed as-is.

use crate::config::HarvestConfig;
use crate::types::{CandidateRegion, CANONICAL_HEADER, NAME_COLUMN, PHONE_COLUMN, STATUS_COLUMN};

/// Substrings a line must all contain to count as a table header.
pub const START_MARKERS: [&str; 3] = [NAME_COLUMN, PHONE_COLUMN, STATUS_COLUMN];

/// Why an open region was closed. Variants are listed in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCondition {
    Blank,
    Heading,
    HorizontalRule,
    Callout,
    CodeFence,
    ShortBullet,
}

pub fn is_start_marker(line: &str) -> bool {
    START_MARKERS.iter().all(|marker| line.contains(marker))
}

/// Stateless segmentation rules, built from [`HarvestConfig`].
#[derive(Debug, Clone)]
pub struct Segmenter<'c> {
    config: &'c HarvestConfig,
}

impl<'c> Segmenter<'c> {
    pub fn new(config: &'c HarvestConfig) -> Self {
        Self { config }
    }

    /// First stop condition the line trips, if any.
    pub fn stop_condition(&self, line: &str) -> Option<StopCondition> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            Some(StopCondition::Blank)
        } else if trimmed.starts_with('#') {
            Some(StopCondition::Heading)
        } else if trimmed.starts_with("---") {
            Some(StopCondition::HorizontalRule)
        } else if trimmed.starts_with(self.config.callout_marker.as_str()) {
            Some(StopCondition::Callout)
        } else if trimmed.starts_with("```") {
            Some(StopCondition::CodeFence)
        } else if self.is_short_bullet(trimmed) {
            Some(StopCondition::ShortBullet)
        } else {
            None
        }
    }

    fn is_short_bullet(&self, trimmed: &str) -> bool {
        trimmed.starts_with('*')
            && !trimmed.contains(self.config.phone_prefix.as_str())
            && trimmed.chars().count() < self.config.short_bullet_max_len
    }

    /// Lazily yield the candidate regions of `text`, in source order.
    pub fn regions<'a>(&self, text: &'a str) -> Regions<'a, 'c> {
        Regions {
            segmenter: self.clone(),
            lines: text.split('\n'),
            state: State::Outside,
        }
    }
}

#[derive(Debug)]
enum State<'a> {
    Outside,
    InBlock(CandidateRegion<'a>),
}

/// Iterator returned by [`Segmenter::regions`].
pub struct Regions<'a, 'c> {
    segmenter: Segmenter<'c>,
    lines: std::str::Split<'a, char>,
    state: State<'a>,
}

impl<'a> Regions<'a, '_> {
    /// Advance the state machine by one line, returning a region if the
    /// transition flushed one.
    fn step(&mut self, line: &'a str) -> Option<CandidateRegion<'a>> {
        if is_start_marker(line) {
            let opened = CandidateRegion::new(CANONICAL_HEADER);
            return match std::mem::replace(&mut self.state, State::InBlock(opened)) {
                State::InBlock(previous) => Some(previous),
                State::Outside => None,
            };
        }

        match &mut self.state {
            State::Outside => None,
            State::InBlock(region) => {
                if self.segmenter.stop_condition(line).is_none() {
                    region.push(line);
                    return None;
                }
                match std::mem::replace(&mut self.state, State::Outside) {
                    State::InBlock(closed) => Some(closed),
                    State::Outside => None,
                }
            }
        }
    }
}

impl<'a> Iterator for Regions<'a, '_> {
    type Item = CandidateRegion<'a>;

    fn next(&mut self) -> Option<CandidateRegion<'a>> {
        while let Some(line) = self.lines.next() {
            if let Some(region) = self.step(line) {
                return Some(region);
            }
        }
        match std::mem::replace(&mut self.state, State::Outside) {
            State::InBlock(region) => Some(region),
            State::Outside => None,
        }
    }
}
