// crates/core/src/pipeline.rs
//! Envelope filter → block segmenter → row consolidator, in one sequential
//! pass. Scan order is significant: the first row seen for a key wins.

use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::config::HarvestConfig;
use crate::consolidator::RowConsolidator;
use crate::delimited::write_record;
use crate::envelope::{read_log, EnvelopeFilter};
use crate::error::ExtractError;
use crate::segmenter::Segmenter;
use crate::types::{ConsolidatedRowSet, ScanReport, TextBlock, CANONICAL_COLUMNS};

/// Result of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub rows: ConsolidatedRowSet,
    pub report: ScanReport,
}

/// Segment and consolidate already-filtered text blocks.
pub fn consolidate_blocks<I>(blocks: I, config: &HarvestConfig) -> Extraction
where
    I: IntoIterator<Item = TextBlock>,
{
    let segmenter = Segmenter::new(config);
    let mut consolidator = RowConsolidator::new(config);
    let mut report = ScanReport::default();

    for block in blocks {
        let before = consolidator.len();
        for region in segmenter.regions(&block.text) {
            report.regions += 1;
            let outcome = consolidator.consume(&region);
            if outcome.discarded {
                report.regions_discarded += 1;
            }
            report.rows_accepted += outcome.accepted;
            report.rows_rejected += outcome.rejected;
            report.duplicates += outcome.duplicates;
        }
        debug!(
            line = block.line,
            new_rows = consolidator.len() - before,
            "Scanned text block"
        );
    }

    Extraction {
        rows: consolidator.finish(),
        report,
    }
}

/// Run the whole pipeline over raw log bytes. Never fails: undecodable
/// envelopes, unparseable regions and malformed rows are skipped.
pub fn extract_rows(log: &[u8], config: &HarvestConfig) -> Extraction {
    let mut filter = EnvelopeFilter::new(log);
    let mut extraction = consolidate_blocks(filter.by_ref(), config);

    let stats = filter.stats();
    extraction.report.envelopes = stats.envelopes;
    extraction.report.decode_errors = stats.decode_errors;
    extraction.report.assistant_envelopes = stats.assistant_envelopes;
    extraction.report.text_blocks = stats.text_blocks;

    let r = &extraction.report;
    info!(
        envelopes = r.envelopes,
        decode_errors = r.decode_errors,
        text_blocks = r.text_blocks,
        regions = r.regions,
        regions_discarded = r.regions_discarded,
        rows = r.rows_accepted,
        rows_rejected = r.rows_rejected,
        duplicates = r.duplicates,
        "Extraction complete"
    );
    extraction
}

/// Read a log file wholesale and run the pipeline over it.
pub async fn extract_file(path: &Path, config: &HarvestConfig) -> Result<Extraction, ExtractError> {
    let log = read_log(path).await?;
    Ok(extract_rows(&log, config))
}

/// Write the canonical header followed by every consolidated row.
pub fn write_rows<W: Write>(mut w: W, rows: &ConsolidatedRowSet) -> io::Result<()> {
    write_record(&mut w, &CANONICAL_COLUMNS)?;
    for row in rows {
        write_record(&mut w, row.fields())?;
    }
    w.flush()
}

pub async fn write_rows_file(path: &Path, rows: &ConsolidatedRowSet) -> Result<(), ExtractError> {
    let mut buf = Vec::new();
    write_rows(&mut buf, rows).map_err(|e| ExtractError::write(path, e))?;
    tokio::fs::write(path, buf)
        .await
        .map_err(|e| ExtractError::write(path, e))
}
