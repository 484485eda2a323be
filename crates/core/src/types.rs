// crates/core/src/types.rs
use serde::{Deserialize, Serialize};

/// Canonical header every candidate region is re-prefixed with, and the
/// first line of the consolidated output.
pub const CANONICAL_HEADER: &str = "Company_Name,Phone,Website,Email,City,Province,Service_Area_Cities,Brands_Installed,Services,Google_Maps_Link,Notes,Verification_Status";

/// Column names of [`CANONICAL_HEADER`], in order.
pub const CANONICAL_COLUMNS: [&str; 12] = [
    "Company_Name",
    "Phone",
    "Website",
    "Email",
    "City",
    "Province",
    "Service_Area_Cities",
    "Brands_Installed",
    "Services",
    "Google_Maps_Link",
    "Notes",
    "Verification_Status",
];

pub const NAME_COLUMN: &str = "Company_Name";
pub const PHONE_COLUMN: &str = "Phone";
pub const STATUS_COLUMN: &str = "Verification_Status";

/// Field positions used for the identity key.
pub const NAME_INDEX: usize = 0;
pub const CITY_INDEX: usize = 4;
pub const STATUS_INDEX: usize = 11;

// ============================================================================
// Log envelope (one JSON record per line)
// ============================================================================

/// One record of the source log. Only `message` matters here; every other
/// top-level field is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEnvelope {
    pub message: EnvelopeMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopeMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: EnvelopeContent,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeContent {
    Text(String),
    Items(Vec<ContentItem>),
}

impl Default for EnvelopeContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Other,
}

impl LogEnvelope {
    pub fn is_assistant(&self) -> bool {
        self.message.role.as_deref() == Some("assistant")
    }

    /// Flatten the content payload: text items joined by newlines, every
    /// other item type dropped.
    pub fn flatten_text(&self) -> String {
        match &self.message.content {
            EnvelopeContent::Text(text) => text.clone(),
            EnvelopeContent::Items(items) => items
                .iter()
                .filter_map(|item| match item {
                    ContentItem::Text { text } => Some(text.as_str()),
                    ContentItem::Other => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

// ============================================================================
// Pipeline values
// ============================================================================

/// Flattened text of one assistant envelope that passed the marker pre-filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    /// 1-based line number of the envelope in the log.
    pub line: usize,
    pub text: String,
}

/// A contiguous run of lines believed to form one delimited table,
/// always starting with the canonical header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRegion<'a> {
    lines: Vec<&'a str>,
}

impl<'a> CandidateRegion<'a> {
    pub fn new(header: &'a str) -> Self {
        Self {
            lines: vec![header],
        }
    }

    pub fn push(&mut self, line: &'a str) {
        self.lines.push(line);
    }

    pub fn header(&self) -> &'a str {
        self.lines[0]
    }

    /// Lines after the synthetic header, in source order.
    pub fn data_lines(&self) -> &[&'a str] {
        &self.lines[1..]
    }

    pub fn is_header_only(&self) -> bool {
        self.lines.len() == 1
    }

    /// Reassemble the region as one delimited-text blob.
    pub fn to_delimited_text(&self) -> String {
        self.lines.join("\n")
    }
}

/// One parsed data line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Row {
    fields: Vec<String>,
}

impl Row {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Field at `index`, or `""` when the row is shorter.
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn name(&self) -> &str {
        self.field(NAME_INDEX)
    }

    pub fn city(&self) -> &str {
        self.field(CITY_INDEX)
    }

    pub fn status(&self) -> &str {
        self.field(STATUS_INDEX)
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(self.name(), self.city())
    }
}

/// Composite identity of a row: trimmed name plus trimmed locality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub name: String,
    pub locality: String,
}

impl IdentityKey {
    pub fn new(name: &str, locality: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            locality: locality.trim().to_string(),
        }
    }
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}", self.name, self.locality)
    }
}

/// Deduplicated rows in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConsolidatedRowSet {
    rows: Vec<Row>,
}

impl ConsolidatedRowSet {
    pub(crate) fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<'a> IntoIterator for &'a ConsolidatedRowSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Counters for one scan, covering every recoverable error class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub envelopes: usize,
    pub decode_errors: usize,
    pub assistant_envelopes: usize,
    pub text_blocks: usize,
    pub regions: usize,
    pub regions_discarded: usize,
    pub rows_accepted: usize,
    pub rows_rejected: usize,
    pub duplicates: usize,
}
