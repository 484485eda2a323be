// crates/core/src/listing.rs
//! Consolidated rows → public directory listings.
//!
//! Fields are addressed by canonical header position; rows shorter than the
//! header read the missing fields as empty.

use chrono::NaiveDate;
use regex_lite::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;

use crate::error::ExtractError;
use crate::types::{ConsolidatedRowSet, Row};

/// Canonical column positions read by the transform.
mod col {
    pub const NAME: usize = 0;
    pub const PHONE: usize = 1;
    pub const WEBSITE: usize = 2;
    pub const CITY: usize = 4;
    pub const SERVICE_AREA: usize = 6;
    pub const BRANDS: usize = 7;
    pub const SERVICES: usize = 8;
    pub const NOTES: usize = 10;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Region {
    #[serde(rename = "Lower Mainland")]
    LowerMainland,
    #[serde(rename = "Vancouver Island")]
    VancouverIsland,
    #[serde(rename = "Interior")]
    Interior,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::LowerMainland => "Lower Mainland",
            Region::VancouverIsland => "Vancouver Island",
            Region::Interior => "Interior",
        }
    }

    /// Region for a city; cities missing from the table fall back to the
    /// Lower Mainland.
    pub fn for_city(city: &str) -> Self {
        CITY_REGIONS
            .iter()
            .find(|(name, _)| *name == city)
            .map(|(_, region)| *region)
            .unwrap_or(Region::LowerMainland)
    }
}

const CITY_REGIONS: &[(&str, Region)] = &[
    ("Vancouver", Region::LowerMainland),
    ("Surrey", Region::LowerMainland),
    ("Burnaby", Region::LowerMainland),
    ("Richmond", Region::LowerMainland),
    ("Coquitlam", Region::LowerMainland),
    ("Langley", Region::LowerMainland),
    ("Abbotsford", Region::LowerMainland),
    ("North Vancouver", Region::LowerMainland),
    ("West Vancouver", Region::LowerMainland),
    ("New Westminster", Region::LowerMainland),
    ("Maple Ridge", Region::LowerMainland),
    ("Port Coquitlam", Region::LowerMainland),
    ("Delta", Region::LowerMainland),
    ("Chilliwack", Region::LowerMainland),
    ("Pitt Meadows", Region::LowerMainland),
    ("Mission", Region::LowerMainland),
    ("Agassiz", Region::LowerMainland),
    ("Victoria", Region::VancouverIsland),
    ("Nanaimo", Region::VancouverIsland),
    ("Sidney", Region::VancouverIsland),
    ("Sooke", Region::VancouverIsland),
    ("Ladysmith", Region::VancouverIsland),
    ("Courtenay", Region::VancouverIsland),
    ("Campbell River", Region::VancouverIsland),
    ("Kelowna", Region::Interior),
    ("Kamloops", Region::Interior),
    ("Prince George", Region::Interior),
    ("Vernon", Region::Interior),
    ("Penticton", Region::Interior),
    ("Salmon Arm", Region::Interior),
    ("Kaleden", Region::Interior),
    ("Okanagan Falls", Region::Interior),
    ("West Kelowna", Region::Interior),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    HeatPumps,
    AirToWater,
    Boilers,
    Hybrid,
}

impl ServiceType {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "Heat Pumps" | "VRF" => Some(ServiceType::HeatPumps),
            "Gas Backup" => Some(ServiceType::Hybrid),
            "Hydronics" => Some(ServiceType::Boilers),
            "Air-to-Water" => Some(ServiceType::AirToWater),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmergencyService {
    Yes,
    No,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    Active,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    pub company_name: String,
    pub slug: String,
    pub website: String,
    pub phone: String,
    pub city: String,
    pub region: Region,
    pub province: &'static str,
    pub services: Vec<ServiceType>,
    pub emergency_service: EmergencyService,
    pub brands_supported: Vec<String>,
    pub notes: String,
    pub source_urls: Vec<String>,
    pub tsbc_verified: bool,
    pub tsbc_fsr_license: String,
    pub tsbc_gas_license: String,
    pub tsbc_electrical_license: String,
    pub tsbc_license_status: LicenseStatus,
    pub tsbc_enforcement_actions: u32,
    pub tsbc_last_verified: String,
}

/// URL-safe slug: lowercase, apostrophes dropped, other non-alphanumeric
/// runs collapsed to `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.to_lowercase().chars() {
        if matches!(ch, '\'' | '\u{2018}' | '\u{2019}') {
            continue;
        }
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// TSBC licence classes, by number prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseKind {
    Gas,
    Fsr,
    Electrical,
}

impl LicenseKind {
    pub fn prefix(self) -> &'static str {
        match self {
            LicenseKind::Gas => "LGA",
            LicenseKind::Fsr => "LRA",
            LicenseKind::Electrical => "LEL",
        }
    }

    fn regex(self) -> &'static Regex {
        static GAS: OnceLock<Regex> = OnceLock::new();
        static FSR: OnceLock<Regex> = OnceLock::new();
        static ELECTRICAL: OnceLock<Regex> = OnceLock::new();
        let cell = match self {
            LicenseKind::Gas => &GAS,
            LicenseKind::Fsr => &FSR,
            LicenseKind::Electrical => &ELECTRICAL,
        };
        cell.get_or_init(|| {
            Regex::new(&format!(r"(?i)\b({}\d+)\b", self.prefix())).expect("licence pattern is valid")
        })
    }
}

/// First whole-word licence number of `kind`, upper-cased, or `""`.
pub fn extract_license(notes: &str, kind: LicenseKind) -> String {
    kind.regex()
        .captures(notes)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_uppercase())
        .unwrap_or_default()
}

pub fn map_services(services: &str) -> Vec<ServiceType> {
    let mut seen = HashSet::new();
    services
        .split(',')
        .filter_map(|part| ServiceType::from_label(part.trim()))
        .filter(|service| seen.insert(*service))
        .collect()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn build_notes(row: &Row) -> String {
    let mut parts = Vec::new();
    let area = row.field(col::SERVICE_AREA).trim();
    if !area.is_empty() {
        parts.push(format!("Service area: {area}."));
    }
    let notes = row.field(col::NOTES).trim();
    if !notes.is_empty() {
        parts.push(notes.to_string());
    }
    parts.join(" ")
}

fn strip_protocol(website: &str) -> &str {
    website
        .strip_prefix("https://")
        .or_else(|| website.strip_prefix("http://"))
        .unwrap_or(website)
}

/// Build one listing per row with a non-empty name. Repeated slugs get a
/// numeric suffix starting at `-2`.
pub fn build_listings(rows: &ConsolidatedRowSet, verified_on: Option<NaiveDate>) -> Vec<DirectoryListing> {
    let mut slug_counts: HashMap<String, usize> = HashMap::new();
    let mut listings = Vec::new();

    for row in rows {
        let company_name = row.field(col::NAME).trim();
        if company_name.is_empty() {
            continue;
        }

        let base_slug = slugify(company_name);
        let count = slug_counts.entry(base_slug.clone()).or_insert(0);
        *count += 1;
        let slug = if *count == 1 {
            base_slug
        } else {
            format!("{base_slug}-{count}")
        };

        let city = row.field(col::CITY).trim();
        let notes = build_notes(row);
        let tsbc_verified = notes.contains("TSBC");

        listings.push(DirectoryListing {
            company_name: company_name.to_string(),
            slug,
            website: strip_protocol(row.field(col::WEBSITE).trim()).to_string(),
            phone: row.field(col::PHONE).trim().to_string(),
            city: city.to_string(),
            region: Region::for_city(city),
            province: "BC",
            services: map_services(row.field(col::SERVICES)),
            emergency_service: EmergencyService::Unknown,
            brands_supported: split_list(row.field(col::BRANDS)),
            tsbc_fsr_license: extract_license(&notes, LicenseKind::Fsr),
            tsbc_gas_license: extract_license(&notes, LicenseKind::Gas),
            tsbc_electrical_license: extract_license(&notes, LicenseKind::Electrical),
            tsbc_license_status: if tsbc_verified {
                LicenseStatus::Active
            } else {
                LicenseStatus::Unknown
            },
            tsbc_enforcement_actions: 0,
            tsbc_last_verified: match (tsbc_verified, verified_on) {
                (true, Some(date)) => date.format("%Y-%m-%d").to_string(),
                _ => String::new(),
            },
            tsbc_verified,
            notes,
            source_urls: Vec::new(),
        });
    }

    listings
}

/// Listing count per region, in region order.
pub fn region_summary(listings: &[DirectoryListing]) -> BTreeMap<Region, usize> {
    let mut summary = BTreeMap::new();
    for listing in listings {
        *summary.entry(listing.region).or_insert(0) += 1;
    }
    summary
}

/// Cities with the most listings, at most `limit`. Ties keep the order in
/// which the cities first appear.
pub fn city_summary(listings: &[DirectoryListing], limit: usize) -> Vec<(&str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for listing in listings {
        let city = listing.city.as_str();
        match index.get(city) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(city, counts.len());
                counts.push((city, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);
    counts
}

/// `<dir>/<stem>_archive.json` beside `path`.
pub fn archive_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    path.with_file_name(format!("{stem}_archive.json"))
}

/// Copy an existing listings file to its archive path before it is
/// overwritten. Returns the archive path when a copy was made.
pub async fn archive_listings_file(path: &Path) -> Result<Option<PathBuf>, ExtractError> {
    let archive = archive_path(path);
    match tokio::fs::copy(path, &archive).await {
        Ok(_) => {
            info!(from = %path.display(), to = %archive.display(), "Archived previous listings");
            Ok(Some(archive))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ExtractError::write(archive, e)),
    }
}

pub async fn write_listings_file(path: &Path, listings: &[DirectoryListing]) -> Result<(), ExtractError> {
    let json = serde_json::to_string_pretty(listings).map_err(|source| ExtractError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| ExtractError::write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarvestConfig;
    use crate::pipeline::consolidate_blocks;
    use crate::types::{TextBlock, CANONICAL_HEADER};
    use pretty_assertions::assert_eq;

    fn rows(lines: &[&str]) -> ConsolidatedRowSet {
        let text = format!("{CANONICAL_HEADER}\n{}", lines.join("\n"));
        consolidate_blocks(vec![TextBlock { line: 1, text }], &HarvestConfig::default()).rows
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Acme Heating & Cooling Ltd."), "acme-heating-cooling-ltd");
        assert_eq!(slugify("Bob's HVAC"), "bobs-hvac");
        assert_eq!(slugify("Bob\u{2019}s HVAC"), "bobs-hvac");
        assert_eq!(slugify("  --Prime  Air-- "), "prime-air");
        assert_eq!(slugify("Éco Chauffage"), "co-chauffage");
    }

    #[test]
    fn test_region_lookup() {
        assert_eq!(Region::for_city("Victoria"), Region::VancouverIsland);
        assert_eq!(Region::for_city("Kelowna"), Region::Interior);
        assert_eq!(Region::for_city("Surrey"), Region::LowerMainland);
        assert_eq!(Region::for_city("Atlantis"), Region::LowerMainland);
    }

    #[test]
    fn test_map_services_dedups_in_order() {
        assert_eq!(
            map_services("VRF, Hydronics, Heat Pumps, Gas Backup, Solar"),
            vec![ServiceType::HeatPumps, ServiceType::Boilers, ServiceType::Hybrid]
        );
        assert!(map_services("").is_empty());
    }

    #[test]
    fn test_extract_license() {
        assert_eq!(extract_license("TSBC lga0003114 on file", LicenseKind::Gas), "LGA0003114");
        assert_eq!(extract_license("TSBC LRA12, LEL9", LicenseKind::Electrical), "LEL9");
        assert_eq!(extract_license("XLGA123", LicenseKind::Gas), "");
        assert_eq!(extract_license("no licence", LicenseKind::Fsr), "");
    }

    #[test]
    fn test_build_listing_fields() {
        let rows = rows(&[
            "Acme Heating,604-555-0100,https://acme.ca,,Victoria,BC,\"Sooke, Sidney\",\"Daikin, Mitsubishi\",\"Heat Pumps, Hydronics\",,TSBC LGA0001,Verified_Website",
        ]);
        let date = NaiveDate::from_ymd_opt(2026, 2, 21);
        let listings = build_listings(&rows, date);
        assert_eq!(listings.len(), 1);

        let l = &listings[0];
        assert_eq!(l.company_name, "Acme Heating");
        assert_eq!(l.slug, "acme-heating");
        assert_eq!(l.website, "acme.ca");
        assert_eq!(l.region, Region::VancouverIsland);
        assert_eq!(l.services, vec![ServiceType::HeatPumps, ServiceType::Boilers]);
        assert_eq!(l.brands_supported, vec!["Daikin", "Mitsubishi"]);
        assert_eq!(l.notes, "Service area: Sooke, Sidney. TSBC LGA0001");
        assert!(l.tsbc_verified);
        assert_eq!(l.tsbc_gas_license, "LGA0001");
        assert_eq!(l.tsbc_license_status, LicenseStatus::Active);
        assert_eq!(l.tsbc_last_verified, "2026-02-21");
    }

    #[test]
    fn test_unverified_listing() {
        let rows = rows(&["Beta Air,250,,,Kelowna,BC"]);
        let listings = build_listings(&rows, NaiveDate::from_ymd_opt(2026, 2, 21));
        let l = &listings[0];
        assert!(!l.tsbc_verified);
        assert_eq!(l.tsbc_license_status, LicenseStatus::Unknown);
        assert_eq!(l.tsbc_last_verified, "");
        assert_eq!(l.notes, "");
        assert!(l.brands_supported.is_empty());
    }

    #[test]
    fn test_repeated_slugs_get_suffixes() {
        let rows = rows(&[
            "Acme,1,,,Vancouver,BC",
            "Acme,2,,,Surrey,BC",
            "ACME!,3,,,Delta,BC",
        ]);
        let slugs: Vec<_> = build_listings(&rows, None).into_iter().map(|l| l.slug).collect();
        assert_eq!(slugs, vec!["acme", "acme-2", "acme-3"]);
    }

    #[test]
    fn test_blank_name_rows_skipped() {
        let rows = rows(&["   ,1,,,Vancouver,BC", "Real,2,,,Vancouver,BC"]);
        let listings = build_listings(&rows, None);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].company_name, "Real");
    }

    #[test]
    fn test_region_summary() {
        let rows = rows(&[
            "A,1,,,Victoria,BC",
            "B,1,,,Kelowna,BC",
            "C,1,,,Nanaimo,BC",
        ]);
        let summary = region_summary(&build_listings(&rows, None));
        assert_eq!(summary.get(&Region::VancouverIsland), Some(&2));
        assert_eq!(summary.get(&Region::Interior), Some(&1));
        assert_eq!(summary.get(&Region::LowerMainland), None);
    }

    #[test]
    fn test_listing_json_shape() {
        let rows = rows(&["Acme,604,,,Kamloops,BC,,,Air-to-Water,,,Unverified"]);
        let listings = build_listings(&rows, None);
        let value = serde_json::to_value(&listings[0]).unwrap();
        assert_eq!(value["region"], "Interior");
        assert_eq!(value["province"], "BC");
        assert_eq!(value["services"], serde_json::json!(["air_to_water"]));
        assert_eq!(value["emergency_service"], "unknown");
        assert_eq!(value["tsbc_license_status"], "unknown");
    }

    #[test]
    fn test_city_summary_orders_by_count_then_first_appearance() {
        let rows = rows(&[
            "A,1,,,Surrey,BC",
            "B,1,,,Kelowna,BC",
            "C,1,,,Victoria,BC",
            "D,1,,,Kelowna,BC",
            "E,1,,,Victoria,BC",
            "F,1,,,Delta,BC",
        ]);
        let listings = build_listings(&rows, None);
        assert_eq!(
            city_summary(&listings, 10),
            vec![("Kelowna", 2), ("Victoria", 2), ("Surrey", 1), ("Delta", 1)]
        );
        assert_eq!(city_summary(&listings, 2), vec![("Kelowna", 2), ("Victoria", 2)]);
        assert!(city_summary(&[], 10).is_empty());
    }

    #[test]
    fn test_archive_path() {
        assert_eq!(
            archive_path(Path::new("/data/directory.json")),
            PathBuf::from("/data/directory_archive.json")
        );
        assert_eq!(archive_path(Path::new("out")), PathBuf::from("out_archive.json"));
    }

    #[tokio::test]
    async fn test_write_listings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        let listings = build_listings(&rows(&["Acme,604,,,Vancouver,BC"]), None);
        write_listings_file(&path, &listings).await.unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed[0]["slug"], "acme");
    }

    #[tokio::test]
    async fn test_archive_missing_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        assert_eq!(archive_listings_file(&path).await.unwrap(), None);
        assert!(!dir.path().join("directory_archive.json").exists());
    }

    #[tokio::test]
    async fn test_archive_keeps_previous_listings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        std::fs::write(&path, "[{\"slug\":\"old\"}]").unwrap();

        let archived = archive_listings_file(&path).await.unwrap();
        let expected = dir.path().join("directory_archive.json");
        assert_eq!(archived, Some(expected.clone()));

        let listings = build_listings(&rows(&["Acme,604,,,Vancouver,BC"]), None);
        write_listings_file(&path, &listings).await.unwrap();

        assert_eq!(std::fs::read_to_string(&expected).unwrap(), "[{\"slug\":\"old\"}]");
        assert!(std::fs::read_to_string(&path).unwrap().contains("\"acme\""));
    }
}
