// 📂 Loader - brand CSV extracts in, harmonized CSV out
//
// Layout under the data directory:
//
//   <data_dir>/<brand>_vendors.csv                       (or <Brand>_Vendors.csv)
//   <data_dir>/financial/financial_raw_accounts.csv
//   <data_dir>/financial/unified_account_mapping.csv
//   <data_dir>/financial/unified_cost_center_mapping.csv
//
// A missing file is an empty source, never an error. Missing columns and
// fields that are not valid UTF-8 read as empty strings; a record the CSV
// parser cannot split is skipped with a warning.

use crate::entities::{
    AccountMapping, AccountMappings, CostCenterMapping, CostCenterMappings, RawFinancialRow,
    RawVendorRecord, UnifiedVendorRow,
};
use crate::governance::GovernanceSnapshot;
use crate::reconciliation::{PreviewRow, PreviewSummary};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const FINANCIAL_DIR: &str = "financial";
pub const RAW_ACCOUNTS_FILE: &str = "financial_raw_accounts.csv";
pub const ACCOUNT_MAPPING_FILE: &str = "unified_account_mapping.csv";
pub const COST_CENTER_MAPPING_FILE: &str = "unified_cost_center_mapping.csv";

// ============================================================================
// GENERIC CSV READING
// ============================================================================

/// One CSV row keyed by normalized header
struct CsvRow(HashMap<String, String>);

impl CsvRow {
    fn get(&self, column: &str) -> &str {
        self.0.get(column).map(|v| v.as_str()).unwrap_or("")
    }

    fn has(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }
}

/// Header names are trimmed and inner spaces become underscores
fn normalize_header(header: &str) -> String {
    header.trim().replace(' ', "_")
}

/// Invalid UTF-8 decodes to an empty field
fn decode_field(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec()).unwrap_or_default()
}

fn read_csv_rows(path: &Path) -> Result<Vec<CsvRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let headers: Vec<String> = rdr
        .byte_headers()
        .with_context(|| format!("Failed to read headers of {}", path.display()))?
        .iter()
        .map(|h| normalize_header(&String::from_utf8_lossy(h)))
        .collect();

    let mut rows = Vec::new();
    for (index, result) in rdr.byte_records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                warn!(path = %path.display(), record = index + 1, error = %err, "unreadable csv record skipped");
                continue;
            }
        };
        let row = headers
            .iter()
            .cloned()
            .zip(record.iter().map(decode_field))
            .collect();
        rows.push(CsvRow(row));
    }

    debug!(path = %path.display(), rows = rows.len(), "csv loaded");
    Ok(rows)
}

/// Missing file reads as no rows
fn read_csv_rows_if_exists(path: &Path) -> Result<Vec<CsvRow>> {
    if !path.exists() {
        debug!(path = %path.display(), "csv missing, treated as empty");
        return Ok(Vec::new());
    }
    read_csv_rows(path)
}

// ============================================================================
// RAW VENDORS
// ============================================================================

/// `<brand lower>_vendors.csv`, then `<Brand>_Vendors.csv`
pub fn vendor_file_candidates(data_dir: &Path, brand: &str) -> Vec<PathBuf> {
    vec![
        data_dir.join(format!("{}_vendors.csv", brand.to_lowercase())),
        data_dir.join(format!("{}_Vendors.csv", brand)),
    ]
}

/// Accepts the new layout (vendor_id, vendor_name, address, city, state,
/// country, phone) and the old one (Vendor_Name, Address, Phone).
pub fn parse_vendor_csv(path: &Path, brand: &str) -> Result<Vec<RawVendorRecord>> {
    let rows = read_csv_rows_if_exists(path)?;

    let records = rows
        .iter()
        .map(|row| {
            if row.has("vendor_name") && row.has("vendor_id") {
                let address = ["address", "city", "state", "country"]
                    .iter()
                    .map(|column| row.get(column))
                    .filter(|part| !part.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join(", ");
                RawVendorRecord::new(brand, row.get("vendor_name"), &address, row.get("phone"))
            } else {
                RawVendorRecord::new(brand, row.get("Vendor_Name"), row.get("Address"), row.get("Phone"))
            }
        })
        .collect();

    Ok(records)
}

/// First existing candidate file for the brand, or nothing
pub fn load_raw_vendors(data_dir: &Path, brand: &str) -> Result<Vec<RawVendorRecord>> {
    match vendor_file_candidates(data_dir, brand).into_iter().find(|p| p.exists()) {
        Some(path) => parse_vendor_csv(&path, brand),
        None => {
            debug!(brand, "no vendor file found");
            Ok(Vec::new())
        }
    }
}

/// Both brands' raw vendors in brand order, or one brand (case-insensitive)
pub fn load_raw_vendors_for(data_dir: &Path, brands: &[&str], only: Option<&str>) -> Result<Vec<RawVendorRecord>> {
    let mut records = Vec::new();
    for brand in brands
        .iter()
        .filter(|b| only.map_or(true, |o| b.eq_ignore_ascii_case(o.trim())))
    {
        records.extend(load_raw_vendors(data_dir, brand)?);
    }
    Ok(records)
}

// ============================================================================
// FINANCIAL ROWS + MAPPINGS
// ============================================================================

pub fn financial_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(FINANCIAL_DIR)
}

/// Raw rows, optionally only one brand (case-insensitive)
pub fn load_raw_financial_rows(data_dir: &Path, brand: Option<&str>) -> Result<Vec<RawFinancialRow>> {
    let rows = read_csv_rows_if_exists(&financial_dir(data_dir).join(RAW_ACCOUNTS_FILE))?;

    Ok(rows
        .iter()
        .filter(|row| brand.map_or(true, |b| row.get("brand").eq_ignore_ascii_case(b)))
        .map(|row| {
            RawFinancialRow::new(
                row.get("brand"),
                row.get("source_account_name"),
                row.get("source_account_number"),
                row.get("source_cost_center"),
                row.get("amount"),
            )
        })
        .collect())
}

/// Keys and values trimmed; a repeated key keeps the last row
pub fn load_account_mappings(data_dir: &Path) -> Result<AccountMappings> {
    let rows = read_csv_rows_if_exists(&financial_dir(data_dir).join(ACCOUNT_MAPPING_FILE))?;

    Ok(rows
        .iter()
        .map(|row| {
            (
                row.get("source_account_name").trim().to_string(),
                AccountMapping::new(row.get("unified_account_name"), row.get("unified_account_number")),
            )
        })
        .collect())
}

pub fn load_cost_center_mappings(data_dir: &Path) -> Result<CostCenterMappings> {
    let rows = read_csv_rows_if_exists(&financial_dir(data_dir).join(COST_CENTER_MAPPING_FILE))?;

    Ok(rows
        .iter()
        .map(|row| {
            (
                row.get("source_cost_center").trim().to_string(),
                CostCenterMapping::new(row.get("unified_cost_center"), row.get("unified_cost_center_name")),
            )
        })
        .collect())
}

// ============================================================================
// EXPORT
// ============================================================================

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }

    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;
    for row in rows {
        wtr.serialize(row).context("Failed to write CSV row")?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_vendor_rows(path: &Path, rows: &[UnifiedVendorRow]) -> Result<()> {
    write_csv(path, rows)
}

/// Raw vendor export row: the old-format columns plus the ledger it came from
#[derive(Debug, Serialize)]
struct RawVendorExportRow<'a> {
    #[serde(rename = "Vendor_Name")]
    name: &'a str,

    #[serde(rename = "Address")]
    address: &'a str,

    #[serde(rename = "Phone")]
    phone: &'a str,

    #[serde(rename = "Source_Brand")]
    source_brand: &'a str,
}

pub fn write_raw_vendor_rows(path: &Path, records: &[RawVendorRecord]) -> Result<()> {
    let rows: Vec<RawVendorExportRow> = records
        .iter()
        .map(|r| RawVendorExportRow {
            name: &r.name,
            address: &r.address,
            phone: &r.phone,
            source_brand: &r.source_brand,
        })
        .collect();
    write_csv(path, &rows)
}

/// `preview_submission_<brand lower>.csv` under the financial directory
pub fn preview_path(data_dir: &Path, brand: &str) -> PathBuf {
    financial_dir(data_dir).join(format!("preview_submission_{}.csv", brand.trim().to_lowercase()))
}

pub fn write_preview_rows(path: &Path, rows: &[PreviewRow]) -> Result<()> {
    write_csv(path, rows)
}

/// Rebuild and write every brand's preview from the raw rows and `snapshot`
pub fn regenerate_previews(
    data_dir: &Path,
    brands: &[&str],
    snapshot: &GovernanceSnapshot,
) -> Result<Vec<PreviewSummary>> {
    let rows = load_raw_financial_rows(data_dir, None)?;
    let engine = snapshot.reconciliation();

    let mut summaries = Vec::new();
    for brand in brands {
        let summary = engine.preview_summary(brand, &rows);
        write_preview_rows(&preview_path(data_dir, brand), &summary.rows)?;
        debug!(brand, rows = summary.rows.len(), "preview regenerated");
        summaries.push(summary);
    }
    Ok(summaries)
}

// ============================================================================
// TESTS
// ============================================================================
