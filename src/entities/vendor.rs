// 🏪 Vendor Entity - raw brand records and the unified registry
//
// "Vendor name is a VALUE, unified id is IDENTITY"
//
// A unified record is born from the first raw record that does not match
// anything already in the registry. Later matches only add brands and move
// the confidence; id, name, address and phone stay with the representative.

use crate::normalize::normalize_name;
use serde::{Deserialize, Serialize};

// ============================================================================
// RAW VENDOR RECORD
// ============================================================================

/// One row of a brand's vendor ledger, read-only
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawVendorRecord {
    /// Brand tag of the ledger this row came from (e.g. "TMH")
    pub source_brand: String,
    pub name: String,
    pub address: String,
    pub phone: String,
}

impl RawVendorRecord {
    pub fn new(source_brand: &str, name: &str, address: &str, phone: &str) -> Self {
        RawVendorRecord {
            source_brand: source_brand.to_string(),
            name: name.to_string(),
            address: address.to_string(),
            phone: phone.to_string(),
        }
    }
}

// ============================================================================
// UNIFIED VENDOR RECORD
// ============================================================================

/// Canonical vendor identity in the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedVendorRecord {
    /// Sequential id ("V0001", "V0002", ...) - assigned once, never reused
    pub id: String,

    /// Name of the representative record
    pub name: String,

    /// normalize_name(name), kept alongside for matching
    pub normalized_name: String,

    pub address: String,

    /// Already normalized (see normalize_phone)
    pub phone: String,

    /// Contributing brands, each listed once
    pub source_brands: Vec<String>,

    /// Match confidence (0-100)
    pub confidence: u32,
}

impl UnifiedVendorRecord {
    pub fn new(id: String, name: &str, address: &str, phone: &str, source_brand: &str, confidence: u32) -> Self {
        UnifiedVendorRecord {
            id,
            name: name.to_string(),
            normalized_name: normalize_name(name),
            address: address.to_string(),
            phone: phone.to_string(),
            source_brands: vec![source_brand.to_string()],
            confidence,
        }
    }

    /// Format the n-th sequential id
    pub fn format_id(sequence: usize) -> String {
        format!("V{:04}", sequence)
    }

    /// Add a brand if not already present (keeps first-seen order)
    pub fn add_brand(&mut self, brand: &str) {
        if !self.has_brand(brand) {
            self.source_brands.push(brand.to_string());
        }
    }

    pub fn has_brand(&self, brand: &str) -> bool {
        self.source_brands.iter().any(|b| b == brand)
    }

    /// True when more than one distinct brand contributed
    pub fn is_harmonized(&self) -> bool {
        self.source_brands.len() > 1
    }

    /// "TMH, Raymond"
    pub fn brands_joined(&self) -> String {
        self.source_brands.join(", ")
    }
}

// ============================================================================
// OUTPUT ROW
// ============================================================================

/// One row of the harmonized vendor export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedVendorRow {
    pub unified_vendor_id: String,
    pub unified_name: String,

    /// Unified name if brand A contributed, else empty
    pub brand_a_source_name: String,

    /// Unified name if brand B contributed, else empty
    pub brand_b_source_name: String,

    pub unified_address: String,
    pub unified_phone: String,
    pub confidence: u32,

    /// Comma-joined contributing brands
    pub source_brands: String,
}

impl UnifiedVendorRow {
    pub fn from_record(record: &UnifiedVendorRecord, brand_a: &str, brand_b: &str) -> Self {
        let echo = |brand: &str| {
            if record.has_brand(brand) {
                record.name.clone()
            } else {
                String::new()
            }
        };

        UnifiedVendorRow {
            unified_vendor_id: record.id.clone(),
            unified_name: record.name.clone(),
            brand_a_source_name: echo(brand_a),
            brand_b_source_name: echo(brand_b),
            unified_address: record.address.clone(),
            unified_phone: record.phone.clone(),
            // a zero confidence never leaves the engine
            confidence: if record.confidence == 0 { 100 } else { record.confidence },
            source_brands: record.brands_joined(),
        }
    }

    /// Number of distinct brands in the joined list
    pub fn brand_count(&self) -> usize {
        self.source_brands
            .split(',')
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())
            .count()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_id() {
        assert_eq!(UnifiedVendorRecord::format_id(1), "V0001");
        assert_eq!(UnifiedVendorRecord::format_id(42), "V0042");
        assert_eq!(UnifiedVendorRecord::format_id(12345), "V12345");
    }

    #[test]
    fn test_new_record_normalizes_name() {
        let record = UnifiedVendorRecord::new(
            "V0001".to_string(),
            "ACME Corp.",
            "1 Main St",
            "(555) 123-4567",
            "TMH",
            100,
        );
        assert_eq!(record.normalized_name, "acme corp");
        assert_eq!(record.source_brands, vec!["TMH".to_string()]);
        assert!(!record.is_harmonized());
    }

    #[test]
    fn test_add_brand_deduplicates() {
        let mut record = UnifiedVendorRecord::new("V0001".to_string(), "Acme", "", "", "TMH", 100);
        record.add_brand("Raymond");
        record.add_brand("TMH");
        record.add_brand("Raymond");

        assert_eq!(record.brands_joined(), "TMH, Raymond");
        assert!(record.is_harmonized());
    }

    #[test]
    fn test_output_row_echoes_names_per_brand() {
        let mut record = UnifiedVendorRecord::new("V0003".to_string(), "Acme", "1 Main", "", "Raymond", 91);
        let row = UnifiedVendorRow::from_record(&record, "TMH", "Raymond");
        assert_eq!(row.brand_a_source_name, "");
        assert_eq!(row.brand_b_source_name, "Acme");
        assert_eq!(row.brand_count(), 1);

        record.add_brand("TMH");
        let row = UnifiedVendorRow::from_record(&record, "TMH", "Raymond");
        assert_eq!(row.brand_a_source_name, "Acme");
        assert_eq!(row.brand_b_source_name, "Acme");
        assert_eq!(row.source_brands, "Raymond, TMH");
        assert_eq!(row.confidence, 91);
        assert_eq!(row.brand_count(), 2);
    }
}
