// 🏷️ Vendor Rules - Rules as Data
// Matching threshold, blend weights, override pairs and manual merges
//
// Rules files written by older tooling are read as well: overrides under
// "manual_overrides", rule collections as objects keyed by rule key,
// tmh_name/raymond_name for the two brand names, and timestamps without an
// offset (read as UTC). Saving always writes the list form.

use crate::error::{HarmonizeError, Result as HarmonizeResult};
use anyhow::{Context as AnyhowContext, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;

// ============================================================================
// OVERRIDE RULE
// ============================================================================

/// Two brand-specific names forced onto one unified name, regardless of score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRule {
    /// Name a unified record must carry for the override to attach to it
    pub unified_name: String,

    /// Raw name as it appears in brand A's ledger
    #[serde(alias = "tmh_name")]
    pub brand_a_name: String,

    /// Raw name as it appears in brand B's ledger
    #[serde(alias = "raymond_name")]
    pub brand_b_name: String,

    #[serde(default)]
    pub created_by: Option<String>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl OverrideRule {
    pub fn new(unified_name: &str, brand_a_name: &str, brand_b_name: &str) -> Self {
        OverrideRule {
            unified_name: unified_name.to_string(),
            brand_a_name: brand_a_name.to_string(),
            brand_b_name: brand_b_name.to_string(),
            created_by: None,
            created_at: None,
        }
    }

    /// Storage key: one override per name pair
    pub fn key(&self) -> String {
        format!("{}||{}", self.brand_a_name, self.brand_b_name)
    }

    /// Exact (raw, case-sensitive) match against either side of the pair
    pub fn matches(&self, raw_name: &str) -> bool {
        self.brand_a_name == raw_name || self.brand_b_name == raw_name
    }
}

// ============================================================================
// MANUAL MERGE RULE
// ============================================================================

/// Unified ids forced into one record with declared values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualMergeRule {
    /// Ids to collapse; the first one survives
    pub vendor_ids: Vec<String>,

    /// Declared values; None falls back to the first live record's value
    #[serde(default)]
    pub unified_name: Option<String>,

    #[serde(default)]
    pub unified_address: Option<String>,

    #[serde(default)]
    pub unified_phone: Option<String>,

    #[serde(default)]
    pub merged_by: Option<String>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub merged_at: Option<DateTime<Utc>>,
}

impl ManualMergeRule {
    pub fn new(vendor_ids: &[&str], name: &str, address: &str, phone: &str) -> Self {
        ManualMergeRule {
            vendor_ids: vendor_ids.iter().map(|id| id.to_string()).collect(),
            unified_name: Some(name.to_string()),
            unified_address: Some(address.to_string()),
            unified_phone: Some(phone.to_string()),
            merged_by: None,
            merged_at: None,
        }
    }

    /// Storage key: one rule per id set
    pub fn key(&self) -> String {
        self.vendor_ids.join("||")
    }

    /// Id that survives the merge
    pub fn surviving_id(&self) -> Option<&str> {
        self.vendor_ids.first().map(|s| s.as_str())
    }
}

// ============================================================================
// VENDOR RULES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorRules {
    /// Minimum combined score (0-100) to attach to an existing record
    #[serde(default = "default_threshold")]
    pub confidence_threshold: i64,

    #[serde(default = "default_name_weight")]
    pub name_weight: f64,

    #[serde(default = "default_address_weight")]
    pub address_weight: f64,

    /// Checked in this order
    #[serde(default, alias = "manual_overrides", deserialize_with = "list_or_keyed")]
    pub overrides: Vec<OverrideRule>,

    /// Applied in this order
    #[serde(default, deserialize_with = "list_or_keyed")]
    pub manual_merges: Vec<ManualMergeRule>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_updated: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_by: Option<String>,
}

/// Slack for weights like 0.7 + 0.3 that do not sum to exactly 1.0 in f64
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

// ============================================================================
// FILE FORMAT COMPATIBILITY
// ============================================================================

/// A rule collection as a list, or as an object keyed by rule key (document order kept)
fn list_or_keyed<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct ListOrKeyed<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for ListOrKeyed<T> {
        type Value = Vec<T>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list of rules or an object of rules keyed by rule key")
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<Vec<T>, E> {
            Ok(Vec::new())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Vec<T>, A::Error> {
            let mut rules = Vec::new();
            while let Some(rule) = seq.next_element()? {
                rules.push(rule);
            }
            Ok(rules)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Vec<T>, A::Error> {
            let mut rules = Vec::new();
            while let Some((_key, rule)) = map.next_entry::<String, T>()? {
                rules.push(rule);
            }
            Ok(rules)
        }
    }

    deserializer.deserialize_any(ListOrKeyed(PhantomData))
}

/// RFC 3339, or a naive ISO timestamp taken as UTC; anything else is dropped
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
}

fn default_threshold() -> i64 {
    85
}

fn default_name_weight() -> f64 {
    0.7
}

fn default_address_weight() -> f64 {
    0.3
}

impl VendorRules {
    /// Load rules from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read vendor rules file: {:?}", path.as_ref()))?;

        let rules: VendorRules =
            serde_json::from_str(&content).context("Failed to parse vendor rules JSON")?;

        Ok(rules)
    }

    /// Load rules, falling back to defaults when the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Governance-boundary validation; engines assume validated rules
    pub fn validate(&self) -> HarmonizeResult<()> {
        if !(0..=100).contains(&self.confidence_threshold) {
            return Err(HarmonizeError::InvalidThreshold(self.confidence_threshold));
        }

        for (field, value) in [("name", self.name_weight), ("address", self.address_weight)] {
            if !value.is_finite() || value < 0.0 {
                return Err(HarmonizeError::InvalidWeight { field, value });
            }
        }

        let weight_sum = self.name_weight + self.address_weight;
        if weight_sum > 1.0 + WEIGHT_SUM_TOLERANCE {
            return Err(HarmonizeError::InvalidWeightSum(weight_sum));
        }

        for merge in &self.manual_merges {
            if merge.vendor_ids.len() < 2 {
                return Err(HarmonizeError::InvalidRule(format!(
                    "manual merge needs at least 2 vendor ids, got {}",
                    merge.vendor_ids.len()
                )));
            }
        }

        Ok(())
    }

    /// Insert or replace an override (same name pair = same rule)
    pub fn upsert_override(&mut self, rule: OverrideRule) {
        let key = rule.key();
        match self.overrides.iter_mut().find(|o| o.key() == key) {
            Some(existing) => *existing = rule,
            None => self.overrides.push(rule),
        }
    }

    /// Insert or replace a manual merge (same id set = same rule)
    pub fn upsert_manual_merge(&mut self, rule: ManualMergeRule) {
        let key = rule.key();
        match self.manual_merges.iter_mut().find(|m| m.key() == key) {
            Some(existing) => *existing = rule,
            None => self.manual_merges.push(rule),
        }
    }

    /// Stamp who changed the rules and when
    pub fn touch(&mut self, actor: &str) {
        self.last_updated = Some(Utc::now());
        self.updated_by = Some(actor.to_string());
    }
}

impl Default for VendorRules {
    fn default() -> Self {
        VendorRules {
            confidence_threshold: default_threshold(),
            name_weight: default_name_weight(),
            address_weight: default_address_weight(),
            overrides: Vec::new(),
            manual_merges: Vec::new(),
            last_updated: None,
            updated_by: None,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_rules() {
        let rules = VendorRules::default();
        assert_eq!(rules.confidence_threshold, 85);
        assert_eq!(rules.name_weight, 0.7);
        assert_eq!(rules.address_weight, 0.3);
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let mut rules = VendorRules::default();

        rules.confidence_threshold = 101;
        assert!(matches!(rules.validate(), Err(HarmonizeError::InvalidThreshold(101))));

        rules.confidence_threshold = -1;
        assert!(matches!(rules.validate(), Err(HarmonizeError::InvalidThreshold(-1))));

        rules.confidence_threshold = 0;
        assert!(rules.validate().is_ok());
        rules.confidence_threshold = 100;
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn test_bad_weight_rejected() {
        let mut rules = VendorRules::default();
        rules.address_weight = f64::NAN;
        assert!(matches!(
            rules.validate(),
            Err(HarmonizeError::InvalidWeight { field: "address", .. })
        ));

        rules.address_weight = 0.3;
        rules.name_weight = -0.1;
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_weight_sum_above_one_rejected() {
        let mut rules = VendorRules::default();
        rules.name_weight = 1.0;
        rules.address_weight = 1.0;
        assert!(matches!(rules.validate(), Err(HarmonizeError::InvalidWeightSum(sum)) if sum == 2.0));

        rules.name_weight = 0.6;
        rules.address_weight = 0.4;
        assert!(rules.validate().is_ok());

        rules.name_weight = 0.5;
        rules.address_weight = 0.0;
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn test_short_manual_merge_rejected() {
        let mut rules = VendorRules::default();
        rules.manual_merges.push(ManualMergeRule::new(&["V0001"], "Acme", "", ""));
        assert!(matches!(rules.validate(), Err(HarmonizeError::InvalidRule(_))));
    }

    #[test]
    fn test_override_matches_either_side() {
        let rule = OverrideRule::new("Acme Corporation", "ACME Corp", "Acme Co.");
        assert!(rule.matches("ACME Corp"));
        assert!(rule.matches("Acme Co."));
        assert!(!rule.matches("acme corp"));
        assert_eq!(rule.key(), "ACME Corp||Acme Co.");
    }

    #[test]
    fn test_upsert_override_replaces_same_pair() {
        let mut rules = VendorRules::default();
        rules.upsert_override(OverrideRule::new("Acme", "A1", "B1"));
        rules.upsert_override(OverrideRule::new("Zeta", "A2", "B2"));
        rules.upsert_override(OverrideRule::new("Acme Inc", "A1", "B1"));

        assert_eq!(rules.overrides.len(), 2);
        assert_eq!(rules.overrides[0].unified_name, "Acme Inc");
        assert_eq!(rules.overrides[1].unified_name, "Zeta");
    }

    #[test]
    fn test_upsert_manual_merge_replaces_same_ids() {
        let mut rules = VendorRules::default();
        rules.upsert_manual_merge(ManualMergeRule::new(&["V0001", "V0002"], "A", "", ""));
        rules.upsert_manual_merge(ManualMergeRule::new(&["V0001", "V0002"], "B", "", ""));
        assert_eq!(rules.manual_merges.len(), 1);
        assert_eq!(rules.manual_merges[0].unified_name.as_deref(), Some("B"));
        assert_eq!(rules.manual_merges[0].surviving_id(), Some("V0001"));
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"confidence_threshold": 90, "overrides": [{{"unified_name": "Acme", "brand_a_name": "ACME", "brand_b_name": "Acme Co"}}]}}"#
        )
        .unwrap();

        let rules = VendorRules::from_file(file.path()).unwrap();
        assert_eq!(rules.confidence_threshold, 90);
        assert_eq!(rules.name_weight, 0.7);
        assert_eq!(rules.overrides.len(), 1);
        assert!(rules.manual_merges.is_empty());
    }

    #[test]
    fn test_keyed_rules_file_from_older_tooling() {
        let json = r#"{
            "confidence_threshold": 80,
            "normalization_rules": { "lowercase": true },
            "manual_overrides": {
                "ACME Corp||Acme Co.": {
                    "unified_name": "Acme Corporation",
                    "tmh_name": "ACME Corp",
                    "raymond_name": "Acme Co.",
                    "created_by": "liam",
                    "created_at": "2024-03-01T09:30:00.123456"
                },
                "Zeta||Zeta Ltd": {
                    "unified_name": "Zeta",
                    "tmh_name": "Zeta",
                    "raymond_name": "Zeta Ltd"
                }
            },
            "manual_merges": {
                "V0001||V0002": {
                    "vendor_ids": ["V0001", "V0002"],
                    "unified_name": "Acme",
                    "unified_address": "",
                    "unified_phone": "",
                    "merged_by": "liam",
                    "merged_at": "2024-03-02T10:00:00",
                    "confidence": 100
                }
            },
            "last_updated": "2024-03-02T10:00:00.5",
            "updated_by": "liam"
        }"#;

        let rules: VendorRules = serde_json::from_str(json).unwrap();
        assert_eq!(rules.confidence_threshold, 80);
        assert_eq!(rules.overrides.len(), 2);
        assert_eq!(rules.overrides[0].key(), "ACME Corp||Acme Co.");
        assert_eq!(rules.overrides[0].unified_name, "Acme Corporation");
        assert_eq!(rules.overrides[1].brand_b_name, "Zeta Ltd");
        assert_eq!(
            rules.overrides[0].created_at.map(|t| t.to_rfc3339()),
            Some("2024-03-01T09:30:00.123456+00:00".to_string())
        );
        assert_eq!(rules.manual_merges.len(), 1);
        assert_eq!(rules.manual_merges[0].surviving_id(), Some("V0001"));
        assert!(rules.manual_merges[0].merged_at.is_some());
        assert!(rules.last_updated.is_some());
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn test_saved_rules_read_back() {
        let mut rules = VendorRules::default();
        rules.upsert_override(OverrideRule::new("Acme", "ACME", "Acme Co"));
        rules.touch("liam");

        let json = serde_json::to_string(&rules).unwrap();
        assert!(json.contains(r#""overrides":[{"#));

        let back: VendorRules = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rules);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let rules = VendorRules::load_or_default(dir.path().join("nope.json")).unwrap();
        assert_eq!(rules, VendorRules::default());
    }
}
