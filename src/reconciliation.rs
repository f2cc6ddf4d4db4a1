// ⚖️ Reconciliation Engine - Brand rows against the corporate chart of accounts
//
// Every raw row is classified against one mapping snapshot:
//
//   account mapped?      trimmed source_account_name is a key of AccountMappings
//   cost center mapped?  trimmed source_cost_center is a key of CostCenterMappings
//
// A row reaches the preview only when BOTH keys are present. Variances flag
// what blocks submission; an empty cost center is never flagged, but it still
// keeps the row out of the preview unless "" itself is mapped.
//
// Nothing here mutates the mapping tables. Every call recomputes from the
// rows it is given.

use crate::entities::{
    parse_amount, AccountMapping, AccountMappings, ApprovedRow, CostCenterMapping,
    CostCenterMappings, RawFinancialRow, UnifiedFinancialRow, UNMAPPED,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

// ============================================================================
// VARIANCE TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VarianceType {
    /// Source account name has no corporate mapping
    UnmappedAccount,

    /// Non-empty source cost center has no corporate mapping
    UnmappedCostCenter,
}

impl VarianceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VarianceType::UnmappedAccount => "UNMAPPED_ACCOUNT",
            VarianceType::UnmappedCostCenter => "UNMAPPED_COST_CENTER",
        }
    }

    /// Both kinds block submission
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            VarianceType::UnmappedAccount | VarianceType::UnmappedCostCenter
        )
    }
}

impl fmt::Display for VarianceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceRecord {
    pub variance_type: VarianceType,

    /// Upper-case brand tag
    pub brand: String,

    /// "UNMAPPED" for account variances; for cost-center variances the
    /// mapped account number, or "UNMAPPED"
    pub unified_account: String,

    pub source_account_number: String,
    pub source_account_name: String,
    pub source_cost_center: String,
    pub message: String,
}

/// Governance-facing wording of the same classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityIssue {
    pub issue_type: VarianceType,
    pub message: String,
    pub brand: String,
    pub source_account_name: String,
    pub source_account_number: String,

    /// Only set for cost-center issues
    pub source_cost_center: Option<String>,
}

// ============================================================================
// CLASSIFICATION + PREVIEW
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowClassification {
    /// Account key present in the mapping
    pub account_mapped: bool,

    /// Cost-center key present in the mapping ("" counts only if mapped)
    pub cost_center_mapped: bool,

    /// Non-empty cost center that is missing from the mapping
    pub cost_center_flagged: bool,
}

impl RowClassification {
    pub fn is_fully_mapped(&self) -> bool {
        self.account_mapped && self.cost_center_mapped
    }

    /// 0, 1 or 2
    pub fn variance_count(&self) -> usize {
        usize::from(!self.account_mapped) + usize::from(self.cost_center_flagged)
    }
}

/// Fully mapped row translated to corporate identifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewRow {
    pub brand: String,
    pub source_account: String,
    pub source_account_name: String,
    pub unified_account: String,
    pub unified_account_name: String,
    pub unified_cost_center: String,
    pub unified_cost_center_name: String,

    /// Source text, untouched
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewSummary {
    pub brand: String,
    pub rows: Vec<PreviewRow>,
    pub variance_count: usize,
    pub blocking_count: usize,
    pub can_submit: bool,
}

impl PreviewSummary {
    pub fn summary(&self) -> String {
        format!(
            "{}: {} preview rows, {} variances ({} blocking), {}",
            self.brand,
            self.rows.len(),
            self.variance_count,
            self.blocking_count,
            if self.can_submit { "ready to submit" } else { "not ready" }
        )
    }
}

/// Result of the submission gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionGate {
    Open,
    Blocked { blocking_count: usize },
}

impl SubmissionGate {
    pub fn is_open(&self) -> bool {
        matches!(self, SubmissionGate::Open)
    }
}

// ============================================================================
// CORPORATE VIEW
// ============================================================================

/// One (unified_account, unified_cost_center) bucket of approved rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorporateViewRow {
    pub unified_account: String,
    pub unified_cost_center: String,
    pub amount: f64,

    /// Metadata only; brand is not a grouping dimension
    pub contributing_brands: Vec<String>,
}

/// Group approved rows by (account, cost center), sum amounts, sort by key
///
/// Unparseable amounts count as 0.0.
pub fn aggregate_corporate_view(approved: &[ApprovedRow]) -> Vec<CorporateViewRow> {
    let mut buckets: BTreeMap<(String, String), (f64, BTreeSet<String>)> = BTreeMap::new();

    for row in approved {
        let key = (
            row.unified_account.trim().to_string(),
            row.unified_cost_center.trim().to_string(),
        );
        let bucket = buckets.entry(key).or_insert_with(|| (0.0, BTreeSet::new()));
        bucket.0 += parse_amount(&row.amount);
        bucket.1.insert(row.brand.trim().to_uppercase());
    }

    buckets
        .into_iter()
        .map(|((unified_account, unified_cost_center), (amount, brands))| CorporateViewRow {
            unified_account,
            unified_cost_center,
            amount,
            contributing_brands: brands.into_iter().collect(),
        })
        .collect()
}

/// Rows whose brand tag matches (case-insensitive)
pub fn rows_for_brand<'r>(rows: &'r [RawFinancialRow], brand: &str) -> Vec<&'r RawFinancialRow> {
    rows.iter()
        .filter(|r| r.brand.trim().eq_ignore_ascii_case(brand.trim()))
        .collect()
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

pub struct ReconciliationEngine<'m> {
    accounts: &'m AccountMappings,
    cost_centers: &'m CostCenterMappings,
}

impl<'m> ReconciliationEngine<'m> {
    pub fn new(accounts: &'m AccountMappings, cost_centers: &'m CostCenterMappings) -> Self {
        ReconciliationEngine {
            accounts,
            cost_centers,
        }
    }

    fn account(&self, row: &RawFinancialRow) -> Option<&'m AccountMapping> {
        self.accounts.get(row.account_key())
    }

    fn cost_center(&self, row: &RawFinancialRow) -> Option<&'m CostCenterMapping> {
        self.cost_centers.get(row.cost_center_key())
    }

    pub fn classify(&self, row: &RawFinancialRow) -> RowClassification {
        let cost_center_mapped = self.cost_center(row).is_some();

        RowClassification {
            account_mapped: self.account(row).is_some(),
            cost_center_mapped,
            cost_center_flagged: !row.cost_center_key().is_empty() && !cost_center_mapped,
        }
    }

    /// Fully mapped rows only, in input order
    pub fn preview<'r, I>(&self, rows: I) -> Vec<PreviewRow>
    where
        I: IntoIterator<Item = &'r RawFinancialRow>,
    {
        rows.into_iter()
            .filter_map(|row| {
                let account = self.account(row)?;
                let cost_center = self.cost_center(row)?;

                Some(PreviewRow {
                    brand: row.brand_upper(),
                    source_account: row.source_account_number.trim().to_string(),
                    source_account_name: row.account_key().to_string(),
                    unified_account: account.unified_account_number.clone(),
                    unified_account_name: account.unified_account_name.clone(),
                    unified_cost_center: cost_center.unified_cost_center.clone(),
                    unified_cost_center_name: cost_center.unified_cost_center_name.clone(),
                    amount: row.amount.trim().to_string(),
                })
            })
            .collect()
    }

    /// 0, 1 or 2 variances per row, in input order
    pub fn variances<'r, I>(&self, rows: I) -> Vec<VarianceRecord>
    where
        I: IntoIterator<Item = &'r RawFinancialRow>,
    {
        let mut variances = Vec::new();

        for row in rows {
            let account_name = row.account_key();
            let account_number = row.source_account_number.trim();
            let cost_center = row.cost_center_key();
            let account = self.account(row);

            if account.is_none() {
                variances.push(VarianceRecord {
                    variance_type: VarianceType::UnmappedAccount,
                    brand: row.brand_upper(),
                    unified_account: UNMAPPED.to_string(),
                    source_account_number: account_number.to_string(),
                    source_account_name: account_name.to_string(),
                    source_cost_center: cost_center.to_string(),
                    message: format!(
                        "Account '{} ({})' has no unified mapping",
                        account_name, account_number
                    ),
                });
            }

            if !cost_center.is_empty() && self.cost_center(row).is_none() {
                variances.push(VarianceRecord {
                    variance_type: VarianceType::UnmappedCostCenter,
                    brand: row.brand_upper(),
                    unified_account: account
                        .map(|a| a.unified_account_number.clone())
                        .unwrap_or_else(|| UNMAPPED.to_string()),
                    source_account_number: account_number.to_string(),
                    source_account_name: account_name.to_string(),
                    source_cost_center: cost_center.to_string(),
                    message: format!("Cost center '{}' has no unified mapping", cost_center),
                });
            }
        }

        debug!(count = variances.len(), "variances computed");
        variances
    }

    /// Same classification as `variances`, worded for whoever fixes mappings
    pub fn data_quality_issues<'r, I>(&self, rows: I) -> Vec<DataQualityIssue>
    where
        I: IntoIterator<Item = &'r RawFinancialRow>,
    {
        let mut issues = Vec::new();

        for row in rows {
            let account_name = row.account_key();
            let account_number = row.source_account_number.trim();
            let cost_center = row.cost_center_key();

            if self.account(row).is_none() {
                issues.push(DataQualityIssue {
                    issue_type: VarianceType::UnmappedAccount,
                    message: format!(
                        "Account '{} ({})' could not be mapped. Resolve this in Mapping Governance.",
                        account_name, account_number
                    ),
                    brand: row.brand.trim().to_string(),
                    source_account_name: account_name.to_string(),
                    source_account_number: account_number.to_string(),
                    source_cost_center: None,
                });
            }

            if !cost_center.is_empty() && self.cost_center(row).is_none() {
                issues.push(DataQualityIssue {
                    issue_type: VarianceType::UnmappedCostCenter,
                    message: format!(
                        "Cost center '{}' could not be mapped. Resolve this in Mapping Governance.",
                        cost_center
                    ),
                    brand: row.brand.trim().to_string(),
                    source_account_name: account_name.to_string(),
                    source_account_number: account_number.to_string(),
                    source_cost_center: Some(cost_center.to_string()),
                });
            }
        }

        issues
    }

    /// Re-evaluated on every call; no cached verdict
    pub fn submission_gate<'r, I>(&self, rows: I) -> SubmissionGate
    where
        I: IntoIterator<Item = &'r RawFinancialRow>,
    {
        match blocking_count(&self.variances(rows)) {
            0 => SubmissionGate::Open,
            blocking_count => SubmissionGate::Blocked { blocking_count },
        }
    }

    /// Preview + variance counts for one brand
    pub fn preview_summary(&self, brand: &str, rows: &[RawFinancialRow]) -> PreviewSummary {
        let brand_rows = rows_for_brand(rows, brand);
        let preview = self.preview(brand_rows.iter().copied());
        let variances = self.variances(brand_rows.iter().copied());
        let blocking = blocking_count(&variances);

        PreviewSummary {
            brand: brand.trim().to_uppercase(),
            can_submit: blocking == 0 && !preview.is_empty(),
            rows: preview,
            variance_count: variances.len(),
            blocking_count: blocking,
        }
    }

    /// Two-brand extract with "UNMAPPED" in place of any missing dimension
    pub fn unify_rows<'r, I>(&self, rows: I) -> Vec<UnifiedFinancialRow>
    where
        I: IntoIterator<Item = &'r RawFinancialRow>,
    {
        rows.into_iter()
            .map(|row| {
                let (unified_account_number, unified_account_name) = match self.account(row) {
                    Some(a) => (a.unified_account_number.clone(), a.unified_account_name.clone()),
                    None => (UNMAPPED.to_string(), String::new()),
                };
                let unified_cost_center = self
                    .cost_center(row)
                    .map(|c| c.unified_cost_center.clone())
                    .unwrap_or_else(|| UNMAPPED.to_string());

                UnifiedFinancialRow {
                    brand: row.brand.trim().to_string(),
                    source_account_number: row.source_account_number.trim().to_string(),
                    source_account_name: row.account_key().to_string(),
                    unified_account_number,
                    unified_account_name,
                    unified_cost_center,
                    amount: row.amount.trim().to_string(),
                }
            })
            .collect()
    }
}

/// Variances that block submission
pub fn blocking_count(variances: &[VarianceRecord]) -> usize {
    variances
        .iter()
        .filter(|v| v.variance_type.is_blocking())
        .count()
}

// ============================================================================
// TESTS
// ============================================================================
