// 📒 Ledger Entities - brand financial rows and corporate mappings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel for a dimension that has no corporate mapping
pub const UNMAPPED: &str = "UNMAPPED";

// ============================================================================
// RAW FINANCIAL ROW
// ============================================================================

/// One row of a brand's financial extract
///
/// Amount stays as the source text: previews and submissions echo it
/// untouched, only aggregation parses it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawFinancialRow {
    #[serde(default)]
    pub brand: String,

    #[serde(default)]
    pub source_account_name: String,

    #[serde(default)]
    pub source_account_number: String,

    #[serde(default)]
    pub source_cost_center: String,

    #[serde(default)]
    pub amount: String,
}

impl RawFinancialRow {
    pub fn new(
        brand: &str,
        source_account_name: &str,
        source_account_number: &str,
        source_cost_center: &str,
        amount: &str,
    ) -> Self {
        RawFinancialRow {
            brand: brand.to_string(),
            source_account_name: source_account_name.to_string(),
            source_account_number: source_account_number.to_string(),
            source_cost_center: source_cost_center.to_string(),
            amount: amount.to_string(),
        }
    }

    /// Mapping keys are compared after trimming
    pub fn account_key(&self) -> &str {
        self.source_account_name.trim()
    }

    pub fn cost_center_key(&self) -> &str {
        self.source_cost_center.trim()
    }

    /// Brand tag in its canonical upper-case form
    pub fn brand_upper(&self) -> String {
        self.brand.trim().to_uppercase()
    }
}

/// Parse an amount string; blank or malformed amounts count as 0.0
pub fn parse_amount(amount: &str) -> f64 {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse::<f64>().unwrap_or(0.0)
}

// ============================================================================
// MAPPINGS
// ============================================================================

/// Target of an account mapping (keyed by source_account_name)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMapping {
    pub unified_account_name: String,
    pub unified_account_number: String,
}

impl AccountMapping {
    pub fn new(unified_account_name: &str, unified_account_number: &str) -> Self {
        AccountMapping {
            unified_account_name: unified_account_name.trim().to_string(),
            unified_account_number: unified_account_number.trim().to_string(),
        }
    }
}

/// Target of a cost-center mapping (keyed by source_cost_center)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCenterMapping {
    pub unified_cost_center: String,
    pub unified_cost_center_name: String,
}

impl CostCenterMapping {
    pub fn new(unified_cost_center: &str, unified_cost_center_name: &str) -> Self {
        CostCenterMapping {
            unified_cost_center: unified_cost_center.trim().to_string(),
            unified_cost_center_name: unified_cost_center_name.trim().to_string(),
        }
    }
}

/// source_account_name → target; keys unique and trimmed
pub type AccountMappings = BTreeMap<String, AccountMapping>;

/// source_cost_center → target; keys unique and trimmed
pub type CostCenterMappings = BTreeMap<String, CostCenterMapping>;

// ============================================================================
// UNIFIED FINANCIAL ROW (two-brand extract)
// ============================================================================

/// Raw row translated to corporate identifiers, with UNMAPPED sentinels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedFinancialRow {
    pub brand: String,
    pub source_account_number: String,
    pub source_account_name: String,
    pub unified_account_number: String,
    pub unified_account_name: String,
    pub unified_cost_center: String,
    pub amount: String,
}

impl UnifiedFinancialRow {
    /// Empty account numbers count as unmapped too
    pub fn is_account_unmapped(&self) -> bool {
        let account = self.unified_account_number.trim();
        account.is_empty() || account == UNMAPPED
    }

    pub fn is_cost_center_unmapped(&self) -> bool {
        self.unified_cost_center == UNMAPPED
    }
}

// ============================================================================
// SUBMITTED + APPROVED ROWS
// ============================================================================

/// Preview row frozen under a submission id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRow {
    pub submission_id: String,
    pub brand: String,
    pub source_account: String,
    pub unified_account: String,
    pub unified_cost_center: String,
    pub amount: String,
}

/// Submission row copied into the approved set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedRow {
    pub submission_id: String,
    pub brand: String,
    pub unified_account: String,
    pub unified_cost_center: String,
    pub amount: String,
    pub approved_at: DateTime<Utc>,
}

impl ApprovedRow {
    pub fn from_submission_row(row: &SubmissionRow, approved_at: DateTime<Utc>) -> Self {
        ApprovedRow {
            submission_id: row.submission_id.clone(),
            brand: row.brand.clone(),
            unified_account: row.unified_account.clone(),
            unified_cost_center: row.unified_cost_center.clone(),
            amount: row.amount.clone(),
            approved_at,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
