// 🔀 Cross-Brand Variance - Compare the two brands account by account
//
// Works on the unified two-brand extract (see ReconciliationEngine::unify_rows).
// Mapped rows are grouped by unified account number in first-seen order, then
// each group gets at most one verdict, checked in this order:
//
//   missing_brand → count_mismatch → cost_center_mismatch → unmapped_cost_center
//
// Rows without a unified account are never grouped; each one is reported on
// its own as unmapped_account, after all groups.

use crate::entities::{UnifiedFinancialRow, UNMAPPED};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossBrandVarianceType {
    MissingBrand,
    CountMismatch,
    CostCenterMismatch,
    UnmappedCostCenter,
    UnmappedAccount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossBrandVariance {
    pub variance_type: CrossBrandVarianceType,
    pub unified_account_number: String,

    /// Source account name for unmapped_account entries
    pub unified_account_name: String,

    pub brand_a_count: usize,
    pub brand_b_count: usize,
    pub brand_a_records: Vec<UnifiedFinancialRow>,
    pub brand_b_records: Vec<UnifiedFinancialRow>,
    pub message: String,
}

struct AccountGroup {
    unified_account_number: String,
    unified_account_name: String,
    brand_a: Vec<UnifiedFinancialRow>,
    brand_b: Vec<UnifiedFinancialRow>,
}

pub struct CrossBrandComparison {
    pub brand_a: String,
    pub brand_b: String,
}

impl CrossBrandComparison {
    pub fn new(brand_a: &str, brand_b: &str) -> Self {
        CrossBrandComparison {
            brand_a: brand_a.to_string(),
            brand_b: brand_b.to_string(),
        }
    }

    /// Rows tagged with neither brand are ignored inside groups
    pub fn compare(&self, rows: &[UnifiedFinancialRow]) -> Vec<CrossBrandVariance> {
        let mut groups: Vec<AccountGroup> = Vec::new();
        let mut unmapped: Vec<&UnifiedFinancialRow> = Vec::new();

        for row in rows {
            if row.is_account_unmapped() {
                unmapped.push(row);
                continue;
            }

            let index = match groups
                .iter()
                .position(|g| g.unified_account_number == row.unified_account_number)
            {
                Some(index) => index,
                None => {
                    groups.push(AccountGroup {
                        unified_account_number: row.unified_account_number.clone(),
                        unified_account_name: row.unified_account_name.clone(),
                        brand_a: Vec::new(),
                        brand_b: Vec::new(),
                    });
                    groups.len() - 1
                }
            };

            if self.is_brand_a(&row.brand) {
                groups[index].brand_a.push(row.clone());
            } else if self.is_brand_b(&row.brand) {
                groups[index].brand_b.push(row.clone());
            }
        }

        let mut variances: Vec<CrossBrandVariance> =
            groups.into_iter().filter_map(|g| self.judge(g)).collect();

        for row in unmapped {
            let in_a = self.is_brand_a(&row.brand);
            let in_b = self.is_brand_b(&row.brand);

            variances.push(CrossBrandVariance {
                variance_type: CrossBrandVarianceType::UnmappedAccount,
                unified_account_number: UNMAPPED.to_string(),
                unified_account_name: row.source_account_name.clone(),
                brand_a_count: usize::from(in_a),
                brand_b_count: usize::from(in_b),
                brand_a_records: if in_a { vec![row.clone()] } else { Vec::new() },
                brand_b_records: if in_b { vec![row.clone()] } else { Vec::new() },
                message: format!(
                    "Account {} ({}) could not be mapped to unified COA",
                    row.source_account_number, row.source_account_name
                ),
            });
        }

        variances
    }

    fn judge(&self, group: AccountGroup) -> Option<CrossBrandVariance> {
        let a_count = group.brand_a.len();
        let b_count = group.brand_b.len();

        let (variance_type, message) = if a_count == 0 {
            (
                CrossBrandVarianceType::MissingBrand,
                format!("Account exists in {} only ({} records)", self.brand_b, b_count),
            )
        } else if b_count == 0 {
            (
                CrossBrandVarianceType::MissingBrand,
                format!("Account exists in {} only ({} records)", self.brand_a, a_count),
            )
        } else if a_count != b_count {
            (
                CrossBrandVarianceType::CountMismatch,
                format!(
                    "Record count mismatch ({}: {}, {}: {})",
                    self.brand_a, a_count, self.brand_b, b_count
                ),
            )
        } else {
            let a_centers = cost_centers(&group.brand_a);
            let b_centers = cost_centers(&group.brand_b);

            if a_centers != b_centers {
                (
                    CrossBrandVarianceType::CostCenterMismatch,
                    format!(
                        "Cost center mismatch ({}: {:?}, {}: {:?})",
                        self.brand_a, a_centers, self.brand_b, b_centers
                    ),
                )
            } else if group
                .brand_a
                .iter()
                .chain(group.brand_b.iter())
                .any(|r| r.is_cost_center_unmapped())
            {
                (
                    CrossBrandVarianceType::UnmappedCostCenter,
                    "Some cost centers could not be mapped".to_string(),
                )
            } else {
                return None;
            }
        };

        Some(CrossBrandVariance {
            variance_type,
            unified_account_number: group.unified_account_number,
            unified_account_name: group.unified_account_name,
            brand_a_count: a_count,
            brand_b_count: b_count,
            brand_a_records: group.brand_a,
            brand_b_records: group.brand_b,
            message,
        })
    }

    fn is_brand_a(&self, brand: &str) -> bool {
        brand.trim().eq_ignore_ascii_case(&self.brand_a)
    }

    fn is_brand_b(&self, brand: &str) -> bool {
        brand.trim().eq_ignore_ascii_case(&self.brand_b)
    }
}

impl Default for CrossBrandComparison {
    fn default() -> Self {
        Self::new("TMH", "Raymond")
    }
}

fn cost_centers(rows: &[UnifiedFinancialRow]) -> BTreeSet<&str> {
    rows.iter().map(|r| r.unified_cost_center.as_str()).collect()
}

// ============================================================================
// TESTS
// ============================================================================
