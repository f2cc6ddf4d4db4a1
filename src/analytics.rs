// 📊 Analytics - Readiness, variance breakdown, submissions, vendor ranking
//
// Every figure is derived on demand from the inputs handed in; nothing here
// is cached or persisted.

use crate::entities::{RawFinancialRow, UnifiedVendorRow};
use crate::governance::GovernanceSnapshot;
use crate::reconciliation::{ReconciliationEngine, VarianceRecord};
use crate::similarity::vendor_quality_score;
use crate::workflow::{SubmissionLedger, SubmissionStatus};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Vendors listed in the harmonization ranking
pub const TOP_VENDOR_LIMIT: usize = 10;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ============================================================================
// DATA QUALITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityAnalytics {
    pub total_raw_rows: usize,
    pub fully_mapped_rows: usize,
    pub unmapped_rows: usize,

    /// fully_mapped / total × 100, one decimal; 0.0 with no rows
    pub readiness_percent: f64,
}

impl DataQualityAnalytics {
    pub fn compute<'r, I>(engine: &ReconciliationEngine<'_>, rows: I) -> Self
    where
        I: IntoIterator<Item = &'r RawFinancialRow>,
    {
        let mut total = 0;
        let mut fully_mapped = 0;

        for row in rows {
            total += 1;
            if engine.classify(row).is_fully_mapped() {
                fully_mapped += 1;
            }
        }

        let readiness_percent = if total > 0 {
            round1(fully_mapped as f64 / total as f64 * 100.0)
        } else {
            0.0
        };

        DataQualityAnalytics {
            total_raw_rows: total,
            fully_mapped_rows: fully_mapped,
            unmapped_rows: total - fully_mapped,
            readiness_percent,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} rows, {} fully mapped, {} unmapped ({:.1}% ready)",
            self.total_raw_rows, self.fully_mapped_rows, self.unmapped_rows, self.readiness_percent
        )
    }
}

// ============================================================================
// VARIANCES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VarianceAnalytics {
    pub total_variances: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_brand: BTreeMap<String, usize>,
}

impl VarianceAnalytics {
    pub fn from_variances(variances: &[VarianceRecord]) -> Self {
        let mut analytics = VarianceAnalytics {
            total_variances: variances.len(),
            ..Default::default()
        };

        for variance in variances {
            *analytics
                .by_type
                .entry(variance.variance_type.as_str().to_string())
                .or_default() += 1;
            *analytics.by_brand.entry(variance.brand.clone()).or_default() += 1;
        }

        analytics
    }
}

// ============================================================================
// SUBMISSIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubmissionAnalytics {
    pub total_submissions: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_brand: BTreeMap<String, usize>,

    /// Mean hours from submission to approval, one decimal
    pub avg_time_to_approve: Option<f64>,
}

impl SubmissionAnalytics {
    pub fn compute(ledger: &SubmissionLedger, brand: Option<&str>) -> Self {
        let submissions = ledger.submissions(brand);

        // first approved row per submission carries the approval time
        let mut approved_at = HashMap::new();
        for row in ledger.approved_rows(brand) {
            approved_at.entry(row.submission_id.as_str()).or_insert(row.approved_at);
        }

        let mut analytics = SubmissionAnalytics {
            total_submissions: submissions.len(),
            ..Default::default()
        };
        let mut approval_hours = Vec::new();

        for submission in &submissions {
            *analytics
                .by_status
                .entry(submission.status.as_str().to_string())
                .or_default() += 1;
            *analytics.by_brand.entry(submission.brand.clone()).or_default() += 1;

            if submission.status != SubmissionStatus::Approved {
                continue;
            }
            if let Some(at) = approved_at.get(submission.submission_id.as_str()) {
                let hours = (*at - submission.timestamp).num_milliseconds() as f64 / 3_600_000.0;
                if hours > 0.0 {
                    approval_hours.push(hours);
                }
            }
        }

        if !approval_hours.is_empty() {
            let mean = approval_hours.iter().sum::<f64>() / approval_hours.len() as f64;
            analytics.avg_time_to_approve = Some(round1(mean));
        }

        analytics
    }
}

// ============================================================================
// MAPPING IMPACT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingImpact {
    pub total_account_mappings: usize,
    pub total_cost_center_mappings: usize,
    pub current_variances: usize,

    /// Distinct non-empty source account names across all brands
    pub total_source_accounts: usize,
}

impl MappingImpact {
    pub fn compute(snapshot: &GovernanceSnapshot, rows: &[RawFinancialRow]) -> Self {
        let source_accounts: BTreeSet<&str> = rows
            .iter()
            .map(|r| r.account_key())
            .filter(|name| !name.is_empty())
            .collect();

        MappingImpact {
            total_account_mappings: snapshot.account_mappings.len(),
            total_cost_center_mappings: snapshot.cost_center_mappings.len(),
            current_variances: snapshot.reconciliation().variances(rows).len(),
            total_source_accounts: source_accounts.len(),
        }
    }
}

// ============================================================================
// VENDOR HARMONIZATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorScore {
    pub vendor_name: String,
    pub confidence_score: u32,
    pub is_harmonized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorHarmonizationAnalytics {
    pub harmonized_count: usize,
    pub unmatched_count: usize,

    /// Highest quality scores first; ties keep registry order
    pub vendor_confidence_scores: Vec<VendorScore>,
}

impl VendorHarmonizationAnalytics {
    pub fn compute(rows: &[UnifiedVendorRow], brand_a: &str, brand_b: &str) -> Self {
        let mut harmonized_count = 0;
        let mut unmatched_count = 0;
        let mut scores = Vec::with_capacity(rows.len());

        for row in rows {
            let brands: Vec<&str> = row.source_brands.split(',').map(|b| b.trim()).collect();
            let present = [brand_a, brand_b]
                .iter()
                .filter(|b| brands.contains(*b))
                .count();
            let is_harmonized = present > 1;

            if is_harmonized {
                harmonized_count += 1;
            } else {
                unmatched_count += 1;
            }

            scores.push(VendorScore {
                vendor_name: row.unified_name.clone(),
                confidence_score: vendor_quality_score(
                    &row.unified_name,
                    &row.unified_address,
                    &row.unified_phone,
                    is_harmonized,
                    row.confidence,
                ),
                is_harmonized,
            });
        }

        // sort_by is stable
        scores.sort_by(|a, b| b.confidence_score.cmp(&a.confidence_score));
        scores.truncate(TOP_VENDOR_LIMIT);

        VendorHarmonizationAnalytics {
            harmonized_count,
            unmatched_count,
            vendor_confidence_scores: scores,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
