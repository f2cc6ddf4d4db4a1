// Ledger Harmonize - Core Library
// Vendor harmonization + financial reconciliation across two brand ledgers,
// used by the CLI and by tests

pub mod analytics;
pub mod config;
pub mod entities;
pub mod error;
pub mod governance;
pub mod harmonization;
pub mod loader;
pub mod normalize;
pub mod reconciliation;
pub mod rules;
pub mod similarity;
pub mod variance;
pub mod workflow;

// Re-export commonly used types
pub use analytics::{
    DataQualityAnalytics, MappingImpact, SubmissionAnalytics, VarianceAnalytics,
    VendorHarmonizationAnalytics, VendorScore,
};
pub use config::AppConfig;
pub use entities::{
    AccountMapping, AccountMappings, ApprovedRow, CostCenterMapping, CostCenterMappings,
    RawFinancialRow, RawVendorRecord, SubmissionRow, UnifiedFinancialRow, UnifiedVendorRecord,
    UnifiedVendorRow, UNMAPPED,
};
pub use error::{HarmonizeError, Result};
pub use governance::{
    Event, GovernanceSnapshot, GovernanceStore, InMemoryGovernanceStore, SqliteGovernanceStore,
};
pub use harmonization::{HarmonizationEngine, HarmonizationReport, MatchKind};
pub use reconciliation::{
    aggregate_corporate_view, CorporateViewRow, DataQualityIssue, PreviewRow, PreviewSummary,
    ReconciliationEngine, SubmissionGate, VarianceRecord, VarianceType,
};
pub use rules::{ManualMergeRule, OverrideRule, VendorRules};
pub use similarity::{token_set_ratio, vendor_quality_score};
pub use variance::{CrossBrandComparison, CrossBrandVariance, CrossBrandVarianceType};
pub use workflow::{
    BrandWorkflow, Submission, SubmissionLedger, SubmissionOutcome, SubmissionStatus, Transition,
    WorkflowState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
