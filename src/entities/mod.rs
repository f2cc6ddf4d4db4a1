// Entity Models - vendor registry + brand ledgers
//
// Raw records are immutable snapshots read once per run.
// Unified records are recomputed from scratch every run; only their ids are
// meant to be stable, and only for identical ordered input.

pub mod ledger;
pub mod vendor;

pub use ledger::{
    parse_amount, AccountMapping, AccountMappings, ApprovedRow, CostCenterMapping,
    CostCenterMappings, RawFinancialRow, SubmissionRow, UnifiedFinancialRow, UNMAPPED,
};
pub use vendor::{RawVendorRecord, UnifiedVendorRecord, UnifiedVendorRow};
