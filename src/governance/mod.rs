// 🏛️ Governance Store - Mapping tables and vendor rules behind one contract
//
// Engines never see the store itself, only a GovernanceSnapshot: a consistent
// copy of every table taken at one instant. Writers on other threads can
// never show an engine a half-applied change.
//
// Every mutation is recorded as an Event ("every change is an event").

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryGovernanceStore;
pub use sqlite::SqliteGovernanceStore;

use crate::entities::{AccountMapping, AccountMappings, CostCenterMapping, CostCenterMappings};
use crate::error::{HarmonizeError, Result};
use crate::reconciliation::ReconciliationEngine;
use crate::rules::{ManualMergeRule, OverrideRule, VendorRules};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// SNAPSHOT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GovernanceSnapshot {
    pub account_mappings: AccountMappings,
    pub cost_center_mappings: CostCenterMappings,
    pub vendor_rules: VendorRules,
}

impl GovernanceSnapshot {
    /// SHA-256 over the canonical JSON form (maps are ordered by key)
    ///
    /// Two snapshots with the same tables give the same fingerprint.
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Reconciliation over this snapshot's mapping tables
    pub fn reconciliation(&self) -> ReconciliationEngine<'_> {
        ReconciliationEngine::new(&self.account_mappings, &self.cost_center_mappings)
    }
}

// ============================================================================
// AUDIT EVENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

// ============================================================================
// STORE CONTRACT
// ============================================================================

/// Mutable governance tables with atomic snapshot reads
///
/// Mapping keys are trimmed before they are stored; override names are kept
/// exactly as given since they match raw ledger text. `save_vendor_rules`,
/// `add_override` and `add_manual_merge` validate before writing; a rejected
/// write leaves the tables untouched.
pub trait GovernanceStore {
    /// Consistent copy of every table
    fn snapshot(&self) -> Result<GovernanceSnapshot>;

    fn put_account_mapping(&self, source_account_name: &str, mapping: AccountMapping, actor: &str) -> Result<()>;

    /// Ok(false) when the key did not exist
    fn remove_account_mapping(&self, source_account_name: &str, actor: &str) -> Result<bool>;

    /// Replace the whole table in one step
    fn replace_account_mappings(&self, mappings: AccountMappings, actor: &str) -> Result<()>;

    fn put_cost_center_mapping(&self, source_cost_center: &str, mapping: CostCenterMapping, actor: &str) -> Result<()>;

    fn remove_cost_center_mapping(&self, source_cost_center: &str, actor: &str) -> Result<bool>;

    fn replace_cost_center_mappings(&self, mappings: CostCenterMappings, actor: &str) -> Result<()>;

    /// Rejects thresholds outside [0, 100] and bad weights
    fn save_vendor_rules(&self, rules: VendorRules, actor: &str) -> Result<()>;

    /// Keyed by "brand_a_name||brand_b_name"; an existing pair is replaced
    fn add_override(
        &self,
        unified_name: &str,
        brand_a_name: &str,
        brand_b_name: &str,
        actor: &str,
    ) -> Result<OverrideRule>;

    /// Needs at least two ids; ids are stored sorted
    fn add_manual_merge(
        &self,
        vendor_ids: &[&str],
        unified_name: &str,
        unified_address: &str,
        unified_phone: &str,
        actor: &str,
    ) -> Result<ManualMergeRule>;

    /// Audit trail, oldest first
    fn events(&self) -> Result<Vec<Event>>;
}

// ============================================================================
// SHARED RULE BUILDERS
// ============================================================================

pub(crate) fn build_override(unified_name: &str, brand_a_name: &str, brand_b_name: &str, actor: &str) -> OverrideRule {
    OverrideRule {
        created_by: Some(actor.to_string()),
        created_at: Some(Utc::now()),
        ..OverrideRule::new(unified_name, brand_a_name, brand_b_name)
    }
}

pub(crate) fn build_manual_merge(
    vendor_ids: &[&str],
    unified_name: &str,
    unified_address: &str,
    unified_phone: &str,
    actor: &str,
) -> Result<ManualMergeRule> {
    let mut ids: Vec<&str> = vendor_ids.iter().map(|id| id.trim()).filter(|id| !id.is_empty()).collect();
    ids.sort_unstable();
    ids.dedup();

    if ids.len() < 2 {
        return Err(HarmonizeError::InvalidRule(format!(
            "manual merge needs at least 2 vendor ids, got {}",
            ids.len()
        )));
    }

    Ok(ManualMergeRule {
        merged_by: Some(actor.to_string()),
        merged_at: Some(Utc::now()),
        ..ManualMergeRule::new(&ids, unified_name, unified_address, unified_phone)
    })
}

// ============================================================================
// TESTS
// ============================================================================
