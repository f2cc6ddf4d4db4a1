// In-memory governance tables
//
// One RwLock guards the tables and the audit trail together, so a snapshot
// is a plain clone under the read lock. Handles are cheap to clone and share
// the same tables.

use super::{build_manual_merge, build_override, Event, GovernanceSnapshot, GovernanceStore};
use crate::entities::{AccountMapping, AccountMappings, CostCenterMapping, CostCenterMappings};
use crate::error::{HarmonizeError, Result};
use crate::rules::{ManualMergeRule, OverrideRule, VendorRules};
use serde_json::json;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct State {
    tables: GovernanceSnapshot,
    events: Vec<Event>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryGovernanceStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryGovernanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from existing tables (e.g. loaded from CSV)
    pub fn with_snapshot(snapshot: GovernanceSnapshot) -> Self {
        InMemoryGovernanceStore {
            state: Arc::new(RwLock::new(State {
                tables: snapshot,
                events: Vec::new(),
            })),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| HarmonizeError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| HarmonizeError::LockPoisoned)
    }
}

impl GovernanceStore for InMemoryGovernanceStore {
    fn snapshot(&self) -> Result<GovernanceSnapshot> {
        Ok(self.read()?.tables.clone())
    }

    fn put_account_mapping(&self, source_account_name: &str, mapping: AccountMapping, actor: &str) -> Result<()> {
        let key = source_account_name.trim().to_string();
        let mut state = self.write()?;
        let event = Event::new(
            "account_mapping_saved",
            "account_mapping",
            &key,
            json!(mapping),
            actor,
        );
        state.tables.account_mappings.insert(key, mapping);
        state.events.push(event);
        Ok(())
    }

    fn remove_account_mapping(&self, source_account_name: &str, actor: &str) -> Result<bool> {
        let key = source_account_name.trim();
        let mut state = self.write()?;
        let removed = state.tables.account_mappings.remove(key).is_some();
        if removed {
            state
                .events
                .push(Event::new("account_mapping_removed", "account_mapping", key, json!({}), actor));
        }
        Ok(removed)
    }

    fn replace_account_mappings(&self, mappings: AccountMappings, actor: &str) -> Result<()> {
        let mut state = self.write()?;
        let event = Event::new(
            "account_mappings_replaced",
            "account_mapping",
            "*",
            json!({ "count": mappings.len() }),
            actor,
        );
        state.tables.account_mappings = mappings
            .into_iter()
            .map(|(k, v)| (k.trim().to_string(), v))
            .collect();
        state.events.push(event);
        Ok(())
    }

    fn put_cost_center_mapping(&self, source_cost_center: &str, mapping: CostCenterMapping, actor: &str) -> Result<()> {
        let key = source_cost_center.trim().to_string();
        let mut state = self.write()?;
        let event = Event::new(
            "cost_center_mapping_saved",
            "cost_center_mapping",
            &key,
            json!(mapping),
            actor,
        );
        state.tables.cost_center_mappings.insert(key, mapping);
        state.events.push(event);
        Ok(())
    }

    fn remove_cost_center_mapping(&self, source_cost_center: &str, actor: &str) -> Result<bool> {
        let key = source_cost_center.trim();
        let mut state = self.write()?;
        let removed = state.tables.cost_center_mappings.remove(key).is_some();
        if removed {
            state.events.push(Event::new(
                "cost_center_mapping_removed",
                "cost_center_mapping",
                key,
                json!({}),
                actor,
            ));
        }
        Ok(removed)
    }

    fn replace_cost_center_mappings(&self, mappings: CostCenterMappings, actor: &str) -> Result<()> {
        let mut state = self.write()?;
        let event = Event::new(
            "cost_center_mappings_replaced",
            "cost_center_mapping",
            "*",
            json!({ "count": mappings.len() }),
            actor,
        );
        state.tables.cost_center_mappings = mappings
            .into_iter()
            .map(|(k, v)| (k.trim().to_string(), v))
            .collect();
        state.events.push(event);
        Ok(())
    }

    fn save_vendor_rules(&self, mut rules: VendorRules, actor: &str) -> Result<()> {
        rules.validate()?;
        rules.touch(actor);

        let mut state = self.write()?;
        let event = Event::new(
            "vendor_rules_saved",
            "vendor_rules",
            "vendor_rules",
            json!({
                "confidence_threshold": rules.confidence_threshold,
                "name_weight": rules.name_weight,
                "address_weight": rules.address_weight,
            }),
            actor,
        );
        state.tables.vendor_rules = rules;
        state.events.push(event);
        Ok(())
    }

    fn add_override(
        &self,
        unified_name: &str,
        brand_a_name: &str,
        brand_b_name: &str,
        actor: &str,
    ) -> Result<OverrideRule> {
        let rule = build_override(unified_name, brand_a_name, brand_b_name, actor);

        let mut state = self.write()?;
        state.tables.vendor_rules.upsert_override(rule.clone());
        state.tables.vendor_rules.touch(actor);
        state.events.push(Event::new(
            "vendor_override_added",
            "vendor_override",
            &rule.key(),
            json!({ "unified_name": rule.unified_name }),
            actor,
        ));
        Ok(rule)
    }

    fn add_manual_merge(
        &self,
        vendor_ids: &[&str],
        unified_name: &str,
        unified_address: &str,
        unified_phone: &str,
        actor: &str,
    ) -> Result<ManualMergeRule> {
        let rule = build_manual_merge(vendor_ids, unified_name, unified_address, unified_phone, actor)?;

        let mut state = self.write()?;
        state.tables.vendor_rules.upsert_manual_merge(rule.clone());
        state.tables.vendor_rules.touch(actor);
        state.events.push(Event::new(
            "vendor_manual_merge_added",
            "vendor_manual_merge",
            &rule.key(),
            json!({ "vendor_ids": rule.vendor_ids, "unified_name": rule.unified_name }),
            actor,
        ));
        Ok(rule)
    }

    fn events(&self) -> Result<Vec<Event>> {
        Ok(self.read()?.events.clone())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_put_and_remove_account_mapping() {
        let store = InMemoryGovernanceStore::new();
        store
            .put_account_mapping(" Rent ", AccountMapping::new("Occupancy", "6500"), "maya")
            .unwrap();

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.account_mappings["Rent"].unified_account_number, "6500");

        assert!(store.remove_account_mapping("Rent", "maya").unwrap());
        assert!(!store.remove_account_mapping("Rent", "maya").unwrap());
        assert!(store.snapshot().unwrap().account_mappings.is_empty());
        assert_eq!(store.events().unwrap().len(), 2);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let store = InMemoryGovernanceStore::new();
        let before = store.snapshot().unwrap();

        store
            .put_cost_center_mapping("CC10", CostCenterMapping::new("CC-100", "Operations"), "maya")
            .unwrap();

        assert!(before.cost_center_mappings.is_empty());
        assert_eq!(store.snapshot().unwrap().cost_center_mappings.len(), 1);
    }

    #[test]
    fn test_invalid_threshold_rejected_and_tables_untouched() {
        let store = InMemoryGovernanceStore::new();
        let rules = VendorRules {
            confidence_threshold: 150,
            ..VendorRules::default()
        };

        assert!(matches!(
            store.save_vendor_rules(rules, "maya"),
            Err(HarmonizeError::InvalidThreshold(150))
        ));
        assert_eq!(store.snapshot().unwrap().vendor_rules.confidence_threshold, 85);
        assert!(store.events().unwrap().is_empty());
    }

    #[test]
    fn test_save_vendor_rules_stamps_actor() {
        let store = InMemoryGovernanceStore::new();
        let rules = VendorRules {
            confidence_threshold: 90,
            ..VendorRules::default()
        };
        store.save_vendor_rules(rules, "maya").unwrap();

        let saved = store.snapshot().unwrap().vendor_rules;
        assert_eq!(saved.confidence_threshold, 90);
        assert_eq!(saved.updated_by.as_deref(), Some("maya"));
        assert!(saved.last_updated.is_some());
    }

    #[test]
    fn test_override_replaces_same_pair() {
        let store = InMemoryGovernanceStore::new();
        store.add_override("Acme", "ACME Corp", "Acme Co", "maya").unwrap();
        store.add_override("Acme Inc", "ACME Corp", "Acme Co", "maya").unwrap();

        let rules = store.snapshot().unwrap().vendor_rules;
        assert_eq!(rules.overrides.len(), 1);
        assert_eq!(rules.overrides[0].unified_name, "Acme Inc");
    }

    #[test]
    fn test_manual_merge_stored_sorted() {
        let store = InMemoryGovernanceStore::new();
        let rule = store
            .add_manual_merge(&["V0004", "V0002"], "Northwind", "1 Dock Rd", "", "maya")
            .unwrap();

        assert_eq!(rule.surviving_id(), Some("V0002"));
        let rules = store.snapshot().unwrap().vendor_rules;
        assert_eq!(rules.manual_merges[0].key(), "V0002||V0004");

        assert!(store.add_manual_merge(&["V0001"], "x", "", "", "maya").is_err());
        assert_eq!(store.snapshot().unwrap().vendor_rules.manual_merges.len(), 1);
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let store = InMemoryGovernanceStore::new();

        let writers: Vec<_> = (0..4)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    for j in 0..25 {
                        store
                            .put_account_mapping(
                                &format!("Account {}-{}", i, j),
                                AccountMapping::new("Unified", "1000"),
                                "writer",
                            )
                            .unwrap();
                    }
                })
            })
            .collect();

        for _ in 0..10 {
            let snapshot = store.snapshot().unwrap();
            assert!(snapshot.account_mappings.len() <= 100);
        }

        for handle in writers {
            handle.join().unwrap();
        }

        assert_eq!(store.snapshot().unwrap().account_mappings.len(), 100);
        assert_eq!(store.events().unwrap().len(), 100);
    }
}
