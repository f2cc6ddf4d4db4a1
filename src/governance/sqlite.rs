// SQLite governance tables
//
// Layout:
//   account_mappings      one row per source_account_name
//   cost_center_mappings  one row per source_cost_center
//   vendor_rules          single row, rules document as JSON
//   events                audit trail
//
// Snapshots are read inside one transaction; every mutation commits together
// with its event or not at all.

use super::{build_manual_merge, build_override, Event, GovernanceSnapshot, GovernanceStore};
use crate::entities::{AccountMapping, AccountMappings, CostCenterMapping, CostCenterMappings};
use crate::error::Result;
use crate::rules::{ManualMergeRule, OverrideRule, VendorRules};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::path::Path;
use tracing::debug;

pub struct SqliteGovernanceStore {
    conn: Connection,
}

impl SqliteGovernanceStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        setup_database(&conn)?;
        debug!(path = ?path.as_ref(), "governance database opened");
        Ok(SqliteGovernanceStore { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(SqliteGovernanceStore { conn })
    }

    /// Run `write` and record `event` in one transaction
    fn commit_with_event<T>(&self, event: &Event, write: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = write(&*tx)?;
        insert_event(&tx, event)?;
        tx.commit()?;
        Ok(value)
    }

    fn update_rules(&self, event: &Event, update: impl FnOnce(&mut VendorRules)) -> Result<()> {
        self.commit_with_event(event, |conn| {
            let mut rules = load_vendor_rules(conn)?;
            update(&mut rules);
            store_vendor_rules(conn, &rules)
        })
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS account_mappings (
            source_account_name TEXT PRIMARY KEY,
            unified_account_name TEXT NOT NULL,
            unified_account_number TEXT NOT NULL,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cost_center_mappings (
            source_cost_center TEXT PRIMARY KEY,
            unified_cost_center TEXT NOT NULL,
            unified_cost_center_name TEXT NOT NULL,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS vendor_rules (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            rules TEXT NOT NULL,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// TABLE HELPERS
// ============================================================================

fn load_account_mappings(conn: &Connection) -> Result<AccountMappings> {
    let mut stmt = conn.prepare(
        "SELECT source_account_name, unified_account_name, unified_account_number
         FROM account_mappings",
    )?;

    let mappings = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                AccountMapping {
                    unified_account_name: row.get(1)?,
                    unified_account_number: row.get(2)?,
                },
            ))
        })?
        .collect::<std::result::Result<AccountMappings, _>>()?;

    Ok(mappings)
}

fn load_cost_center_mappings(conn: &Connection) -> Result<CostCenterMappings> {
    let mut stmt = conn.prepare(
        "SELECT source_cost_center, unified_cost_center, unified_cost_center_name
         FROM cost_center_mappings",
    )?;

    let mappings = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                CostCenterMapping {
                    unified_cost_center: row.get(1)?,
                    unified_cost_center_name: row.get(2)?,
                },
            ))
        })?
        .collect::<std::result::Result<CostCenterMappings, _>>()?;

    Ok(mappings)
}

/// Defaults until rules are first saved
fn load_vendor_rules(conn: &Connection) -> Result<VendorRules> {
    let document: Option<String> = conn
        .query_row("SELECT rules FROM vendor_rules WHERE id = 1", [], |row| row.get(0))
        .optional()?;

    match document {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(VendorRules::default()),
    }
}

fn store_vendor_rules(conn: &Connection, rules: &VendorRules) -> Result<()> {
    conn.execute(
        "INSERT INTO vendor_rules (id, rules, updated_at) VALUES (1, ?1, CURRENT_TIMESTAMP)
         ON CONFLICT(id) DO UPDATE SET rules = excluded.rules, updated_at = CURRENT_TIMESTAMP",
        params![serde_json::to_string(rules)?],
    )?;
    Ok(())
}

fn upsert_account_mapping(conn: &Connection, key: &str, mapping: &AccountMapping) -> Result<()> {
    conn.execute(
        "INSERT INTO account_mappings (source_account_name, unified_account_name, unified_account_number)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(source_account_name) DO UPDATE SET
            unified_account_name = excluded.unified_account_name,
            unified_account_number = excluded.unified_account_number,
            updated_at = CURRENT_TIMESTAMP",
        params![key, mapping.unified_account_name, mapping.unified_account_number],
    )?;
    Ok(())
}

fn upsert_cost_center_mapping(conn: &Connection, key: &str, mapping: &CostCenterMapping) -> Result<()> {
    conn.execute(
        "INSERT INTO cost_center_mappings (source_cost_center, unified_cost_center, unified_cost_center_name)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(source_cost_center) DO UPDATE SET
            unified_cost_center = excluded.unified_cost_center,
            unified_cost_center_name = excluded.unified_cost_center_name,
            updated_at = CURRENT_TIMESTAMP",
        params![key, mapping.unified_cost_center, mapping.unified_cost_center_name],
    )?;
    Ok(())
}

/// Insert event into audit trail
fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

fn load_events(conn: &Connection) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         ORDER BY id ASC",
    )?;

    let events = stmt
        .query_map([], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e)))?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e)))?,
                actor: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(events)
}

// ============================================================================
// STORE CONTRACT
// ============================================================================

impl GovernanceStore for SqliteGovernanceStore {
    fn snapshot(&self) -> Result<GovernanceSnapshot> {
        let tx = self.conn.unchecked_transaction()?;
        let snapshot = GovernanceSnapshot {
            account_mappings: load_account_mappings(&tx)?,
            cost_center_mappings: load_cost_center_mappings(&tx)?,
            vendor_rules: load_vendor_rules(&tx)?,
        };
        tx.commit()?;
        Ok(snapshot)
    }

    fn put_account_mapping(&self, source_account_name: &str, mapping: AccountMapping, actor: &str) -> Result<()> {
        let key = source_account_name.trim();
        let event = Event::new("account_mapping_saved", "account_mapping", key, json!(mapping), actor);
        self.commit_with_event(&event, |conn| upsert_account_mapping(conn, key, &mapping))
    }

    fn remove_account_mapping(&self, source_account_name: &str, actor: &str) -> Result<bool> {
        let key = source_account_name.trim();
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute(
            "DELETE FROM account_mappings WHERE source_account_name = ?1",
            params![key],
        )? > 0;
        if removed {
            insert_event(
                &tx,
                &Event::new("account_mapping_removed", "account_mapping", key, json!({}), actor),
            )?;
        }
        tx.commit()?;
        Ok(removed)
    }

    fn replace_account_mappings(&self, mappings: AccountMappings, actor: &str) -> Result<()> {
        let event = Event::new(
            "account_mappings_replaced",
            "account_mapping",
            "*",
            json!({ "count": mappings.len() }),
            actor,
        );
        self.commit_with_event(&event, |conn| {
            conn.execute("DELETE FROM account_mappings", [])?;
            for (key, mapping) in &mappings {
                upsert_account_mapping(conn, key.trim(), mapping)?;
            }
            Ok(())
        })
    }

    fn put_cost_center_mapping(&self, source_cost_center: &str, mapping: CostCenterMapping, actor: &str) -> Result<()> {
        let key = source_cost_center.trim();
        let event = Event::new(
            "cost_center_mapping_saved",
            "cost_center_mapping",
            key,
            json!(mapping),
            actor,
        );
        self.commit_with_event(&event, |conn| upsert_cost_center_mapping(conn, key, &mapping))
    }

    fn remove_cost_center_mapping(&self, source_cost_center: &str, actor: &str) -> Result<bool> {
        let key = source_cost_center.trim();
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute(
            "DELETE FROM cost_center_mappings WHERE source_cost_center = ?1",
            params![key],
        )? > 0;
        if removed {
            insert_event(
                &tx,
                &Event::new("cost_center_mapping_removed", "cost_center_mapping", key, json!({}), actor),
            )?;
        }
        tx.commit()?;
        Ok(removed)
    }

    fn replace_cost_center_mappings(&self, mappings: CostCenterMappings, actor: &str) -> Result<()> {
        let event = Event::new(
            "cost_center_mappings_replaced",
            "cost_center_mapping",
            "*",
            json!({ "count": mappings.len() }),
            actor,
        );
        self.commit_with_event(&event, |conn| {
            conn.execute("DELETE FROM cost_center_mappings", [])?;
            for (key, mapping) in &mappings {
                upsert_cost_center_mapping(conn, key.trim(), mapping)?;
            }
            Ok(())
        })
    }

    fn save_vendor_rules(&self, mut rules: VendorRules, actor: &str) -> Result<()> {
        rules.validate()?;
        rules.touch(actor);

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
        self.commit_with_event(&event, |conn| store_vendor_rules(conn, &rules))
    }

    fn add_override(
        &self,
        unified_name: &str,
        brand_a_name: &str,
        brand_b_name: &str,
        actor: &str,
    ) -> Result<OverrideRule> {
        let rule = build_override(unified_name, brand_a_name, brand_b_name, actor);
        let event = Event::new(
            "vendor_override_added",
            "vendor_override",
            &rule.key(),
            json!({ "unified_name": rule.unified_name }),
            actor,
        );

        self.update_rules(&event, |rules| {
            rules.upsert_override(rule.clone());
            rules.touch(actor);
        })?;
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
        let event = Event::new(
            "vendor_manual_merge_added",
            "vendor_manual_merge",
            &rule.key(),
            json!({ "vendor_ids": rule.vendor_ids, "unified_name": rule.unified_name }),
            actor,
        );

        self.update_rules(&event, |rules| {
            rules.upsert_manual_merge(rule.clone());
            rules.touch(actor);
        })?;
        Ok(rule)
    }

    fn events(&self) -> Result<Vec<Event>> {
        load_events(&self.conn)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarmonizeError;

    fn create_test_store() -> SqliteGovernanceStore {
        SqliteGovernanceStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_empty_store_has_default_rules() {
        let store = create_test_store();
        let snapshot = store.snapshot().unwrap();

        assert!(snapshot.account_mappings.is_empty());
        assert!(snapshot.cost_center_mappings.is_empty());
        assert_eq!(snapshot.vendor_rules, VendorRules::default());
    }

    #[test]
    fn test_mapping_round_trip_with_events() {
        let store = create_test_store();
        store
            .put_account_mapping(" Rent ", AccountMapping::new("Occupancy", "6500"), "maya")
            .unwrap();
        store
            .put_account_mapping("Rent", AccountMapping::new("Occupancy Cost", "6510"), "maya")
            .unwrap();
        store
            .put_cost_center_mapping("", CostCenterMapping::new("CC-000", "Unassigned"), "maya")
            .unwrap();

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.account_mappings.len(), 1);
        assert_eq!(snapshot.account_mappings["Rent"].unified_account_number, "6510");
        assert_eq!(snapshot.cost_center_mappings[""].unified_cost_center, "CC-000");

        let events = store.events().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event_type, "account_mapping_saved");
        assert_eq!(events[0].entity_id, "Rent");
        assert_eq!(events[0].actor, "maya");
    }

    #[test]
    fn test_remove_missing_key_writes_no_event() {
        let store = create_test_store();
        assert!(!store.remove_cost_center_mapping("CC10", "maya").unwrap());
        assert!(store.events().unwrap().is_empty());
    }

    #[test]
    fn test_replace_table() {
        let store = create_test_store();
        store
            .put_account_mapping("Old", AccountMapping::new("Old", "1"), "maya")
            .unwrap();

        let mut replacement = AccountMappings::new();
        replacement.insert("Rent".to_string(), AccountMapping::new("Occupancy", "6500"));
        replacement.insert("Travel".to_string(), AccountMapping::new("Travel", "7200"));
        store.replace_account_mappings(replacement, "maya").unwrap();

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.account_mappings.len(), 2);
        assert!(!snapshot.account_mappings.contains_key("Old"));
    }

    #[test]
    fn test_rules_persist_and_validate() {
        let store = create_test_store();

        let bad = VendorRules {
            confidence_threshold: -5,
            ..VendorRules::default()
        };
        assert!(matches!(
            store.save_vendor_rules(bad, "maya"),
            Err(HarmonizeError::InvalidThreshold(-5))
        ));

        let good = VendorRules {
            confidence_threshold: 92,
            name_weight: 0.6,
            address_weight: 0.4,
            ..VendorRules::default()
        };
        store.save_vendor_rules(good, "maya").unwrap();

        let rules = store.snapshot().unwrap().vendor_rules;
        assert_eq!(rules.confidence_threshold, 92);
        assert_eq!(rules.name_weight, 0.6);
        assert_eq!(rules.updated_by.as_deref(), Some("maya"));
    }

    #[test]
    fn test_override_and_merge_keep_existing_rules() {
        let store = create_test_store();
        let rules = VendorRules {
            confidence_threshold: 90,
            ..VendorRules::default()
        };
        store.save_vendor_rules(rules, "maya").unwrap();

        store.add_override("Acme", "ACME Corp", "Acme Co", "maya").unwrap();
        store.add_override("Acme Inc", "ACME Corp", "Acme Co", "maya").unwrap();
        store
            .add_manual_merge(&["V0009", "V0003"], "Northwind", "", "", "maya")
            .unwrap();

        let rules = store.snapshot().unwrap().vendor_rules;
        assert_eq!(rules.confidence_threshold, 90);
        assert_eq!(rules.overrides.len(), 1);
        assert_eq!(rules.overrides[0].unified_name, "Acme Inc");
        assert_eq!(rules.manual_merges[0].vendor_ids, vec!["V0003".to_string(), "V0009".to_string()]);
        assert_eq!(store.events().unwrap().len(), 4);
    }

    #[test]
    fn test_file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("governance.db");

        {
            let store = SqliteGovernanceStore::open(&path).unwrap();
            store
                .put_account_mapping("Rent", AccountMapping::new("Occupancy", "6500"), "maya")
                .unwrap();
        }

        let store = SqliteGovernanceStore::open(&path).unwrap();
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.account_mappings["Rent"].unified_account_name, "Occupancy");
    }
}
