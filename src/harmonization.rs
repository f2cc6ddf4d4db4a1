// 🔍 Harmonization Engine - One canonical vendor registry from two brand ledgers
//
// Pipeline (order is load-bearing):
//   1. Brand A rows in file order, then brand B rows in file order
//   2. Override pairs attach directly (confidence 100, no scoring)
//   3. Otherwise score against every unified record, strict ">" keeps the
//      first-encountered record on ties
//   4. Attach when best >= threshold, else allocate the next sequential id
//   5. Manual merges
//   6. Automatic merge sweep (same name, or same address + phone)
//   7. Export rows
//
// Every lookup is linear, so a run is O(n²) over the combined vendor count.
// Fine for a few thousand vendors per brand; past that this needs blocking
// (phonetic buckets or similar) before the scan. Any index must still hand
// candidates back in registry order so ties resolve the same way.
//
// Callers must pass stable, reproducible ordering: "first seen wins" decides
// which raw record becomes the representative.

use crate::entities::{RawVendorRecord, UnifiedVendorRecord, UnifiedVendorRow};
use crate::normalize::{normalize_address, normalize_name, normalize_phone, strip_street_suffixes};
use crate::rules::VendorRules;
use crate::similarity::token_set_ratio;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

// ============================================================================
// MATCH OUTCOME
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    /// Attached through an override pair
    Override,

    /// Attached through the blended fuzzy score
    Fuzzy,
}

/// Best candidate in the registry for one raw record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MatchOutcome {
    /// Registry index of the best record (None: registry empty or all scored 0)
    index: Option<usize>,

    score: u32,

    kind: MatchKind,
}

// ============================================================================
// HARMONIZATION REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarmonizationReport {
    /// Export rows, one per surviving unified record
    pub rows: Vec<UnifiedVendorRow>,

    /// Surviving unified records (same order as rows)
    pub records: Vec<UnifiedVendorRecord>,

    /// Raw records consumed (A + B)
    pub raw_count: usize,

    /// Raw records attached via override pairs
    pub override_matches: usize,

    /// Raw records attached via fuzzy score
    pub fuzzy_matches: usize,

    pub manual_merges_applied: usize,
    pub auto_merges_applied: usize,
}

impl HarmonizationReport {
    /// Records with more than one contributing brand
    pub fn harmonized_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_harmonized()).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "Harmonized {} raw vendors into {} unified vendors ({} cross-brand, {} override matches, {} fuzzy matches, {} manual merges, {} auto merges)",
            self.raw_count,
            self.rows.len(),
            self.harmonized_count(),
            self.override_matches,
            self.fuzzy_matches,
            self.manual_merges_applied,
            self.auto_merges_applied
        )
    }
}

// ============================================================================
// HARMONIZATION ENGINE
// ============================================================================

pub struct HarmonizationEngine {
    /// Tag for source A rows without their own tag (default: "TMH")
    pub brand_a: String,

    /// Tag for source B rows without their own tag (default: "Raymond")
    pub brand_b: String,
}

impl HarmonizationEngine {
    pub fn new(brand_a: &str, brand_b: &str) -> Self {
        HarmonizationEngine {
            brand_a: brand_a.to_string(),
            brand_b: brand_b.to_string(),
        }
    }

    /// Build the unified registry from both brand ledgers
    ///
    /// Never fails: missing ledgers are empty slices, missing fields are
    /// empty strings.
    pub fn harmonize(
        &self,
        source_a: &[RawVendorRecord],
        source_b: &[RawVendorRecord],
        rules: &VendorRules,
    ) -> HarmonizationReport {
        let mut registry: Vec<UnifiedVendorRecord> = Vec::new();
        let mut next_id = 1;
        let mut override_matches = 0;
        let mut fuzzy_matches = 0;

        let tagged = source_a
            .iter()
            .map(|raw| (raw, self.brand_a.as_str()))
            .chain(source_b.iter().map(|raw| (raw, self.brand_b.as_str())));

        for (raw, default_brand) in tagged {
            let brand = if raw.source_brand.trim().is_empty() {
                default_brand
            } else {
                raw.source_brand.trim()
            };

            let normalized = normalize_name(&raw.name);
            let phone = normalize_phone(&raw.phone);
            let outcome = Self::find_match(&registry, &raw.name, &normalized, &raw.address, rules);

            match outcome.index {
                Some(index) if i64::from(outcome.score) >= rules.confidence_threshold => {
                    let record = &mut registry[index];
                    record.add_brand(brand);
                    record.confidence = outcome.score;

                    match outcome.kind {
                        MatchKind::Override => override_matches += 1,
                        MatchKind::Fuzzy => fuzzy_matches += 1,
                    }

                    debug!(
                        vendor = %raw.name,
                        brand,
                        unified_id = %record.id,
                        score = outcome.score,
                        kind = ?outcome.kind,
                        "attached to unified vendor"
                    );
                }
                _ => {
                    let confidence = if outcome.index.is_some() { outcome.score } else { 100 };
                    let id = UnifiedVendorRecord::format_id(next_id);
                    next_id += 1;

                    debug!(vendor = %raw.name, brand, unified_id = %id, confidence, "allocated unified vendor");

                    registry.push(UnifiedVendorRecord::new(
                        id,
                        &raw.name,
                        &raw.address,
                        &phone,
                        brand,
                        confidence,
                    ));
                }
            }
        }

        let (registry, manual_merges_applied) = Self::apply_manual_merges(registry, rules);
        let (registry, auto_merges_applied) = Self::apply_auto_merges(registry);

        let rows = registry
            .iter()
            .map(|record| UnifiedVendorRow::from_record(record, &self.brand_a, &self.brand_b))
            .collect();

        let report = HarmonizationReport {
            rows,
            records: registry,
            raw_count: source_a.len() + source_b.len(),
            override_matches,
            fuzzy_matches,
            manual_merges_applied,
            auto_merges_applied,
        };

        info!("{}", report.summary());
        report
    }

    /// Step 2 + 3: override pairs first, then the blended fuzzy score
    fn find_match(
        registry: &[UnifiedVendorRecord],
        raw_name: &str,
        normalized_name: &str,
        address: &str,
        rules: &VendorRules,
    ) -> MatchOutcome {
        for rule in rules.overrides.iter().filter(|rule| rule.matches(raw_name)) {
            if let Some(index) = registry.iter().position(|r| r.name == rule.unified_name) {
                return MatchOutcome {
                    index: Some(index),
                    score: 100,
                    kind: MatchKind::Override,
                };
            }
        }

        let candidate_address = normalize_address(address);
        let mut best = MatchOutcome {
            index: None,
            score: 0,
            kind: MatchKind::Fuzzy,
        };

        for (index, record) in registry.iter().enumerate() {
            let name_score = token_set_ratio(&record.normalized_name, normalized_name);
            let address_score = token_set_ratio(&normalize_address(&record.address), &candidate_address);
            let combined = blend(name_score, address_score, rules.name_weight, rules.address_weight);

            // strict: an equal score never displaces the earlier record
            if combined > best.score {
                best.index = Some(index);
                best.score = combined;
            }
        }

        best
    }

    /// Step 5: collapse each rule's ids into one record with the declared values
    ///
    /// The merged record takes the rule's first id and moves to the end of
    /// the registry.
    fn apply_manual_merges(
        mut registry: Vec<UnifiedVendorRecord>,
        rules: &VendorRules,
    ) -> (Vec<UnifiedVendorRecord>, usize) {
        let mut applied = 0;

        for rule in &rules.manual_merges {
            let Some(surviving_id) = rule.surviving_id() else {
                continue;
            };
            if rule.vendor_ids.len() < 2 {
                warn!(merge = %rule.key(), "manual merge names fewer than 2 vendors, skipped");
                continue;
            }

            let members: Vec<&UnifiedVendorRecord> = registry
                .iter()
                .filter(|r| rule.vendor_ids.contains(&r.id))
                .collect();

            if members.len() < 2 {
                warn!(
                    merge = %rule.key(),
                    found = members.len(),
                    "manual merge matches fewer than 2 live vendors, skipped"
                );
                continue;
            }

            let first = members[0];
            let name = rule.unified_name.clone().unwrap_or_else(|| first.name.clone());
            let address = rule.unified_address.clone().unwrap_or_else(|| first.address.clone());
            let phone = rule.unified_phone.clone().unwrap_or_else(|| first.phone.clone());

            let merged = UnifiedVendorRecord {
                id: surviving_id.to_string(),
                normalized_name: normalize_name(&name),
                name,
                address,
                phone,
                source_brands: union_brands(&members),
                confidence: 100,
            };

            debug!(merge = %rule.key(), survivor = %merged.id, members = members.len(), "manual merge applied");

            registry.retain(|r| !rule.vendor_ids.contains(&r.id));
            registry.push(merged);
            applied += 1;
        }

        (registry, applied)
    }

    /// Step 6: merge records sharing a name, or sharing address + phone
    ///
    /// Each sweep is seeded at the earliest unprocessed record and grows
    /// transitively: a later record joins if it matches any member already in
    /// the group. The seed keeps its id, name, address and phone. Untouched
    /// records keep their order; merged records follow in seed order.
    fn apply_auto_merges(registry: Vec<UnifiedVendorRecord>) -> (Vec<UnifiedVendorRecord>, usize) {
        let keys: Vec<MergeKey> = registry.iter().map(MergeKey::of).collect();
        let mut consumed = vec![false; registry.len()];
        let mut groups: Vec<Vec<usize>> = Vec::new();

        for seed in 0..registry.len() {
            if consumed[seed] {
                continue;
            }
            consumed[seed] = true;
            let mut group = vec![seed];

            loop {
                let mut grew = false;
                for candidate in (seed + 1)..registry.len() {
                    if consumed[candidate] {
                        continue;
                    }
                    if group.iter().any(|&member| keys[member].matches(&keys[candidate])) {
                        consumed[candidate] = true;
                        group.push(candidate);
                        grew = true;
                    }
                }
                if !grew {
                    break;
                }
            }

            if group.len() > 1 {
                group.sort_unstable();
                groups.push(group);
            }
        }

        if groups.is_empty() {
            return (registry, 0);
        }

        let mut in_group = vec![false; registry.len()];
        for &index in groups.iter().flatten() {
            in_group[index] = true;
        }

        let merged: Vec<UnifiedVendorRecord> = groups
            .iter()
            .map(|group| {
                let members: Vec<&UnifiedVendorRecord> = group.iter().map(|&i| &registry[i]).collect();
                let seed = members[0];

                debug!(survivor = %seed.id, members = members.len(), "automatic merge applied");

                UnifiedVendorRecord {
                    source_brands: union_brands(&members),
                    confidence: 100,
                    ..seed.clone()
                }
            })
            .collect();

        let applied = merged.len();
        let mut result: Vec<UnifiedVendorRecord> = registry
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !in_group[*index])
            .map(|(_, record)| record)
            .collect();
        result.extend(merged);

        (result, applied)
    }
}

impl Default for HarmonizationEngine {
    fn default() -> Self {
        Self::new("TMH", "Raymond")
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// floor(name_score * name_weight + address_score * address_weight), kept in 0-100
fn blend(name_score: u32, address_score: u32, name_weight: f64, address_weight: f64) -> u32 {
    let combined = (f64::from(name_score) * name_weight) + (f64::from(address_score) * address_weight);
    combined.floor().clamp(0.0, 100.0) as u32
}

/// Sorted union of the members' brands
fn union_brands(members: &[&UnifiedVendorRecord]) -> Vec<String> {
    members
        .iter()
        .flat_map(|r| r.source_brands.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Comparison keys for the automatic merge sweep
struct MergeKey {
    name: String,
    address: String,
    phone: String,
}

impl MergeKey {
    fn of(record: &UnifiedVendorRecord) -> Self {
        MergeKey {
            name: record.normalized_name.clone(),
            address: strip_street_suffixes(&normalize_address(&record.address)),
            phone: normalize_phone(&record.phone),
        }
    }

    fn matches(&self, other: &MergeKey) -> bool {
        let name_match = !self.name.is_empty() && self.name == other.name;
        let address_phone_match = !self.address.is_empty()
            && !self.phone.is_empty()
            && self.address == other.address
            && self.phone == other.phone;

        name_match || address_phone_match
    }
}

// ============================================================================
// TESTS
// ============================================================================
