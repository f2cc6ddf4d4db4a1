// 🎯 Confidence Scorer - Token-set similarity + vendor quality ranking
//
// token_set_ratio is order-insensitive: both strings are split into word
// sets, the shared words are compared against each side's leftovers, and the
// best Indel similarity wins. Range 0-100.

use crate::normalize::normalize_name;
use rapidfuzz::distance::indel;
use std::collections::BTreeSet;

// ============================================================================
// TOKEN-SET SIMILARITY
// ============================================================================

/// Token-set similarity between two strings (0-100)
///
/// Example:
/// - `token_set_ratio("acme corp", "corp acme")` = 100 (same word set)
/// - `token_set_ratio("acme", "acme corp")` = 100 (one set contains the other)
/// - `token_set_ratio("acme corp", "acme corporation")` = 72
/// - `token_set_ratio("", "anything")` = 0
pub fn token_set_ratio(s1: &str, s2: &str) -> u32 {
    let p1 = normalize_name(s1);
    let p2 = normalize_name(s2);

    if p1.is_empty() || p2.is_empty() {
        return 0;
    }

    let tokens_a: BTreeSet<&str> = p1.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = p2.split_whitespace().collect();

    let intersection: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let diff_ab: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let diff_ba: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    // One side adds nothing beyond the shared words
    if !intersection.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100;
    }

    // BTreeSet iteration is sorted, so the joins are canonical
    let sect = intersection.join(" ");
    let ab = diff_ab.join(" ");
    let ba = diff_ba.join(" ");

    let sect_len = sect.chars().count();
    let ab_len = ab.chars().count();
    let ba_len = ba.chars().count();
    let separator = usize::from(sect_len != 0);

    let sect_ab_len = sect_len + separator + ab_len;
    let sect_ba_len = sect_len + separator + ba_len;

    // (sect + ab) vs (sect + ba): only the differing tails contribute distance
    let dist = indel::distance(ab.chars(), ba.chars());
    let mut best = normalized_similarity(dist, sect_ab_len + sect_ba_len);

    if sect_len > 0 {
        // sect vs (sect + ab) and sect vs (sect + ba): distance is the tail length
        let sect_ab_ratio = normalized_similarity(separator + ab_len, sect_len + sect_ab_len);
        let sect_ba_ratio = normalized_similarity(separator + ba_len, sect_len + sect_ba_len);
        best = best.max(sect_ab_ratio).max(sect_ba_ratio);
    }

    best.round_ties_even() as u32
}

/// 100 * (1 - dist / lensum); identical empties count as a perfect match
fn normalized_similarity(dist: usize, lensum: usize) -> f64 {
    if lensum == 0 {
        return 100.0;
    }
    100.0 - 100.0 * dist as f64 / lensum as f64
}

// ============================================================================
// VENDOR QUALITY SCORE (harmonization reporting)
// ============================================================================

/// Completeness + match-quality score for ranking unified vendors (0-100)
///
/// - Name present: 30
/// - Address present: 30
/// - Phone present: 20
/// - Match quality: 20 when harmonized across brands, otherwise tiered by
///   the raw match confidence (>=85 → 18, >=70 → 15, >=50 → 10, else 5)
pub fn vendor_quality_score(
    name: &str,
    address: &str,
    phone: &str,
    is_harmonized: bool,
    match_confidence: u32,
) -> u32 {
    let mut score = 0;

    if !name.trim().is_empty() {
        score += 30;
    }
    if !address.trim().is_empty() {
        score += 30;
    }
    if !phone.trim().is_empty() {
        score += 20;
    }

    score += if is_harmonized {
        20
    } else if match_confidence >= 85 {
        18
    } else if match_confidence >= 70 {
        15
    } else if match_confidence >= 50 {
        10
    } else {
        5
    };

    score
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings() {
        assert_eq!(token_set_ratio("acme corp", "acme corp"), 100);
    }

    #[test]
    fn test_order_insensitive() {
        assert_eq!(token_set_ratio("acme corp", "corp acme"), 100);
        assert_eq!(token_set_ratio("Main St 100", "100 main st"), 100);
    }

    #[test]
    fn test_subset_is_full_match() {
        assert_eq!(token_set_ratio("acme", "acme corp"), 100);
        assert_eq!(token_set_ratio("acme corp international", "acme"), 100);
    }

    #[test]
    fn test_partial_overlap() {
        // intersection "acme", tails "corp" vs "corporation"
        assert_eq!(token_set_ratio("acme corp", "acme corporation"), 72);
    }

    #[test]
    fn test_disjoint_words() {
        assert_eq!(token_set_ratio("abc", "xyz"), 0);
        // no shared words, but the tails share "f" and "x"
        assert_eq!(token_set_ratio("fox", "fax"), 67);
    }

    #[test]
    fn test_empty_input_scores_zero() {
        assert_eq!(token_set_ratio("", "acme"), 0);
        assert_eq!(token_set_ratio("acme", ""), 0);
        assert_eq!(token_set_ratio("", ""), 0);
        assert_eq!(token_set_ratio("!!", "acme"), 0);
    }

    #[test]
    fn test_symmetric() {
        let pairs = [
            ("steel works inc", "steelworks incorporated"),
            ("blue river supply", "river blue supplies co"),
            ("north star", "northstar logistics"),
        ];
        for (a, b) in pairs {
            assert_eq!(token_set_ratio(a, b), token_set_ratio(b, a), "{} / {}", a, b);
        }
    }

    #[test]
    fn test_range() {
        let samples = ["", "a", "acme", "acme corp", "zeta omega", "corp"];
        for a in samples {
            for b in samples {
                assert!(token_set_ratio(a, b) <= 100);
            }
        }
    }

    #[test]
    fn test_tail_distance_counts_insertions_only() {
        // "corp" -> "corporation": 7 insertions, no substitutions
        assert_eq!(indel::distance("corp".chars(), "corporation".chars()), 7);
        assert_eq!(indel::distance("fox".chars(), "fax".chars()), 2);
        assert_eq!(indel::distance("".chars(), "corp".chars()), 4);
    }

    #[test]
    fn test_vendor_quality_score_complete_harmonized() {
        assert_eq!(vendor_quality_score("Acme", "1 Main", "(555) 123-4567", true, 40), 100);
    }

    #[test]
    fn test_vendor_quality_score_tiers() {
        assert_eq!(vendor_quality_score("Acme", "1 Main", "", false, 85), 78);
        assert_eq!(vendor_quality_score("Acme", "1 Main", "", false, 84), 75);
        assert_eq!(vendor_quality_score("Acme", "1 Main", "", false, 70), 75);
        assert_eq!(vendor_quality_score("Acme", "1 Main", "", false, 50), 70);
        assert_eq!(vendor_quality_score("Acme", "1 Main", "", false, 49), 65);
        assert_eq!(vendor_quality_score("", "  ", "", false, 0), 5);
    }
}
