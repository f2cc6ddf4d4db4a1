// 🧹 Normalizer - Canonical forms for names, addresses and phones
//
// Leaf module: everything that compares vendor text goes through here.
// All functions are pure and never fail; empty input gives empty output.

/// Street suffixes stripped (as substrings, in this order) before the
/// address+phone merge check
const STREET_SUFFIXES: [&str; 8] = [
    "street", "st", "avenue", "ave", "road", "rd", "boulevard", "blvd",
];

/// Normalize a vendor name for comparison
///
/// - Lowercase and trim
/// - Every character outside `[a-z0-9\s]` becomes a space
/// - Whitespace runs collapse to a single space
///
/// Example: `"ACME, Corp."` → `"acme corp"`
pub fn normalize_name(value: &str) -> String {
    let lowered = value.trim().to_lowercase();

    let cleaned: String = lowered
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Addresses follow exactly the same rules as names
pub fn normalize_address(value: &str) -> String {
    normalize_name(value)
}

/// Normalize a phone number
///
/// - 10 digits → `(XXX) XXX-XXXX`
/// - 11 digits starting with 1 → `+1 (XXX) XXX-XXXX`
/// - anything else → the bare digit string (possibly empty)
pub fn normalize_phone(value: &str) -> String {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        10 => format!("({}) {}-{}", &digits[0..3], &digits[3..6], &digits[6..]),
        11 if digits.starts_with('1') => {
            format!("+1 ({}) {}-{}", &digits[1..4], &digits[4..7], &digits[7..])
        }
        _ => digits,
    }
}

/// Remove common street suffixes from an already-normalized address
///
/// Removal is by substring, so "st" also disappears from inside words
/// ("main street" → "main ", "first" → "fir"). Both sides of a comparison
/// get the same treatment, which is all the merge pass needs.
pub fn strip_street_suffixes(normalized_address: &str) -> String {
    STREET_SUFFIXES
        .iter()
        .fold(normalized_address.to_string(), |acc, suffix| {
            acc.replace(suffix, "")
        })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name_punctuation_and_case() {
        assert_eq!(normalize_name("ACME, Corp."), "acme corp");
        assert_eq!(normalize_name("  Steel-Works   Inc "), "steel works inc");
        assert_eq!(normalize_name("O'Brien & Sons"), "o brien sons");
    }

    #[test]
    fn test_normalize_name_empty() {
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("   "), "");
        assert_eq!(normalize_name("!!!"), "");
    }

    #[test]
    fn test_normalize_name_non_ascii_becomes_space() {
        assert_eq!(normalize_name("Café Zürich"), "caf z rich");
    }

    #[test]
    fn test_normalize_address_matches_name_rules() {
        assert_eq!(
            normalize_address("123 Main St., Suite #4"),
            "123 main st suite 4"
        );
    }

    #[test]
    fn test_normalize_phone_ten_digits() {
        assert_eq!(normalize_phone("555.123.4567"), "(555) 123-4567");
        assert_eq!(normalize_phone("(555) 123-4567"), "(555) 123-4567");
    }

    #[test]
    fn test_normalize_phone_eleven_digits() {
        assert_eq!(normalize_phone("1-555-123-4567"), "+1 (555) 123-4567");
        // 11 digits not starting with 1 stay raw
        assert_eq!(normalize_phone("25551234567"), "25551234567");
    }

    #[test]
    fn test_normalize_phone_other_lengths() {
        assert_eq!(normalize_phone("ext 42"), "42");
        assert_eq!(normalize_phone(""), "");
        assert_eq!(normalize_phone("n/a"), "");
    }

    #[test]
    fn test_normalize_phone_idempotent_on_formatted() {
        let once = normalize_phone("5551234567");
        assert_eq!(normalize_phone(&once), once);
    }

    #[test]
    fn test_strip_street_suffixes() {
        assert_eq!(strip_street_suffixes("100 main street"), "100 main ");
        assert_eq!(strip_street_suffixes("100 main st"), "100 main ");
        assert_eq!(strip_street_suffixes("9 ocean blvd"), "9 ocean ");
        assert_eq!(strip_street_suffixes(""), "");
    }
}
