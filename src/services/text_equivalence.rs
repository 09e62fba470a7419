//! Tolerant comparison of short scraped text values.

use strsim::levenshtein;

/// Allowed edit distance by the length of the shorter value, longest first.
/// Values of five characters or fewer tolerate a single edit.
const EDIT_TOLERANCE: &[(usize, usize)] = &[(48, 8), (16, 6), (7, 4), (5, 2)];

/// Trim surrounding whitespace and lowercase.
pub fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

fn max_edit_distance(shortest: usize) -> usize {
    EDIT_TOLERANCE
        .iter()
        .find(|(above, _)| shortest > *above)
        .map_or(1, |(_, distance)| *distance)
}

/// Whether `a` and `b` name the same thing, allowing a few typos.
///
/// `"Bananenplukker"` and `"Bananaplukker"` are the same, `"Bananenplukker"`
/// and `"Appelplukker"` are not.
pub fn is_same(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    if a == b {
        return true;
    }

    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let allowed = max_edit_distance(len_a.min(len_b));
    if len_a.abs_diff(len_b) > allowed {
        return false;
    }

    levenshtein(&a, &b) <= allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("abc"), "abc");
        assert_eq!(normalize("ABC"), "abc");
        assert_eq!(normalize("  ABC \n"), "abc");
        assert_eq!(normalize("Storingscoördinator"), "storingscoördinator");
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        assert!(is_same("AdmInIStrAtiEf medewerker", "administratief Medewerker"));
        assert!(is_same("  Kok ", "kok"));
    }

    #[test]
    fn test_typos_tolerated() {
        assert!(is_same("Bananenplukker", "Bananaplukker"));
        assert!(is_same("verkoopmedewerker", "verkoopmedewerkr"));
        assert!(is_same("verkoopmedewerker", "verkoop medewerkster"));
        assert!(is_same("lasser", "lassers"));
    }

    #[test]
    fn test_short_values_allow_one_edit() {
        assert!(is_same("kok", "kook"));
        assert!(is_same("kok", "kak "));
        assert!(!is_same("kok", "kaak"));
        assert!(!is_same("bhv", "vca"));
    }

    #[test]
    fn test_unrelated_words_rejected() {
        assert!(!is_same("Bananenplukker", "Appelplukker"));
        assert!(!is_same("verkoopmedewerker", "verkoper"));
        assert!(!is_same("administratief medewerker", "technisch administratief medewerker"));
    }

    #[test]
    fn test_multibyte_characters_count_as_one_edit() {
        assert!(is_same("storingscoördinator", "storingscoordinator"));
    }

    #[test]
    fn test_tolerance_grows_with_length() {
        assert_eq!(max_edit_distance(3), 1);
        assert_eq!(max_edit_distance(6), 2);
        assert_eq!(max_edit_distance(8), 4);
        assert_eq!(max_edit_distance(17), 6);
        assert_eq!(max_edit_distance(49), 8);
    }
}
