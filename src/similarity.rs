//! Similarity scoring between two rosters

use std::collections::HashSet;

use crate::content::VersionContent;

/// Roster size of a standard small (Teensyville) script
///
/// Floor of the denominator when comparing scripts of different formats.
pub const STANDARD_TEENSYVILLE_CHARACTER_COUNT: usize = 12;

/// Score how much of two rosters is shared, as a percentage in `0..=100`
///
/// With `same_type` the shared count is divided by the larger roster, so
/// padding a script with extra characters lowers the score. Across formats it
/// is divided by the smaller roster, floored at
/// [`STANDARD_TEENSYVILLE_CHARACTER_COUNT`].
pub fn similarity(a: &VersionContent, b: &VersionContent, same_type: bool) -> u8 {
    let a_ids: HashSet<&str> = a.characters().map(|r| r.id.as_str()).collect();
    let b_ids: HashSet<&str> = b.characters().map(|r| r.id.as_str()).collect();
    if a_ids.is_empty() || b_ids.is_empty() {
        return 0;
    }

    let matching = a_ids.intersection(&b_ids).count();
    let denominator = if same_type {
        a_ids.len().max(b_ids.len())
    } else {
        a_ids
            .len()
            .min(b_ids.len())
            .max(STANDARD_TEENSYVILLE_CHARACTER_COUNT)
    };

    let percentage = (matching as f64 / denominator as f64 * 100.0).round();
    percentage.clamp(0.0, 100.0) as u8
}

/// A scored candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimilarityMatch<K> {
    pub key: K,
    pub score: u8,
}

/// Score `target` against each candidate and keep those at or above `threshold`
///
/// Results are ordered best first. Each candidate carries its own same-type
/// flag since formats can differ per candidate.
pub fn rank_similar<'a, K, I>(target: &VersionContent, candidates: I, threshold: u8) -> Vec<SimilarityMatch<K>>
where
    I: IntoIterator<Item = (K, &'a VersionContent, bool)>,
{
    let mut matches: Vec<SimilarityMatch<K>> = candidates
        .into_iter()
        .map(|(key, content, same_type)| SimilarityMatch {
            key,
            score: similarity(target, content, same_type),
        })
        .filter(|m| m.score >= threshold)
        .collect();
    matches.sort_by(|a, b| b.score.cmp(&a.score));
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::normalize;
    use serde_json::json;

    fn ids(prefix: &str, n: usize) -> VersionContent {
        let raw: Vec<_> = (0..n).map(|i| json!(format!("{}{}", prefix, i))).collect();
        normalize(&serde_json::Value::Array(raw)).unwrap()
    }

    #[test]
    fn test_reflexive() {
        let a = ids("c", 7);
        assert_eq!(similarity(&a, &a, true), 100);
        assert_eq!(similarity(&a, &a, false), 58); // 7 of a 12 floor
    }

    #[test]
    fn test_empty_is_zero() {
        let empty = VersionContent::default();
        let a = ids("c", 3);
        assert_eq!(similarity(&empty, &empty, true), 0);
        assert_eq!(similarity(&empty, &a, false), 0);
        let meta_only = normalize(&json!([{"id": "_meta", "name": "m"}])).unwrap();
        assert_eq!(similarity(&meta_only, &meta_only, true), 0);
    }

    #[test]
    fn test_cross_type_uses_smaller_roster_with_floor() {
        let big = ids("c", 30);
        let small = ids("c", 5);
        // 5 shared, min roster 5 floored to 12
        assert_eq!(similarity(&small, &big, false), 42);
        assert_eq!(similarity(&small, &big, true), 17);
    }

    #[test]
    fn test_symmetric() {
        let a = ids("c", 20);
        let b = normalize(&json!(["c0", "c1", "c2", "x", "y"])).unwrap();
        for same in [true, false] {
            assert_eq!(similarity(&a, &b, same), similarity(&b, &a, same));
        }
    }

    #[test]
    fn test_duplicates_count_once() {
        let a = normalize(&json!(["chef", "chef", "imp"])).unwrap();
        let b = normalize(&json!(["chef", "imp"])).unwrap();
        assert_eq!(similarity(&a, &b, true), 100);
    }

    #[test]
    fn test_rank_similar_orders_and_filters() {
        let target = ids("c", 10);
        let close = ids("c", 11);
        let far = ids("z", 10);
        let ranked = rank_similar(
            &target,
            vec![("far", &far, true), ("self", &target, true), ("close", &close, true)],
            50,
        );
        let keys: Vec<_> = ranked.iter().map(|m| m.key).collect();
        assert_eq!(keys, vec!["self", "close"]);
        assert_eq!(ranked[1].score, 91);
    }
}
