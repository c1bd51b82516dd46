//! Case-insensitive fuzzy scoring shared by jump search, the command palette
//! and the scope picker.
//!
//! Literal substring hits score in `[CONTAINS_FLOOR, CONTAINS_BASE]`;
//! subsequence hits are capped below `CONTAINS_FLOOR`, so a substring match
//! always outranks a subsequence-only match for the same query.

const CONTAINS_BASE: i64 = 100_000;
const CONTAINS_FLOOR: i64 = 50_000;

const MATCH_BASE: i64 = 8;
const BOUNDARY_BONUS: i64 = 10;
const STREAK_BONUS: i64 = 4;

/// Score for `query` against `candidate`; `matched` is false when the query
/// is not a subsequence. An empty query matches with the lowest score.
#[must_use]
pub fn score(query: &str, candidate: &str) -> (i64, bool) {
    let query = query.trim().to_lowercase();
    let candidate = candidate.trim().to_lowercase();
    if query.is_empty() {
        return (1, true);
    }
    if candidate.is_empty() {
        return (0, false);
    }

    let query: Vec<char> = query.chars().collect();
    let target: Vec<char> = candidate.chars().collect();
    let excess = i64::try_from(target.len().saturating_sub(query.len())).unwrap_or(i64::MAX);

    if let Some(idx) = find_chars(&target, &query) {
        let idx = i64::try_from(idx).unwrap_or(i64::MAX);
        let score = CONTAINS_BASE
            .saturating_sub(idx.saturating_mul(2))
            .saturating_sub(excess);
        return (score.max(CONTAINS_FLOOR), true);
    }

    let mut qi = 0;
    let mut total: i64 = 0;
    let mut streak: i64 = 0;
    let mut last_match: Option<usize> = None;
    for (i, ch) in target.iter().enumerate() {
        if qi >= query.len() {
            break;
        }
        if *ch != query[qi] {
            continue;
        }
        let mut gained = MATCH_BASE;
        if i == 0 || matches!(target[i - 1], ' ' | '/' | '-' | '_') {
            gained += BOUNDARY_BONUS;
        }
        if last_match.is_some_and(|last| last + 1 == i) {
            streak += 1;
            gained += STREAK_BONUS + streak;
        } else {
            streak = 0;
        }
        total += gained;
        last_match = Some(i);
        qi += 1;
    }
    if qi != query.len() {
        return (0, false);
    }
    let total = total.saturating_sub(excess).clamp(1, CONTAINS_FLOOR - 1);
    (total, true)
}

fn find_chars(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::score;

    #[test]
    fn empty_query_matches_everything_lowest() {
        assert_eq!(score("", "anything"), (1, true));
        assert_eq!(score("   ", ""), (1, true));
    }

    #[test]
    fn empty_candidate_never_matches() {
        assert_eq!(score("a", ""), (0, false));
    }

    #[test]
    fn case_insensitive() {
        assert!(score("BACKOFF", "Pod/web BackOff").1);
    }

    #[test]
    fn non_subsequence_fails() {
        assert_eq!(score("zq", "Deployment/web"), (0, false));
    }

    #[test]
    fn earlier_and_tighter_substrings_rank_higher() {
        let (early, _) = score("web", "web-1");
        let (late, _) = score("web", "pod/web-1");
        let (long, _) = score("web", "web-1 with a much longer tail");
        assert!(early > late);
        assert!(early > long);
    }

    #[test]
    fn word_boundaries_and_streaks_help_subsequences() {
        let (boundary, _) = score("dw", "deployment/worker");
        let (inner, _) = score("dw", "adxwxxxxxxxxxxxxx");
        assert!(boundary > inner);
    }

    #[test]
    fn pd_prefers_pd_worker() {
        let (worker, ok) = score("pd", "Deployment/pd-worker");
        assert!(ok);
        let (pod, ok) = score("pd", "Pod/web-1");
        assert!(ok);
        assert!(worker > pod);
    }

    #[test]
    fn substring_beats_any_subsequence() {
        let candidates = [
            "p",
            "pd",
            "p/d",
            "p-d-x",
            "pod/d",
            "Pod/web-1",
            "p_d_p_d_p_d_p_d",
            "Deployment/pd-worker",
            "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxpd",
        ];
        for query in ["pd", "p", "d"] {
            let mut substring_min = i64::MAX;
            let mut subsequence_max = i64::MIN;
            for candidate in candidates {
                let (value, matched) = score(query, candidate);
                if !matched {
                    continue;
                }
                if candidate.to_lowercase().contains(query) {
                    substring_min = substring_min.min(value);
                } else {
                    subsequence_max = subsequence_max.max(value);
                }
            }
            assert!(substring_min > subsequence_max, "query {query}");
        }
    }
}
