//! Pure bisection steps: midpoint split and verdict folding.
//!
//! Ids a dependency closure forced to stay enabled are still treated as
//! disabled here when they belong to the half the search disabled. The search
//! only reasons about the ids it asked to toggle.

use std::collections::HashSet;

use crate::core::types::Verdict;

/// Split suspects at `floor(n / 2)`.
///
/// The first half is disabled for the next test run; the second half stays
/// enabled. Order is preserved, so repeated calls give the same split.
pub fn split_suspects(suspects: &[String]) -> (Vec<String>, Vec<String>) {
    let midpoint = suspects.len() / 2;
    let (disable, keep) = suspects.split_at(midpoint);
    (disable.to_vec(), keep.to_vec())
}

/// Suspect and innocent sets after folding in one verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldedVerdict {
    pub suspects: Vec<String>,
    pub innocent: Vec<String>,
}

/// Fold a verdict into the search sets.
///
/// `enabled` is the on-disk enabled set observed after the test run, in
/// registry order. On success the culprit is among `currently_disabled` and
/// every other running id is cleared. On failure the culprit is still
/// running, and the disabled half is cleared.
pub fn fold_verdict(
    verdict: Verdict,
    enabled: &[String],
    innocent: &[String],
    currently_disabled: &[String],
) -> FoldedVerdict {
    let disabled: HashSet<&str> = currently_disabled.iter().map(String::as_str).collect();
    let mut cleared: HashSet<&str> = innocent.iter().map(String::as_str).collect();
    let mut next_innocent = innocent.to_vec();

    match verdict {
        Verdict::Success => {
            for id in enabled {
                if !disabled.contains(id.as_str()) && cleared.insert(id.as_str()) {
                    next_innocent.push(id.clone());
                }
            }
            FoldedVerdict {
                suspects: currently_disabled.to_vec(),
                innocent: next_innocent,
            }
        }
        Verdict::Failure => {
            let suspects = enabled
                .iter()
                .filter(|id| !cleared.contains(id.as_str()) && !disabled.contains(id.as_str()))
                .cloned()
                .collect();
            for id in currently_disabled {
                if cleared.insert(id.as_str()) {
                    next_innocent.push(id.clone());
                }
            }
            FoldedVerdict {
                suspects,
                innocent: next_innocent,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn split_puts_smaller_half_first() {
        let (disable, keep) = split_suspects(&ids(&["a", "b", "c", "d", "e"]));
        assert_eq!(disable, ids(&["a", "b"]));
        assert_eq!(keep, ids(&["c", "d", "e"]));
    }

    #[test]
    fn split_is_stable() {
        let suspects = ids(&["a", "b", "c", "d"]);
        assert_eq!(split_suspects(&suspects), split_suspects(&suspects));
        assert_eq!(split_suspects(&suspects).0, ids(&["a", "b"]));
    }

    #[test]
    fn split_of_two_disables_first() {
        let (disable, keep) = split_suspects(&ids(&["a", "b"]));
        assert_eq!(disable, ids(&["a"]));
        assert_eq!(keep, ids(&["b"]));
    }

    #[test]
    fn success_narrows_to_disabled_half_and_clears_running_ids() {
        let folded = fold_verdict(
            Verdict::Success,
            &ids(&["c", "d"]),
            &[],
            &ids(&["a", "b"]),
        );
        assert_eq!(folded.suspects, ids(&["a", "b"]));
        assert_eq!(folded.innocent, ids(&["c", "d"]));
    }

    #[test]
    fn failure_narrows_to_running_ids_and_clears_disabled_half() {
        let folded = fold_verdict(
            Verdict::Failure,
            &ids(&["b", "c", "d"]),
            &ids(&["c", "d"]),
            &ids(&["a"]),
        );
        assert_eq!(folded.suspects, ids(&["b"]));
        assert_eq!(folded.innocent, ids(&["c", "d", "a"]));
    }

    #[test]
    fn forced_dependency_in_disabled_half_stays_suspect_on_success() {
        // "lib" was in the disabled half but stayed enabled as a dependency of "app".
        let folded = fold_verdict(
            Verdict::Success,
            &ids(&["lib", "app"]),
            &[],
            &ids(&["lib"]),
        );
        assert_eq!(folded.suspects, ids(&["lib"]));
        assert_eq!(folded.innocent, ids(&["app"]));
    }

    #[test]
    fn forced_dependency_in_disabled_half_is_cleared_on_failure() {
        let folded = fold_verdict(
            Verdict::Failure,
            &ids(&["lib", "app"]),
            &[],
            &ids(&["lib"]),
        );
        assert_eq!(folded.suspects, ids(&["app"]));
        assert_eq!(folded.innocent, ids(&["lib"]));
    }

    #[test]
    fn failure_with_everything_cleared_leaves_no_suspects() {
        let folded = fold_verdict(
            Verdict::Failure,
            &ids(&["c"]),
            &ids(&["c"]),
            &ids(&["a"]),
        );
        assert!(folded.suspects.is_empty());
    }
}
