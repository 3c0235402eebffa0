//! Requirement closure over declared hard dependencies.

use std::collections::{BTreeSet, VecDeque};

/// Compute `seeds` plus every id reachable through `deps_of`.
///
/// Worklist traversal: an id is expanded only the first time it enters the
/// visited set, so dependency cycles terminate. `deps_of` returns `None` for
/// ids outside the known set; such ids stay in the result (they were
/// requested or declared) but are never expanded.
pub fn requirement_closure<'a, S, F>(seeds: S, deps_of: F) -> BTreeSet<String>
where
    S: IntoIterator<Item = &'a str>,
    F: Fn(&str) -> Option<Vec<String>>,
{
    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::new();

    for seed in seeds {
        if visited.insert(seed.to_string()) {
            queue.push_back(seed.to_string());
        }
    }

    while let Some(id) = queue.pop_front() {
        let Some(deps) = deps_of(&id) else {
            continue;
        };
        for dep in deps {
            if visited.insert(dep.clone()) {
                queue.push_back(dep);
            }
        }
    }

    visited
}
