//! Dependency ordering for rulesets.
//!
//! Rulesets form a directed graph (dependent -> dependency). Compilation
//! needs a total order in which every ruleset appears after everything it
//! depends on; ties between independent rulesets are broken by load order so
//! the result is deterministic for a given set of documents.

use std::collections::{HashMap, HashSet};

use crate::error::{Result, RuleError};
use crate::model::RuleSet;

/// Produce the compilation order for the ruleset table.
///
/// `load_order` lists the table keys in the order the documents were loaded
/// and drives tie-breaking. Fails on a dependency that is not in the table
/// or on a cycle; the cycle error message carries the full path.
pub(crate) fn resolve_order(
    rule_sets: &HashMap<String, RuleSet>,
    load_order: &[String],
) -> Result<Vec<String>> {
    // Missing dependencies are reported before cycles, in load order.
    for name in load_order {
        let rs = &rule_sets[name];
        for dep in &rs.depends_on {
            if !rule_sets.contains_key(dep) {
                return Err(RuleError::MissingDependency {
                    dependent: name.clone(),
                    missing: dep.clone(),
                });
            }
        }
    }

    let mut ordered: Vec<String> = Vec::with_capacity(load_order.len());
    let mut resolved: HashSet<&str> = HashSet::new();
    let mut remaining: Vec<&String> = load_order.iter().collect();

    while !remaining.is_empty() {
        let ready = remaining.iter().position(|name| {
            rule_sets[*name]
                .depends_on
                .iter()
                .all(|dep| resolved.contains(dep.as_str()))
        });

        match ready {
            Some(idx) => {
                let name = remaining.remove(idx);
                resolved.insert(name.as_str());
                ordered.push(name.clone());
            }
            None => {
                return Err(RuleError::CircularDependency {
                    path: cycle_path(rule_sets, &remaining, &resolved),
                });
            }
        }
    }

    tracing::debug!(order = ?ordered, "resolved ruleset dependency order");
    Ok(ordered)
}

/// Walk unresolved dependency edges from the first stuck ruleset until a
/// node repeats, yielding a `a->b->a` style path.
fn cycle_path(
    rule_sets: &HashMap<String, RuleSet>,
    remaining: &[&String],
    resolved: &HashSet<&str>,
) -> String {
    let mut walk: Vec<&str> = Vec::new();
    let mut current: &str = remaining[0];

    loop {
        if let Some(start) = walk.iter().position(|seen| *seen == current) {
            let mut cycle: Vec<&str> = walk[start..].to_vec();
            cycle.push(current);
            return cycle.join("->");
        }
        walk.push(current);

        // Every stuck node has at least one unresolved dependency.
        current = rule_sets[current]
            .depends_on
            .iter()
            .find(|dep| !resolved.contains(dep.as_str()))
            .map(String::as_str)
            .unwrap_or(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(sets: Vec<(&str, Vec<&str>)>) -> (HashMap<String, RuleSet>, Vec<String>) {
        let mut map = HashMap::new();
        let mut order = Vec::new();
        for (name, deps) in sets {
            order.push(name.to_string());
            map.insert(
                name.to_string(),
                RuleSet {
                    name: name.to_string(),
                    depends_on: deps.into_iter().map(String::from).collect(),
                    rules: Vec::new(),
                },
            );
        }
        (map, order)
    }

    #[test]
    fn test_dependency_before_dependent() {
        let (map, order) = table(vec![("one", vec!["two"]), ("two", vec![])]);
        let resolved = resolve_order(&map, &order).unwrap();
        assert_eq!(resolved, vec!["two".to_string(), "one".to_string()]);
    }

    #[test]
    fn test_independent_sets_keep_load_order() {
        let (map, order) = table(vec![("b", vec![]), ("a", vec![]), ("c", vec!["a"])]);
        let resolved = resolve_order(&map, &order).unwrap();
        assert_eq!(
            resolved,
            vec!["b".to_string(), "a".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn test_diamond() {
        let (map, order) = table(vec![
            ("top", vec!["left", "right"]),
            ("left", vec!["base"]),
            ("right", vec!["base"]),
            ("base", vec![]),
        ]);
        let resolved = resolve_order(&map, &order).unwrap();
        assert_eq!(resolved.last().unwrap(), "top");
        assert_eq!(resolved.first().unwrap(), "base");
        let left = resolved.iter().position(|n| n == "left").unwrap();
        let right = resolved.iter().position(|n| n == "right").unwrap();
        // Siblings stay in load order.
        assert!(left < right);
    }

    #[test]
    fn test_missing_dependency() {
        let (map, order) = table(vec![("one", vec!["two"])]);
        let err = resolve_order(&map, &order).unwrap_err();
        assert_eq!(err.to_string(), "ruleset missing dependency: one->two");
    }

    #[test]
    fn test_two_node_cycle() {
        let (map, order) = table(vec![("one", vec!["two"]), ("two", vec!["one"])]);
        let err = resolve_order(&map, &order).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ruleset circular dependency: one->two->one"
        );
    }

    #[test]
    fn test_three_node_cycle() {
        let (map, order) = table(vec![
            ("a", vec!["b"]),
            ("b", vec!["c"]),
            ("c", vec!["a"]),
        ]);
        let err = resolve_order(&map, &order).unwrap_err();
        assert_eq!(err.to_string(), "ruleset circular dependency: a->b->c->a");
    }

    #[test]
    fn test_self_dependency() {
        let (map, order) = table(vec![("solo", vec!["solo"])]);
        let err = resolve_order(&map, &order).unwrap_err();
        assert_eq!(err.to_string(), "ruleset circular dependency: solo->solo");
    }

    #[test]
    fn test_cycle_reached_through_chain() {
        // "entry" is stuck but not itself on the cycle; the path walks into
        // the cycle before it starts repeating.
        let (map, order) = table(vec![
            ("entry", vec!["x"]),
            ("x", vec!["y"]),
            ("y", vec!["x"]),
        ]);
        let err = resolve_order(&map, &order).unwrap_err();
        assert_eq!(err.to_string(), "ruleset circular dependency: x->y->x");
    }
}
