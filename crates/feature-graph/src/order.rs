//! Installation order computation.
//!
//! The order is produced by peeling the graph breadth first: every feature
//! that others install after is emitted level by level, each level sorted
//! by the user's identifier, and features with no relations at all go
//! last, also sorted. An explicit override list can then pull features to
//! the front.

use tracing::{debug, warn};

use crate::graph::FeatureGraph;
use crate::model::FeatureSet;
use crate::{Error, Result};

/// Order `sets` for sequential installation.
///
/// # Errors
///
/// Returns [`Error::CyclicDependency`] naming every feature that could not
/// be ordered.
pub fn compute_installation_order(sets: Vec<FeatureSet>) -> Result<Vec<FeatureSet>> {
    compute_feature_installation_order(sets, None)
}

/// Order `sets` for sequential installation, honoring `override_order`.
///
/// Each override entry is matched against a feature's identifier with or
/// without its version; matched features are moved to the front in the
/// listed order and the rest keep their computed order.
///
/// # Errors
///
/// Returns [`Error::CyclicDependency`] when the `installsAfter` relations
/// form a cycle and [`Error::OverrideNotFound`] when an override entry
/// matches no feature.
pub fn compute_feature_installation_order(
    sets: Vec<FeatureSet>,
    override_order: Option<&[String]>,
) -> Result<Vec<FeatureSet>> {
    let mut order = automatic_order(&FeatureGraph::build(&sets))?;
    if let Some(override_order) = override_order {
        order = apply_override(&sets, order, override_order)?;
    }

    debug!(
        order = ?order.iter().map(|&i| sets[i].user_feature_id()).collect::<Vec<_>>(),
        "Computed feature installation order"
    );

    let mut slots: Vec<Option<FeatureSet>> = sets.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

/// Indices of the graph's feature sets in installation order.
fn automatic_order(graph: &FeatureGraph<'_>) -> Result<Vec<usize>> {
    let by_user_id = |a: &usize, b: &usize| {
        graph
            .set(*a)
            .user_feature_id()
            .cmp(graph.set(*b).user_feature_id())
    };

    let mut remaining: Vec<usize> = (0..graph.len())
        .map(|i| graph.predecessor_count(i))
        .collect();
    let (mut frontier, mut islands): (Vec<usize>, Vec<usize>) = (0..graph.len())
        .filter(|&i| remaining[i] == 0)
        .partition(|&i| graph.dependents(i).next().is_some());

    let mut order = Vec::with_capacity(graph.len());
    while !frontier.is_empty() {
        frontier.sort_by(by_user_id);
        let mut next = Vec::new();
        for &index in &frontier {
            for dependent in graph.dependents(index) {
                remaining[dependent] -= 1;
                if remaining[dependent] == 0 {
                    next.push(dependent);
                }
            }
        }
        order.append(&mut frontier);
        frontier = next;
    }

    islands.sort_by(by_user_id);
    order.append(&mut islands);

    if order.len() < graph.len() {
        let mut emitted = vec![false; graph.len()];
        for &index in &order {
            emitted[index] = true;
        }
        let mut features: Vec<String> = (0..graph.len())
            .filter(|&i| !emitted[i])
            .map(|i| graph.set(i).user_feature_id().to_string())
            .collect();
        features.sort();
        warn!(?features, "Cyclic installsAfter relations");
        return Err(Error::CyclicDependency { features });
    }

    Ok(order)
}

/// Move the sets named by `override_order` to the front of `order`.
fn apply_override(
    sets: &[FeatureSet],
    mut order: Vec<usize>,
    override_order: &[String],
) -> Result<Vec<usize>> {
    let mut front = Vec::with_capacity(override_order.len());
    for id in override_order {
        if let Some(position) = order.iter().position(|&i| sets[i].matches(id)) {
            front.push(order.remove(position));
        } else if !front.iter().any(|&i| sets[i].matches(id)) {
            return Err(Error::OverrideNotFound { id: id.clone() });
        }
    }

    front.append(&mut order);
    Ok(front)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Feature;
    use devfeat_oci::{DEVCONTAINER_TAR_LAYER_MEDIA_TYPE, Manifest, build_manifest, digest_layer};

    fn set(id: &str, after: &[&str]) -> FeatureSet {
        FeatureSet::local(id, vec![Feature::new(id).installs_after(after.iter().copied())])
    }

    fn ids(sets: &[FeatureSet]) -> Vec<&str> {
        sets.iter().map(FeatureSet::user_feature_id).collect()
    }

    fn strings(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| (*id).to_string()).collect()
    }

    fn manifest() -> Manifest {
        let layer = digest_layer(b"f", "f.tgz", DEVCONTAINER_TAR_LAYER_MEDIA_TYPE);
        build_manifest(layer, None).unwrap().manifest
    }

    #[test]
    fn test_independent_features_sort_alphabetically() {
        let order = compute_installation_order(vec![set("C", &[]), set("A", &[]), set("B", &[])]).unwrap();
        assert_eq!(ids(&order), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_tree_orders_by_level() {
        let sets = vec![
            set("A", &["B"]),
            set("B", &["C"]),
            set("C", &[]),
            set("D", &["E"]),
            set("E", &["C"]),
        ];
        let order = compute_installation_order(sets).unwrap();
        assert_eq!(ids(&order), vec!["C", "B", "E", "A", "D"]);
    }

    #[test]
    fn test_islands_install_after_related_features() {
        let sets = vec![set("a-island", &[]), set("z", &["y"]), set("y", &[])];
        let order = compute_installation_order(sets).unwrap();
        assert_eq!(ids(&order), vec!["y", "z", "a-island"]);
    }

    #[test]
    fn test_cycle_names_all_unordered_features() {
        let sets = vec![set("B", &["A"]), set("A", &["B"]), set("C", &[])];
        let err = compute_installation_order(sets).unwrap_err();
        assert_eq!(
            err,
            Error::CyclicDependency {
                features: strings(&["A", "B"])
            }
        );
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let err = compute_installation_order(vec![set("A", &["A"])]).unwrap_err();
        assert!(matches!(err, Error::CyclicDependency { .. }));
    }

    #[test]
    fn test_cycle_downstream_features_are_reported() {
        let sets = vec![set("A", &["B"]), set("B", &["A"]), set("C", &["A"])];
        let err = compute_installation_order(sets).unwrap_err();
        assert_eq!(
            err,
            Error::CyclicDependency {
                features: strings(&["A", "B", "C"])
            }
        );
    }

    #[test]
    fn test_unresolved_soft_dependency_is_ignored() {
        let sets = vec![set("B", &["not-requested"]), set("A", &[])];
        let order = compute_installation_order(sets).unwrap();
        assert_eq!(ids(&order), vec!["A", "B"]);
    }

    #[test]
    fn test_override_pulls_listed_features_first() {
        let sets = vec![
            set("A", &["D"]),
            set("B", &["C"]),
            set("C", &[]),
            set("D", &["C"]),
        ];
        let automatic = compute_installation_order(sets.clone()).unwrap();
        assert_eq!(ids(&automatic), vec!["C", "B", "D", "A"]);

        let order =
            compute_feature_installation_order(sets, Some(strings(&["A", "B", "C"]).as_slice())).unwrap();
        assert_eq!(ids(&order), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_override_matches_with_or_without_version() {
        let sets = vec![
            FeatureSet::oci("ghcr.io/devcontainers/features/go:1", manifest(), vec![Feature::new("go")]),
            FeatureSet::oci("ghcr.io/devcontainers/features/node:18", manifest(), vec![Feature::new("node")]),
        ];
        let order = compute_feature_installation_order(
            sets,
            Some(
                strings(&[
                    "ghcr.io/devcontainers/features/node",
                    "ghcr.io/devcontainers/features/go:1",
                ])
                .as_slice(),
            ),
        )
        .unwrap();
        assert_eq!(
            ids(&order),
            vec![
                "ghcr.io/devcontainers/features/node:18",
                "ghcr.io/devcontainers/features/go:1"
            ]
        );
    }

    #[test]
    fn test_override_with_unknown_id_fails() {
        let err = compute_feature_installation_order(
            vec![set("A", &[])],
            Some(strings(&["missing"]).as_slice()),
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::OverrideNotFound {
                id: "missing".to_string()
            }
        );
    }

    #[test]
    fn test_legacy_id_resolves_within_namespace() {
        let sets = vec![
            FeatureSet::oci(
                "ghcr.io/devcontainers/features/node:1",
                manifest(),
                vec![Feature::new("node").installs_after(["ghcr.io/devcontainers/features/common"])],
            ),
            FeatureSet::oci(
                "ghcr.io/devcontainers/features/common-utils:2",
                manifest(),
                vec![Feature::new("common-utils").legacy_ids(["common"])],
            ),
        ];
        let order = compute_installation_order(sets).unwrap();
        assert_eq!(
            ids(&order),
            vec![
                "ghcr.io/devcontainers/features/common-utils:2",
                "ghcr.io/devcontainers/features/node:1"
            ]
        );
    }

    #[test]
    fn test_legacy_id_from_other_namespace_does_not_match() {
        let sets = vec![
            FeatureSet::oci(
                "ghcr.io/devcontainers/features/node:1",
                manifest(),
                vec![Feature::new("node").installs_after(["ghcr.io/other/features/common"])],
            ),
            FeatureSet::oci(
                "ghcr.io/devcontainers/features/common-utils:2",
                manifest(),
                vec![Feature::new("common-utils").legacy_ids(["common"])],
            ),
        ];
        let order = compute_installation_order(sets).unwrap();
        assert_eq!(
            ids(&order),
            vec![
                "ghcr.io/devcontainers/features/common-utils:2",
                "ghcr.io/devcontainers/features/node:1"
            ]
        );
        // Both are islands, so the order is alphabetical either way; the
        // dependency must not have been recorded.
        let graph_sets = [order[0].clone(), order[1].clone()];
        let graph = FeatureGraph::build(&graph_sets);
        assert!(!graph.has_edge(0, 1));
    }

    #[test]
    fn test_current_id_resolves_forward_reference() {
        let sets = vec![
            FeatureSet::oci(
                "ghcr.io/acme/features/alpha:1",
                manifest(),
                vec![Feature::new("alpha").installs_after(["ghcr.io/acme/features/zeta-renamed"])],
            ),
            FeatureSet::oci(
                "ghcr.io/acme/features/zeta:1",
                manifest(),
                vec![Feature::new("zeta").current_id("zeta-renamed")],
            ),
        ];
        let order = compute_installation_order(sets).unwrap();
        assert_eq!(
            ids(&order),
            vec!["ghcr.io/acme/features/zeta:1", "ghcr.io/acme/features/alpha:1"]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(compute_installation_order(Vec::new()).unwrap().is_empty());
    }
}
