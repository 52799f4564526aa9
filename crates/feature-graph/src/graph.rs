//! Soft-dependency graph over feature sets using petgraph.
//!
//! Each node is the index of a [`FeatureSet`]; an edge `a -> b` means `b`
//! declared it installs after `a`. References that match no requested
//! feature are dropped: ordering is best effort.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::model::FeatureSet;

/// Lookup from every name a feature answers to onto its node.
///
/// Exact ids win over legacy ids, which win over current ids.
#[derive(Debug, Default)]
pub(crate) struct AliasTable {
    by_id: HashMap<String, NodeIndex>,
    by_legacy: HashMap<String, NodeIndex>,
    by_current: HashMap<String, NodeIndex>,
}

impl AliasTable {
    fn build(sets: &[FeatureSet], nodes: &[NodeIndex]) -> Self {
        let mut table = Self::default();
        for (set, &node) in sets.iter().zip(nodes) {
            table
                .by_id
                .insert(set.user_feature_id_without_version().to_string(), node);

            let prefix = set.source_information.alias_prefix().unwrap_or_default();
            for feature in &set.features {
                for legacy in &feature.legacy_ids {
                    table
                        .by_legacy
                        .entry(format!("{prefix}{legacy}"))
                        .or_insert(node);
                }
                if let Some(current) = &feature.current_id {
                    table
                        .by_current
                        .entry(format!("{prefix}{current}"))
                        .or_insert(node);
                }
            }
        }
        table
    }

    /// Resolve a reference, retrying without its version.
    pub(crate) fn resolve(&self, reference: &str) -> Option<NodeIndex> {
        self.lookup(reference).or_else(|| {
            let stripped = strip_version(reference);
            (stripped != reference).then(|| self.lookup(stripped)).flatten()
        })
    }

    fn lookup(&self, reference: &str) -> Option<NodeIndex> {
        self.by_id
            .get(reference)
            .or_else(|| self.by_legacy.get(reference))
            .or_else(|| self.by_current.get(reference))
            .copied()
    }
}

/// `a/b/c:1` -> `a/b/c`, `a/b/c@sha256:..` -> `a/b/c`, `host:5000/a/b` unchanged.
fn strip_version(reference: &str) -> &str {
    if let Some((resource, _)) = reference.split_once('@') {
        return resource;
    }
    match reference.rsplit_once(':') {
        Some((resource, version)) if !version.contains('/') => resource,
        _ => reference,
    }
}

/// Graph of feature sets connected by resolved `installsAfter` references.
pub struct FeatureGraph<'a> {
    sets: &'a [FeatureSet],
    graph: DiGraph<usize, ()>,
}

impl<'a> FeatureGraph<'a> {
    /// Build the graph for `sets`.
    #[must_use]
    pub fn build(sets: &'a [FeatureSet]) -> Self {
        let mut graph = DiGraph::with_capacity(sets.len(), sets.len());
        let nodes: Vec<NodeIndex> = (0..sets.len()).map(|i| graph.add_node(i)).collect();
        let aliases = AliasTable::build(sets, &nodes);

        for (set, &node) in sets.iter().zip(&nodes) {
            for reference in set.features.iter().flat_map(|f| &f.installs_after) {
                match aliases.resolve(reference) {
                    Some(dependency) => {
                        debug!(
                            feature = set.user_feature_id(),
                            after = sets[graph[dependency]].user_feature_id(),
                            "Added installsAfter edge"
                        );
                        graph.update_edge(dependency, node, ());
                    }
                    None => {
                        trace!(
                            feature = set.user_feature_id(),
                            reference = reference.as_str(),
                            "Ignoring unresolved installsAfter reference"
                        );
                    }
                }
            }
        }

        Self { sets, graph }
    }

    /// Number of feature sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether the graph has no feature sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// The feature set behind node `index`.
    #[must_use]
    pub fn set(&self, index: usize) -> &'a FeatureSet {
        &self.sets[index]
    }

    fn node(index: usize) -> NodeIndex {
        NodeIndex::new(index)
    }

    /// How many features `index` must install after.
    #[must_use]
    pub fn predecessor_count(&self, index: usize) -> usize {
        self.graph
            .neighbors_directed(Self::node(index), Direction::Incoming)
            .count()
    }

    /// Features that must install after `index`.
    pub fn dependents(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph
            .neighbors_directed(Self::node(index), Direction::Outgoing)
            .map(|node| self.graph[node])
    }

    /// Whether `after` must install after `before`.
    #[must_use]
    pub fn has_edge(&self, before: usize, after: usize) -> bool {
        self.graph
            .contains_edge(Self::node(before), Self::node(after))
    }
}
