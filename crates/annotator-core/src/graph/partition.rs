//! Partitions of the dependency graph into communities.
//!
//! Community detection is a capability consumed through [`PartitionProvider`];
//! this module only models its output and ships two thin providers.

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexSet;
use petgraph::algo::tarjan_scc;
use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;

use crate::errors::{AnnotatorError, AnnotatorResult};
use crate::graph::store::DependencyGraph;

/// An ordered, duplicate-free set of node identifiers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Community {
    members: IndexSet<String>,
}

impl Community {
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }
}

/// Ordered sequence of disjoint communities. Coverage of the graph is not required.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    communities: Vec<Community>,
}

impl Partition {
    /// Build a partition, rejecting a node that appears in two communities.
    pub fn new(communities: Vec<Community>) -> AnnotatorResult<Self> {
        let mut seen: HashSet<&str> = HashSet::new();
        for (ordinal, community) in communities.iter().enumerate() {
            for id in community.members() {
                if !seen.insert(id) {
                    return Err(AnnotatorError::Graph(format!(
                        "node '{id}' appears in more than one community (again in #{ordinal})"
                    )));
                }
            }
        }
        Ok(Self { communities })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn communities(&self) -> &[Community] {
        &self.communities
    }

    pub fn len(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }

    /// Parse a JSON array of arrays of node ids, e.g. `[["1","2"],["3"]]`.
    pub fn from_json_str(json: &str) -> AnnotatorResult<Self> {
        let raw: Vec<Vec<String>> = serde_json::from_str(json)?;
        Self::new(raw.into_iter().map(Community::new).collect())
    }

    pub fn from_json_file(path: &Path) -> AnnotatorResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

/// Source of graph partitions.
pub trait PartitionProvider {
    fn partition(&self, graph: &DependencyGraph) -> AnnotatorResult<Partition>;
}

/// Serves a pre-computed partition regardless of the graph.
#[derive(Clone, Debug, Default)]
pub struct FixedPartition(pub Partition);

impl PartitionProvider for FixedPartition {
    fn partition(&self, _graph: &DependencyGraph) -> AnnotatorResult<Partition> {
        Ok(self.0.clone())
    }
}

/// Groups nodes by connectivity, ignoring edge direction.
///
/// Delegates to petgraph's SCC routine on the undirected view of the graph.
/// Components are ordered by the insertion index of their earliest node and
/// members keep insertion order, so the output is deterministic.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConnectedComponents;

impl PartitionProvider for ConnectedComponents {
    fn partition(&self, graph: &DependencyGraph) -> AnnotatorResult<Partition> {
        let inner = graph.inner();
        let mut undirected: UnGraph<(), ()> =
            UnGraph::with_capacity(inner.node_count(), inner.edge_count());
        for _ in inner.node_indices() {
            undirected.add_node(());
        }
        for edge in inner.edge_references() {
            undirected.add_edge(edge.source(), edge.target(), ());
        }

        let mut components = tarjan_scc(&undirected);
        for component in components.iter_mut() {
            component.sort();
        }
        components.sort_by_key(|c| c.first().copied());

        let communities = components
            .into_iter()
            .map(|c| Community::new(c.into_iter().map(|idx| inner[idx].id.clone())))
            .collect();
        Partition::new(communities)
    }
}
