//! Attributed file-dependency graph.

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::errors::{AnnotatorError, AnnotatorResult};
use crate::guards::FILE_PATH_ATTRIBUTE;

/// A file node of the dependency graph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub file_path_relative: Option<String>,
    /// Remaining node attributes, verbatim and in declaration order.
    pub attributes: IndexMap<String, String>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.file_path_relative = Some(path.into());
        self
    }

    /// Set an attribute; the file-path attribute is routed to its field.
    pub fn set_attribute(&mut self, name: &str, value: String) {
        if name == FILE_PATH_ATTRIBUTE {
            self.file_path_relative = Some(value);
        } else {
            self.attributes.insert(name.to_string(), value);
        }
    }
}

/// Directed dependency graph keyed by node identifier.
///
/// Node identifiers live in their own space and are unrelated to file paths;
/// the two only meet through `file_path_relative`.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<GraphNode, String>,
    index: IndexMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: GraphNode) -> AnnotatorResult<NodeIndex> {
        if self.index.contains_key(&node.id) {
            return Err(AnnotatorError::Graph(format!("duplicate node id '{}'", node.id)));
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        Ok(idx)
    }

    pub fn add_edge(&mut self, source: &str, target: &str, label: impl Into<String>) -> AnnotatorResult<()> {
        let s = self.index_of(source)?;
        let t = self.index_of(target)?;
        self.graph.add_edge(s, t, label.into());
        Ok(())
    }

    fn index_of(&self, id: &str) -> AnnotatorResult<NodeIndex> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| AnnotatorError::Graph(format!("unknown node id '{id}'")))
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// The `filePathRelative` attribute of a node, if the node exists and has one.
    pub fn file_path_of(&self, id: &str) -> Option<&str> {
        self.node(id).and_then(|n| n.file_path_relative.as_deref())
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub(crate) fn inner(&self) -> &DiGraph<GraphNode, String> {
        &self.graph
    }
}
