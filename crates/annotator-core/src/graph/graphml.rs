//! GraphML reader for the dependency graph written by the analysis tool.
//!
//! Only the subset the tool emits is understood: `<key>` declarations mapping
//! key ids to attribute names, `<node>` elements with `<data>` children, and
//! `<edge>` elements. Edges may appear before the nodes they reference; they
//! are resolved once the whole document has been read.

use std::collections::HashMap;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::errors::{AnnotatorError, AnnotatorResult};
use crate::graph::store::{DependencyGraph, GraphNode};

/// Edge attribute used as the edge label when present.
const EDGE_LABEL_ATTRIBUTE: &str = "labelE";

struct PendingEdge {
    source: String,
    target: String,
    label: String,
}

enum Owner {
    Node(GraphNode),
    Edge(PendingEdge),
}

fn attribute(e: &BytesStart<'_>, name: &[u8]) -> AnnotatorResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn required(e: &BytesStart<'_>, name: &[u8], element: &str) -> AnnotatorResult<String> {
    attribute(e, name)?.ok_or_else(|| {
        AnnotatorError::Graph(format!(
            "<{element}> is missing attribute '{}'",
            String::from_utf8_lossy(name)
        ))
    })
}

#[derive(Default)]
struct GraphmlState {
    keys: HashMap<String, String>,
    owner: Option<Owner>,
    data_key: Option<String>,
    data_value: String,
    nodes: Vec<GraphNode>,
    edges: Vec<PendingEdge>,
}

impl GraphmlState {
    fn open(&mut self, e: &BytesStart<'_>, empty: bool) -> AnnotatorResult<()> {
        match e.local_name().as_ref() {
            b"key" => {
                let id = required(e, b"id", "key")?;
                let name = attribute(e, b"attr.name")?.unwrap_or_else(|| id.clone());
                self.keys.insert(id, name);
            }
            b"node" => {
                let node = GraphNode::new(required(e, b"id", "node")?);
                if empty {
                    self.nodes.push(node);
                } else {
                    self.owner = Some(Owner::Node(node));
                }
            }
            b"edge" => {
                let edge = PendingEdge {
                    source: required(e, b"source", "edge")?,
                    target: required(e, b"target", "edge")?,
                    label: String::new(),
                };
                if empty {
                    self.edges.push(edge);
                } else {
                    self.owner = Some(Owner::Edge(edge));
                }
            }
            b"data" => {
                self.data_key = Some(required(e, b"key", "data")?);
                self.data_value.clear();
                if empty {
                    self.close_data();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"node" | b"edge" => match self.owner.take() {
                Some(Owner::Node(node)) => self.nodes.push(node),
                Some(Owner::Edge(edge)) => self.edges.push(edge),
                None => {}
            },
            b"data" => self.close_data(),
            _ => {}
        }
    }

    fn close_data(&mut self) {
        let Some(key) = self.data_key.take() else {
            return;
        };
        let name = self.keys.get(&key).cloned().unwrap_or(key);
        let value = std::mem::take(&mut self.data_value);
        match self.owner.as_mut() {
            Some(Owner::Node(node)) => node.set_attribute(&name, value),
            Some(Owner::Edge(edge)) if name == EDGE_LABEL_ATTRIBUTE => edge.label = value,
            _ => {}
        }
    }
}

/// Parse a GraphML document into a dependency graph.
pub fn parse_graphml(xml: &str) -> AnnotatorResult<DependencyGraph> {
    let mut reader = Reader::from_str(xml);

    let mut state = GraphmlState::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => state.open(&e, false)?,
            Event::Empty(e) => state.open(&e, true)?,
            Event::Text(t) => {
                if state.data_key.is_some() {
                    state.data_value.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if state.data_key.is_some() {
                    state.data_value.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => state.close(e.local_name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
    }

    let mut graph = DependencyGraph::new();
    for node in state.nodes {
        graph.add_node(node)?;
    }
    for edge in state.edges {
        graph.add_edge(&edge.source, &edge.target, edge.label)?;
    }

    debug!(
        "Parsed GraphML: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

pub fn parse_graphml_file(path: &Path) -> AnnotatorResult<DependencyGraph> {
    let raw = std::fs::read_to_string(path)?;
    parse_graphml(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<graphml xmlns="http://graphml.graphdrawing.org/xmlns">
  <key id="d0" for="node" attr.name="filePathRelative" attr.type="string"/>
  <key id="d1" for="node" attr.name="name" attr.type="string"/>
  <key id="d2" for="edge" attr.name="labelE" attr.type="string"/>
  <graph id="G" edgedefault="directed">
    <edge source="1" target="2"><data key="d2">dependsOn</data></edge>
    <node id="1"><data key="d0">src/A.java</data><data key="d1">A</data></node>
    <node id="2"><data key="d0">src/B &amp; C.java</data></node>
    <node id="3"/>
  </graph>
</graphml>"#;

    #[test]
    fn parses_nodes_edges_and_paths() {
        let g = parse_graphml(SAMPLE).unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.file_path_of("1"), Some("src/A.java"));
        assert_eq!(g.file_path_of("2"), Some("src/B & C.java"));
        assert_eq!(g.file_path_of("3"), None);
        assert_eq!(
            g.node("1").unwrap().attributes.get("name").map(String::as_str),
            Some("A")
        );
    }

    #[test]
    fn node_order_follows_document() {
        let g = parse_graphml(SAMPLE).unwrap();
        let ids: Vec<&str> = g.node_ids().collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn dangling_edge_is_an_error() {
        let xml = r#"<graphml><graph><node id="1"/><edge source="1" target="7"/></graph></graphml>"#;
        assert!(matches!(parse_graphml(xml), Err(AnnotatorError::Graph(_))));
    }

    #[test]
    fn node_without_id_is_an_error() {
        let xml = r#"<graphml><graph><node/></graph></graphml>"#;
        assert!(matches!(parse_graphml(xml), Err(AnnotatorError::Graph(_))));
    }

    #[test]
    fn data_text_is_kept_verbatim() {
        let xml = "<graphml><key id=\"p\" for=\"node\" attr.name=\"filePathRelative\"/><graph>\
                   <node id=\"1\">\n  <data key=\"p\">  src/A.java\n</data>\n</node></graph></graphml>";
        let g = parse_graphml(xml).unwrap();
        assert_eq!(g.file_path_of("1"), Some("  src/A.java\n"));
        assert_eq!(g.node("1").unwrap().attributes.len(), 0);
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deps.graphml");
        std::fs::write(&path, SAMPLE).unwrap();
        let g = parse_graphml_file(&path).unwrap();
        assert_eq!(g.node_count(), 3);
    }
}
