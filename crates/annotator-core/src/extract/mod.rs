pub mod tool;

use crate::errors::AnnotatorResult;
use crate::graph::DependencyGraph;

pub use tool::{find_file_by_extension, tool_language, ComponentExtractor, ProjectExtraction};

/// Produces the dependency graph of a named project.
pub trait GraphSource {
    fn dependency_graph(&self, name: &str, url: &str) -> AnnotatorResult<DependencyGraph>;
}
