//! Dependency-graph extraction through the external analysis tool.
//!
//! The tool is driven by a shell script that clones the repository, analyses
//! it, and writes `<output_root>/arcanOutput/<project>/*.graphml`. The script
//! is invoked once per project; failures are captured, never retried.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::config::AnnotatorConfig;
use crate::errors::{AnnotatorError, AnnotatorResult};
use crate::extract::GraphSource;
use crate::graph::graphml::parse_graphml_file;
use crate::graph::{DependencyGraph, Partition, PartitionProvider};
use crate::guards::{GRAPH_FILE_EXTENSION, TOOL_OUTPUT_DIR};

const CANONICAL_LANGUAGES: &[&str] = &["JAVA", "CPP", "C", "ASML", "CSHARP", "PYTHON"];

/// Language name as the analysis tool expects it.
pub fn tool_language(language: &str) -> String {
    if CANONICAL_LANGUAGES.contains(&language) {
        return language.to_string();
    }
    match language {
        "C++" => "CPP".to_string(),
        "C#" => "CSHARP".to_string(),
        other => other.to_uppercase(),
    }
}

/// First file (by name) directly inside `directory` ending with `extension`.
pub fn find_file_by_extension(directory: &Path, extension: &str) -> Option<PathBuf> {
    let found = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| entry.file_name().to_string_lossy().ends_with(extension))
        .map(|entry| entry.into_path());
    if found.is_none() {
        debug!(
            "No file with extension {} found in {}",
            extension,
            directory.display()
        );
    }
    found
}

/// Tool settings shared by every project extraction.
#[derive(Clone, Debug)]
pub struct ComponentExtractor {
    script: PathBuf,
    tool_path: PathBuf,
    repository_path: PathBuf,
    output_root: PathBuf,
    logs_path: PathBuf,
    language: String,
    reuse_existing: bool,
}

impl ComponentExtractor {
    pub fn new(config: &AnnotatorConfig, language: &str) -> Self {
        Self {
            script: config.tool_script.clone(),
            tool_path: config.tool_path.clone(),
            repository_path: config.repository_path.clone(),
            output_root: config.output_root.clone(),
            logs_path: config.logs_path.clone(),
            language: tool_language(language),
            reuse_existing: false,
        }
    }

    pub fn from_config(config: &AnnotatorConfig) -> Self {
        Self::new(config, &config.language)
    }

    /// Skip the tool for projects whose output directory already exists.
    pub fn reuse_existing(mut self, reuse: bool) -> Self {
        self.reuse_existing = reuse;
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Bind a project. Only a bound extraction can run the tool or load a graph.
    pub fn for_project(&self, name: &str, url: &str) -> ProjectExtraction<'_> {
        ProjectExtraction {
            extractor: self,
            name: name.to_string(),
            url: url.to_string(),
            tool_run: false,
            graph: None,
        }
    }

    fn project_output_dir(&self, name: &str) -> PathBuf {
        self.output_root.join(TOOL_OUTPUT_DIR).join(name)
    }
}

/// Extraction state for one project.
pub struct ProjectExtraction<'a> {
    extractor: &'a ComponentExtractor,
    name: String,
    url: String,
    tool_run: bool,
    graph: Option<DependencyGraph>,
}

impl ProjectExtraction<'_> {
    pub fn output_dir(&self) -> PathBuf {
        self.extractor.project_output_dir(&self.name)
    }

    fn command_args(&self) -> Vec<String> {
        let e = self.extractor;
        vec![
            self.url.clone(),
            self.name.clone(),
            e.language.clone(),
            e.tool_path.to_string_lossy().into_owned(),
            e.repository_path.to_string_lossy().into_owned(),
            e.output_root.to_string_lossy().into_owned(),
            e.logs_path.join("arcan").to_string_lossy().into_owned(),
        ]
    }

    /// Run the analysis script once.
    pub fn run_tool(&mut self) -> AnnotatorResult<()> {
        let args = self.command_args();
        info!(
            "Running command: {} {}",
            self.extractor.script.display(),
            args.join(" ")
        );

        let status = Command::new(&self.extractor.script)
            .args(&args)
            .status()
            .map_err(|e| {
                error!("Failed to extract graph for {}: {e}", self.name);
                AnnotatorError::Extraction(format!(
                    "cannot launch {}: {e}",
                    self.extractor.script.display()
                ))
            })?;
        self.tool_run = true;

        if !status.success() {
            error!("Failed to extract graph for {}: {status}", self.name);
            return Err(AnnotatorError::Extraction(format!(
                "analysis of {} exited with {status}",
                self.name
            )));
        }
        info!("Finished extracting graph for {}", self.name);
        Ok(())
    }

    /// The project's dependency graph, running the tool first if needed.
    pub fn dependency_graph(&mut self) -> AnnotatorResult<&DependencyGraph> {
        if self.graph.is_none() {
            let dir = self.output_dir();
            let skip = self.tool_run || (self.extractor.reuse_existing && dir.is_dir());
            if !skip {
                self.run_tool()?;
            }
            if !dir.is_dir() {
                return Err(AnnotatorError::IllegalState(format!(
                    "project directory {} cannot be found",
                    dir.display()
                )));
            }
            let file = find_file_by_extension(&dir, GRAPH_FILE_EXTENSION).ok_or_else(|| {
                AnnotatorError::Extraction(format!("no graph file in {}", dir.display()))
            })?;
            self.graph = Some(parse_graphml_file(&file)?);
        }
        self.graph
            .as_ref()
            .ok_or_else(|| AnnotatorError::IllegalState("dependency graph unavailable".into()))
    }

    pub fn into_graph(mut self) -> AnnotatorResult<DependencyGraph> {
        self.dependency_graph()?;
        self.graph
            .take()
            .ok_or_else(|| AnnotatorError::IllegalState("dependency graph unavailable".into()))
    }

    /// Partition the project's graph with `provider`.
    pub fn partition_with(&mut self, provider: &dyn PartitionProvider) -> AnnotatorResult<Partition> {
        let graph = self.dependency_graph()?;
        provider.partition(graph)
    }
}

impl GraphSource for ComponentExtractor {
    fn dependency_graph(&self, name: &str, url: &str) -> AnnotatorResult<DependencyGraph> {
        self.for_project(name, url).into_graph()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ConnectedComponents;

    const GRAPH: &str = r#"<graphml>
  <key id="p" for="node" attr.name="filePathRelative"/>
  <graph>
    <node id="1"><data key="p">/A</data></node>
    <node id="2"><data key="p">/B</data></node>
    <edge source="1" target="2"/>
  </graph>
</graphml>"#;

    fn config(root: &Path) -> AnnotatorConfig {
        AnnotatorConfig {
            tool_script: root.join("run-tool.sh"),
            output_root: root.to_path_buf(),
            logs_path: root.join("logs"),
            ..Default::default()
        }
    }

    fn seed_output(root: &Path, project: &str) {
        let dir = root.join(TOOL_OUTPUT_DIR).join(project);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("notes.txt"), "x").unwrap();
        std::fs::write(dir.join("deps.graphml"), GRAPH).unwrap();
    }

    #[test]
    fn language_names() {
        assert_eq!(tool_language("JAVA"), "JAVA");
        assert_eq!(tool_language("java"), "JAVA");
        assert_eq!(tool_language("C++"), "CPP");
        assert_eq!(tool_language("C#"), "CSHARP");
        assert_eq!(tool_language("python"), "PYTHON");
    }

    #[test]
    fn finds_first_matching_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.graphml"), "").unwrap();
        std::fs::write(dir.path().join("a.graphml"), "").unwrap();
        std::fs::write(dir.path().join("c.txt"), "").unwrap();
        let found = find_file_by_extension(dir.path(), ".graphml").unwrap();
        assert_eq!(found.file_name().unwrap(), "a.graphml");
        assert!(find_file_by_extension(dir.path(), ".json").is_none());
    }

    #[test]
    fn reuses_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        seed_output(dir.path(), "demo");
        let extractor = ComponentExtractor::new(&config(dir.path()), "java").reuse_existing(true);
        let graph = extractor.dependency_graph("demo", "https://github.com/o/demo.git").unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.file_path_of("2"), Some("/B"));
    }

    #[test]
    fn missing_script_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = ComponentExtractor::new(&config(dir.path()), "java");
        let err = extractor.dependency_graph("demo", "url").unwrap_err();
        assert!(matches!(err, AnnotatorError::Extraction(_)));
    }

    #[test]
    fn missing_output_is_illegal_state() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = ComponentExtractor::new(&config(dir.path()), "java").reuse_existing(true);
        let mut extraction = extractor.for_project("ghost", "url");
        extraction.tool_run = true;
        assert!(matches!(
            extraction.dependency_graph(),
            Err(AnnotatorError::IllegalState(_))
        ));
    }

    #[test]
    fn partitions_the_loaded_graph() {
        let dir = tempfile::tempdir().unwrap();
        seed_output(dir.path(), "demo");
        let extractor = ComponentExtractor::new(&config(dir.path()), "java").reuse_existing(true);
        let mut extraction = extractor.for_project("demo", "url");
        let partition = extraction.partition_with(&ConnectedComponents).unwrap();
        assert_eq!(partition.len(), 1);
        assert_eq!(partition.communities()[0].len(), 2);
    }

    #[test]
    fn command_args_follow_tool_contract() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = ComponentExtractor::new(&config(dir.path()), "C#");
        assert_eq!(ComponentExtractor::from_config(&config(dir.path())).language(), "JAVA");
        let extraction = extractor.for_project("demo", "https://x/demo.git");
        let args = extraction.command_args();
        assert_eq!(args.len(), 7);
        assert_eq!(args[0], "https://x/demo.git");
        assert_eq!(args[1], "demo");
        assert_eq!(args[2], "CSHARP");
        assert!(args[6].ends_with("logs/arcan"));
    }
}
