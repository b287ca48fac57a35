//! Project annotation pipeline.
//!
//! Sequences discovery, graph extraction, partitioning, weak labelling,
//! aggregation and export. Each collaborator is injected, so the pipeline
//! itself holds no process-wide state.

use std::time::Instant;

use tracing::{info, warn};

use crate::aggregate::AggregatorBuilder;
use crate::discovery::{DiscoveryConfig, RepositorySearch};
use crate::errors::AnnotatorResult;
use crate::extract::GraphSource;
use crate::graph::PartitionProvider;
use crate::labels::WeakLabeler;
use crate::models::{AggregationCase, ProjectAnnotationDataset};
use crate::store::AnnotationSink;

/// Outcome of a batch run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchReport {
    pub succeeded: Vec<(String, AggregationCase)>,
    pub failed: Vec<(String, String)>,
    pub elapsed_ms: i64,
}

impl BatchReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

pub struct ComponentAnnotator<'a> {
    search: &'a dyn RepositorySearch,
    graphs: &'a dyn GraphSource,
    partitions: &'a dyn PartitionProvider,
    labeler: &'a dyn WeakLabeler,
    sink: &'a dyn AnnotationSink,
    discovery: DiscoveryConfig,
    languages: Vec<String>,
}

impl<'a> ComponentAnnotator<'a> {
    pub fn new(
        search: &'a dyn RepositorySearch,
        graphs: &'a dyn GraphSource,
        partitions: &'a dyn PartitionProvider,
        labeler: &'a dyn WeakLabeler,
        sink: &'a dyn AnnotationSink,
    ) -> Self {
        let discovery = DiscoveryConfig::default();
        let languages = vec![discovery.language.clone()];
        Self {
            search,
            graphs,
            partitions,
            labeler,
            sink,
            discovery,
            languages,
        }
    }

    pub fn with_discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.languages = vec![discovery.language.clone()];
        self.discovery = discovery;
        self
    }

    /// Annotate one project and export the result.
    pub fn annotate_project(&self, name: &str, url: &str) -> AnnotatorResult<ProjectAnnotationDataset> {
        let graph = self.graphs.dependency_graph(name, url)?;
        let partition = self.partitions.partition(&graph)?;
        info!(
            "Project {name}: {} nodes, {} edges, {} communities",
            graph.node_count(),
            graph.edge_count(),
            partition.len()
        );

        let labels = self.labeler.annotate_project(name, url, &self.languages)?;
        if labels.is_empty() {
            warn!("Project {name}: classifier returned an empty weak-label table");
        }

        AggregatorBuilder::new()
            .partition(partition)
            .weak_labels(labels)
            .graph(graph)
            .project_name(name)
            .build()?
            .create_and_persist(self.sink)
    }

    /// Discover up to `amount` projects and annotate each one.
    ///
    /// A failing project is logged and recorded; the batch continues.
    pub fn annotate_projects(&self, amount: usize) -> AnnotatorResult<BatchReport> {
        let started = Instant::now();
        let projects = self.search.find_projects(&self.discovery, amount)?;
        let mut report = BatchReport::default();

        for project in projects {
            match self.annotate_project(&project.name, &project.clone_url()) {
                Ok(dataset) => report.succeeded.push((project.name, dataset.case())),
                Err(e) => {
                    warn!("Project {} failed: {e}", project.name);
                    report.failed.push((project.name, e.to_string()));
                }
            }
        }

        report.elapsed_ms = started.elapsed().as_millis() as i64;
        info!(
            "Annotated {} of {} projects in {} ms",
            report.succeeded.len(),
            report.attempted(),
            report.elapsed_ms
        );
        Ok(report)
    }
}
