//! Component aggregation engine.
//!
//! Reconciles a partition of the dependency graph with the weak-label table:
//! every matched file is stamped with its community ordinal, the community's
//! majority label, and whether its own label disagrees with that majority.
//!
//! Binding is two-stage. An [`AggregatorBuilder`] collects the four inputs
//! and only yields a [`BoundAggregator`] once all of them are present, so an
//! aggregation can never run against a partial binding.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::aggregate::majority::majority_label;
use crate::errors::{AnnotatorError, AnnotatorResult};
use crate::graph::{Community, DependencyGraph, Partition};
use crate::models::{
    AggregationCase, ComponentRecord, FileRecord, ProjectAnnotationDataset, WeakLabelTable,
};
use crate::store::AnnotationSink;

/// Unbound aggregation inputs.
#[derive(Clone, Debug, Default)]
pub struct AggregatorBuilder {
    partition: Option<Partition>,
    weak_labels: Option<WeakLabelTable>,
    graph: Option<DependencyGraph>,
    project_name: Option<String>,
}

impl AggregatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition(mut self, partition: Partition) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn weak_labels(mut self, table: WeakLabelTable) -> Self {
        self.weak_labels = Some(table);
        self
    }

    pub fn graph(mut self, graph: DependencyGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    /// Bind the inputs. Fails with `IllegalState` naming the first missing one.
    pub fn build(self) -> AnnotatorResult<BoundAggregator> {
        let missing = |what: &str| {
            AnnotatorError::IllegalState(format!("aggregator is not bound: missing {what}"))
        };
        Ok(BoundAggregator {
            partition: self.partition.ok_or_else(|| missing("partition"))?,
            weak_labels: self.weak_labels.ok_or_else(|| missing("weak-label table"))?,
            graph: self.graph.ok_or_else(|| missing("dependency graph"))?,
            project_name: self.project_name.ok_or_else(|| missing("project name"))?,
        })
    }
}

/// Fully bound, immutable aggregation inputs for one project.
#[derive(Clone, Debug)]
pub struct BoundAggregator {
    partition: Partition,
    weak_labels: WeakLabelTable,
    graph: DependencyGraph,
    project_name: String,
}

impl BoundAggregator {
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Weak-label rows matched by the community's nodes, in member order.
    ///
    /// Nodes without a path attribute, unknown to the graph, or whose path has
    /// no row in the table contribute nothing.
    fn matched_files<'a>(&'a self, community: &'a Community) -> Vec<&'a FileRecord> {
        community
            .members()
            .filter_map(|id| self.graph.file_path_of(id))
            .flat_map(|path| self.weak_labels.lookup(path))
            .collect()
    }

    /// Build the project annotation dataset.
    pub fn create_aggregate(&self) -> ProjectAnnotationDataset {
        if self.partition.is_empty() {
            info!(
                "Project {}: partition has no communities",
                self.project_name
            );
            return ProjectAnnotationDataset::degenerate(
                &self.project_name,
                AggregationCase::NoCommunitiesFound,
            );
        }

        let mut records: Vec<ComponentRecord> = Vec::new();
        for (component, community) in self.partition.communities().iter().enumerate() {
            let matched = self.matched_files(community);
            let label = majority_label(matched.iter().map(|f| f.label.as_str()));
            debug!(
                "Project {}: community {} has {} nodes, {} matched files, majority label {}",
                self.project_name,
                component,
                community.len(),
                matched.len(),
                label
            );
            records.extend(
                matched
                    .into_iter()
                    .map(|file| ComponentRecord::stamp(file.clone(), component, &label)),
            );
        }

        if records.is_empty() {
            info!(
                "Project {}: no graph node path matched the weak-label table",
                self.project_name
            );
            return ProjectAnnotationDataset::degenerate(
                &self.project_name,
                AggregationCase::NoFileMatches,
            );
        }

        let dataset = ProjectAnnotationDataset::success(&self.project_name, records);
        info!(
            "Project {}: aggregated {} rows over {} communities ({} mismatches)",
            self.project_name,
            dataset.len(),
            self.partition.len(),
            dataset.mismatch_count()
        );
        dataset
    }

    /// Build the dataset and hand it to `sink` before returning it.
    pub fn create_and_persist(
        &self,
        sink: &dyn AnnotationSink,
    ) -> AnnotatorResult<ProjectAnnotationDataset> {
        let dataset = self.create_aggregate();
        sink.write(&dataset)?;
        Ok(dataset)
    }
}

/// Aggregate several projects in parallel, each on its own bound instance.
///
/// Results are returned in input order. A project whose inputs are not fully
/// bound yields its `IllegalState` error without affecting the others.
pub fn aggregate_many(
    builders: Vec<AggregatorBuilder>,
) -> Vec<AnnotatorResult<ProjectAnnotationDataset>> {
    builders
        .into_par_iter()
        .map(|builder| builder.build().map(|bound| bound.create_aggregate()))
        .collect()
}
