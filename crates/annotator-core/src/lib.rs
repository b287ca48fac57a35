//! Annotator core library: consensus architectural-component labels for the
//! files of a software project.
//!
//! A project's file-dependency graph is split into communities by a
//! partition provider, and every file carries a weak label from an external
//! classifier. The aggregation engine reconciles the two into one dataset per
//! project: each matched file is stamped with its community, the community's
//! majority label, and whether its own label disagrees. Degenerate outcomes
//! (no communities, no path matches) are recorded as data, not raised.

pub mod aggregate;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod extract;
pub mod graph;
pub mod guards;
pub mod labels;
pub mod models;
pub mod pipeline;
pub mod store;

pub use aggregate::{aggregate_many, AggregatorBuilder, BoundAggregator};
pub use errors::{AnnotatorError, AnnotatorResult};
pub use models::{AggregationCase, ComponentRecord, FileRecord, ProjectAnnotationDataset, WeakLabelTable};
