pub mod graphml;
pub mod partition;
pub mod store;

pub use partition::{Community, ConnectedComponents, FixedPartition, Partition, PartitionProvider};
pub use store::{DependencyGraph, GraphNode};
