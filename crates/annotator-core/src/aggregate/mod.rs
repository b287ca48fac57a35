pub mod engine;
pub mod majority;

pub use engine::{aggregate_many, AggregatorBuilder, BoundAggregator};
pub use majority::majority_label;
