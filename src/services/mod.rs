pub mod aggregator;
pub mod attributes;
pub mod overall;
pub mod rating_engine;

pub use rating_engine::*;
