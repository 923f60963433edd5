pub mod batch_reader;
pub mod dataset;
pub mod genre_cache;
pub mod genre_resolver;
pub mod merge;
pub mod orchestrator;
pub mod seen;

pub use orchestrator::Orchestrator;
