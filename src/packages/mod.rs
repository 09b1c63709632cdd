pub mod datasets;
pub mod emitter;
pub mod error;
pub mod evaluate;
pub mod formatter;
pub mod indexer;
pub mod miner;
pub mod output;
pub mod preprocess;
pub mod tree;
pub mod vectorize;

/// Marker substituted for every position judged variable.
pub const WILDCARD: &str = "<*>";
