// storage/mod.rs
// Database operations module

mod binding;
pub mod pipeline;
pub mod pool;
mod statement;
#[cfg(test)]
pub(crate) mod test_helpers;
mod upsert;

// Re-export commonly used items
pub use pipeline::{OnConnect, SqlPipeline};
pub use pool::ResilientPool;
