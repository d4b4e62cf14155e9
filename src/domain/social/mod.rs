//! Social publishing domain - models and queries for drafts, connections,
//! and per-platform publish results

pub mod models;
pub mod queries;

// Re-export models for convenience
pub use models::*;

// Re-export query modules
pub use queries::{connections, drafts, publish_results};
