//! Social domain queries

pub mod connections;
pub mod drafts;
pub mod publish_results;
