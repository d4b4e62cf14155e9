//! Social domain models

mod connection;
mod draft;
mod publish_result;

pub use connection::{Connection, Ownership};
pub use draft::{ContentShape, Draft, DraftStatus, classify_content, status_for_schedule};
pub use publish_result::PublishResult;
