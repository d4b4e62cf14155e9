//! Social publishing endpoints - drafts, publishing, status, accounts,
//! sync, and media

pub mod accounts;
pub mod drafts;
pub mod dto;
pub mod media;
pub mod publish;
pub mod status;
pub mod sync;

use axum::Router;
use std::sync::Arc;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(drafts::routes())
        .merge(publish::routes())
        .merge(status::routes())
        .merge(accounts::routes())
        .merge(sync::routes())
        .merge(media::routes())
}
