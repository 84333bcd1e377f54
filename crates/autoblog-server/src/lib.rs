//! # autoblog-server
//!
//! The interactions service: an append-only store of reader highlights,
//! keyed by post slug.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET  | `/interactions?slug={slug}` | [`routes::list_interactions`] |
//! | POST | `/interactions` | [`routes::create_interaction`] |

pub mod error;
pub mod routes;
pub mod state;

use autoblog_engine::highlight::wire::INTERACTIONS_PATH;
use axum::Router;
use axum::routing::get;

pub use error::{ApiError, StorageError};
pub use state::{AppState, InteractionStore};

pub fn app(state: AppState) -> Router {
    Router::new()
        .route(
            INTERACTIONS_PATH,
            get(routes::list_interactions).post(routes::create_interaction),
        )
        .with_state(state)
}
