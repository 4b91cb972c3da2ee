//! HTTP presentation service.
//!
//! Serves the frozen [`RetrievalIndex`](vecscope_index::RetrievalIndex):
//! `GET /api/data`, `POST /api/query`, `POST /api/neighbors` and `GET /health`.

pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ServerError, ServerResult};
pub use server::{build_router, serve};
pub use state::AppState;
