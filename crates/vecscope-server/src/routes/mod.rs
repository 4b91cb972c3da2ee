//! API route handlers
//!
//! - `health`: liveness and index summary
//! - `data`: bulk export of every chunk's display position
//! - `query`: query projection and nearest-neighbour search

pub mod data;
pub mod health;
pub mod query;

use crate::error::ServerError;

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
