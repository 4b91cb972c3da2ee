use std::sync::Arc;
use std::time::Duration;

use vecscope_core::config::ServerConfig;
use vecscope_index::RetrievalIndex;

/// Shared application state. The index is built before the server starts
/// and is never mutated afterwards, so handlers only need an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<RetrievalIndex>,
    pub default_neighbors: usize,
    pub query_timeout: Duration,
    pub enable_cors: bool,
}

impl AppState {
    pub fn new(index: Arc<RetrievalIndex>, config: &ServerConfig) -> Self {
        Self {
            index,
            default_neighbors: config.default_neighbors,
            query_timeout: Duration::from_millis(config.query_timeout_ms),
            enable_cors: config.enable_cors,
        }
    }
}
