use axum::extract::State;
use axum::Json;
use serde::Serialize;

use vecscope_core::types::{ChunkPoint, ReductionMethod};

use crate::state::AppState;

/// Full corpus dump used for the initial render.
#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub points: Vec<ChunkPoint>,
    pub method: ReductionMethod,
    pub dims: usize,
}

pub async fn get_data(State(state): State<AppState>) -> Json<DataResponse> {
    let index = &state.index;
    tracing::debug!(points = index.len(), "serving corpus points");
    Json(DataResponse { points: index.points(), method: index.method(), dims: index.dims() })
}
