use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use vecscope_core::types::NeighborResult;
use vecscope_core::validation::{neighbor_count, validate_query};
use vecscope_index::RetrievalIndex;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Body of `POST /api/query`. `query` is kept as raw JSON so that a missing,
/// `null` or non-string value is a validation error rather than a parse error.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub text: String,
    pub position: Vec<f32>,
}

/// Body of `POST /api/neighbors`. `query` and `n` are kept as raw JSON so
/// that wrong types, negative, zero and oversized counts reach validation
/// instead of failing to parse.
#[derive(Debug, Deserialize)]
pub struct NeighborsRequest {
    #[serde(default)]
    pub query: Option<Value>,
    #[serde(default)]
    pub n: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct NeighborsResponse {
    pub query: String,
    pub neighbors: Vec<NeighborResult>,
}

pub async fn project_query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> ServerResult<Json<QueryResponse>> {
    let Json(request) = payload?;
    let query = query_text(request.query)?;

    let projection = run_blocking(&state, move |index| index.project(&query)).await?;
    Ok(Json(QueryResponse { text: projection.text, position: projection.position }))
}

pub async fn find_neighbors(
    State(state): State<AppState>,
    payload: Result<Json<NeighborsRequest>, JsonRejection>,
) -> ServerResult<Json<NeighborsResponse>> {
    let Json(request) = payload?;
    let query = query_text(request.query)?;
    let k = requested_count(request.n.as_ref(), state.default_neighbors)?;

    let neighbors = {
        let query = query.clone();
        run_blocking(&state, move |index| index.neighbors(&query, k)).await?
    };
    Ok(Json(NeighborsResponse { query, neighbors }))
}

/// Extracts the query text; anything but a non-blank string is rejected.
fn query_text(raw: Option<Value>) -> ServerResult<String> {
    match raw {
        Some(Value::String(text)) => {
            validate_query(&text)?;
            Ok(text)
        }
        None | Some(Value::Null) => Err(ServerError::Validation("query is required".into())),
        Some(other) => Err(ServerError::Validation(format!("query must be a string, got {other}"))),
    }
}

/// Resolves the requested neighbour count. Absent or `null` means the
/// configured default; integers beyond `i64` are treated as "everything".
fn requested_count(raw: Option<&Value>, default: usize) -> ServerResult<usize> {
    match raw {
        None | Some(Value::Null) => Ok(default),
        Some(v) => {
            if let Some(n) = v.as_i64() {
                Ok(neighbor_count(n)?)
            } else if v.as_u64().is_some() {
                Ok(usize::MAX)
            } else {
                Err(ServerError::Validation(format!("n must be an integer, got {v}")))
            }
        }
    }
}

/// Runs embedding work on the blocking pool under the configured timeout.
/// A timed-out task is left to finish on its own; it only reads the index.
async fn run_blocking<T, F>(state: &AppState, work: F) -> ServerResult<T>
where
    F: FnOnce(&RetrievalIndex) -> vecscope_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let index = Arc::clone(&state.index);
    let task = tokio::task::spawn_blocking(move || work(&index));
    match tokio::time::timeout(state.query_timeout, task).await {
        Ok(Ok(result)) => Ok(result?),
        Ok(Err(join_error)) => Err(ServerError::Internal(format!("query task failed: {join_error}"))),
        Err(_) => Err(ServerError::EmbeddingUnavailable(format!(
            "embedding did not finish within {} ms",
            state.query_timeout.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_text_accepts_only_non_blank_strings() {
        assert_eq!(query_text(Some(json!("rivers"))).unwrap(), "rivers");
        for bad in [None, Some(Value::Null), Some(json!(42)), Some(json!("  ")), Some(json!(["a"])), Some(json!({"q": 1}))] {
            assert!(matches!(query_text(bad.clone()), Err(ServerError::Validation(_))), "{bad:?}");
        }
    }

    #[test]
    fn missing_or_null_count_uses_default() {
        assert_eq!(requested_count(None, 5).unwrap(), 5);
        assert_eq!(requested_count(Some(&Value::Null), 7).unwrap(), 7);
    }

    #[test]
    fn non_positive_and_non_integer_counts_are_rejected() {
        for bad in [json!(0), json!(-3), json!(2.5), json!("4"), json!([1])] {
            assert!(matches!(requested_count(Some(&bad), 5), Err(ServerError::Validation(_))), "{bad}");
        }
    }

    #[test]
    fn huge_counts_pass_through_for_clamping() {
        assert_eq!(requested_count(Some(&json!(u64::MAX)), 5).unwrap(), usize::MAX);
        assert_eq!(requested_count(Some(&json!(12)), 5).unwrap(), 12);
    }
}
