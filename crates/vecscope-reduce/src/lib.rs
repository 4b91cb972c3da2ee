//! Dimensionality reduction for the display space.
//!
//! Two interchangeable strategies implement [`Reducer`]:
//! - [`PcaReducer`]: linear, deterministic, projection onto the top principal axes.
//! - [`UmapReducer`]: non-linear neighbour-graph layout, reproducible for a fixed seed.
//!
//! Both are fitted once over the corpus; queries are placed with `transform`.

mod linalg;
mod pca;
mod umap;

pub use pca::PcaReducer;
pub use umap::{find_ab_params, UmapParams, UmapReducer};
pub use vecscope_core::traits::Reducer;

use vecscope_core::config::ReductionConfig;
use vecscope_core::error::{Error, Result};
use vecscope_core::types::ReductionMethod;

/// Creates an unfitted reducer for the configured strategy.
pub fn build_reducer(config: &ReductionConfig) -> Box<dyn Reducer> {
    match config.method {
        ReductionMethod::Pca => Box::new(PcaReducer::new(config.dims)),
        ReductionMethod::Umap => Box::new(UmapReducer::new(config.dims, UmapParams::from(config))),
    }
}

/// Checks that `data` is non-empty and rectangular; returns the input dimension.
pub(crate) fn check_input(data: &[Vec<f32>], target_dim: usize) -> Result<usize> {
    let first = data.first().ok_or_else(|| Error::Reduction("cannot fit on an empty set of vectors".into()))?;
    let dim = first.len();
    if dim == 0 {
        return Err(Error::Reduction("input vectors have zero dimensions".into()));
    }
    if let Some(bad) = data.iter().find(|v| v.len() != dim) {
        return Err(Error::DimensionMismatch { expected: dim, actual: bad.len() });
    }
    if dim < target_dim {
        return Err(Error::Reduction(format!("input dimension {dim} is smaller than target dimension {target_dim}")));
    }
    Ok(dim)
}
