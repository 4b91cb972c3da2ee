//! Tensor helpers shared by the reducers. Everything runs in `f64` on the CPU
//! device; the corpus is small and reproducibility matters more than speed.
use candle_core::{Device, Tensor};

use vecscope_core::error::Error;

const NORM_EPS: f64 = 1e-12;

pub(crate) fn reduction_error(e: candle_core::Error) -> Error {
    Error::Reduction(e.to_string())
}

/// Stacks rectangular rows into an `[n, d]` tensor.
pub(crate) fn matrix(rows: &[Vec<f32>]) -> candle_core::Result<Tensor> {
    let n = rows.len();
    let d = rows.first().map_or(0, Vec::len);
    let flat: Vec<f64> = rows.iter().flatten().map(|x| f64::from(*x)).collect();
    Tensor::from_vec(flat, (n, d), &Device::Cpu)
}

/// A single vector as a `[1, d]` row.
pub(crate) fn row(vector: &[f32]) -> candle_core::Result<Tensor> {
    let flat: Vec<f64> = vector.iter().map(|x| f64::from(*x)).collect();
    Tensor::from_vec(flat, (1, vector.len()), &Device::Cpu)
}

/// Rows scaled to unit length. Zero rows stay zero.
pub(crate) fn unit_rows(x: &Tensor) -> candle_core::Result<Tensor> {
    let norms = x.sqr()?.sum_keepdim(1)?.sqrt()?.maximum(NORM_EPS)?;
    x.broadcast_div(&norms)
}

/// Pairwise cosine distances `[n, m]` between the rows of two unit-row
/// matrices, clamped to `[0, 2]`. A zero row sits at distance 1 from everything.
pub(crate) fn cosine_distances(a_unit: &Tensor, b_unit: &Tensor) -> candle_core::Result<Tensor> {
    a_unit.matmul(&b_unit.t()?)?.affine(-1.0, 1.0)?.clamp(0.0, 2.0)
}

/// Euclidean norm of every element.
pub(crate) fn norm(v: &Tensor) -> candle_core::Result<f64> {
    v.sqr()?.sum_all()?.sqrt()?.to_scalar::<f64>()
}

/// Indices of the `k` smallest entries of `distances`, excluding `skip`.
/// Ties go to the lower index.
pub(crate) fn smallest(distances: &[f64], k: usize, skip: Option<usize>) -> Vec<(usize, f64)> {
    let mut scored: Vec<(usize, f64)> =
        distances.iter().copied().enumerate().filter(|(j, _)| Some(*j) != skip).collect();
    scored.sort_by(|x, y| x.1.total_cmp(&y.1).then(x.0.cmp(&y.0)));
    scored.truncate(k);
    scored
}
