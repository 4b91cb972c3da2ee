use candle_core::{Device, Tensor};
use tracing::debug;

use vecscope_core::error::{Error, Result};
use vecscope_core::traits::Reducer;
use vecscope_core::types::ReductionMethod;

use crate::check_input;
use crate::linalg::{matrix, norm, reduction_error, row};

const MAX_ITER: usize = 1000;
const TOLERANCE: f64 = 1e-12;

/// Principal component projection. The covariance matrix is built with a
/// tensor `matmul` and its leading eigenvectors are extracted by power
/// iteration, each orthogonalised against the axes already found. Start
/// vectors are fixed, so fitting the same data always yields the same axes;
/// each axis is sign-normalised so its largest loading is positive.
#[derive(Debug, Clone)]
pub struct PcaReducer {
    target_dim: usize,
    fitted: Option<Fitted>,
    explained_variance: Vec<f64>,
}

#[derive(Debug, Clone)]
struct Fitted {
    /// `[1, d]`
    mean: Tensor,
    /// `[d, k]`, one axis per column
    components: Tensor,
}

impl PcaReducer {
    pub fn new(target_dim: usize) -> Self {
        Self { target_dim, fitted: None, explained_variance: Vec::new() }
    }

    /// Variance captured by each fitted axis, in descending order.
    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }

    /// Fitted axes, one row per component. Empty before fit.
    pub fn components(&self) -> Result<Vec<Vec<f64>>> {
        match &self.fitted {
            Some(f) => f.components.t().and_then(|t| t.to_vec2::<f64>()).map_err(reduction_error),
            None => Ok(Vec::new()),
        }
    }

    pub fn fit(&mut self, data: &[Vec<f32>]) -> Result<()> {
        self.fit_project(data).map(|_| ())
    }

    /// Fits and returns the training coordinates as an `[n, k]` tensor.
    pub(crate) fn fit_project(&mut self, data: &[Vec<f32>]) -> Result<Tensor> {
        let dim = check_input(data, self.target_dim)?;
        let (fitted, variances, projected) = fit_tensors(data, dim, self.target_dim).map_err(reduction_error)?;
        for (c, variance) in variances.iter().enumerate() {
            debug!(component = c, variance, "pca axis fitted");
        }
        self.fitted = Some(fitted);
        self.explained_variance = variances;
        Ok(projected)
    }
}

impl Reducer for PcaReducer {
    fn method(&self) -> ReductionMethod { ReductionMethod::Pca }

    fn target_dim(&self) -> usize { self.target_dim }

    fn is_fitted(&self) -> bool { self.fitted.is_some() }

    fn fit_transform(&mut self, data: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
        let projected = self.fit_project(data)?;
        let rows = projected.to_vec2::<f64>().map_err(reduction_error)?;
        Ok(rows.into_iter().map(|r| r.into_iter().map(|x| x as f32).collect()).collect())
    }

    fn transform(&self, vector: &[f32]) -> Result<Vec<f32>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| Error::Reduction("PCA transform called before fit".into()))?;
        let expected = fitted.mean.dim(1).map_err(reduction_error)?;
        if vector.len() != expected {
            return Err(Error::DimensionMismatch { expected, actual: vector.len() });
        }
        let projected = row(vector)
            .and_then(|x| x.broadcast_sub(&fitted.mean))
            .and_then(|x| x.matmul(&fitted.components))
            .and_then(|x| x.squeeze(0))
            .and_then(|x| x.to_vec1::<f64>())
            .map_err(reduction_error)?;
        Ok(projected.into_iter().map(|x| x as f32).collect())
    }
}

fn fit_tensors(data: &[Vec<f32>], dim: usize, k: usize) -> candle_core::Result<(Fitted, Vec<f64>, Tensor)> {
    let n = data.len();
    let x = matrix(data)?;
    let mean = x.mean_keepdim(0)?;
    let centered = x.broadcast_sub(&mean)?;
    let denom = if n > 1 { (n - 1) as f64 } else { 1.0 };
    let covariance = (centered.t()?.matmul(&centered)? / denom)?;

    let mut axes: Vec<Tensor> = Vec::with_capacity(k);
    let mut variances = Vec::with_capacity(k);
    for c in 0..k {
        let basis = if axes.is_empty() { None } else { Some(Tensor::cat(&axes, 1)?) };
        let axis = match power_iteration(&covariance, basis.as_ref(), start_vector(dim, c)?)? {
            Some(axis) => axis,
            // No variance left outside the already fitted axes.
            None => fallback_axis(dim, basis.as_ref())?,
        };
        let axis = flip_sign(&axis)?;
        let variance = axis.t()?.matmul(&covariance.matmul(&axis)?)?.sum_all()?.to_scalar::<f64>()?;
        variances.push(variance.max(0.0));
        axes.push(axis);
    }
    let components = Tensor::cat(&axes, 1)?;
    let projected = centered.matmul(&components)?;
    Ok((Fitted { mean, components }, variances, projected))
}

/// Deterministic, non-degenerate `[d, 1]` start vector that differs per component.
fn start_vector(dim: usize, component: usize) -> candle_core::Result<Tensor> {
    let values: Vec<f64> = (0..dim)
        .map(|i| 1.0 + ((i + 1) as f64 * 0.618_033_988_75 + component as f64 * 0.414_213_562_37).fract())
        .collect();
    Tensor::from_vec(values, (dim, 1), &Device::Cpu)
}

/// Removes the part of `v` spanned by the orthonormal columns of `basis`.
fn orthogonalize(v: &Tensor, basis: Option<&Tensor>) -> candle_core::Result<Tensor> {
    match basis {
        Some(b) => v - b.matmul(&b.t()?.matmul(v)?)?,
        None => Ok(v.clone()),
    }
}

/// `v` scaled to unit length, or `None` when it has (numerically) vanished.
fn unit(v: &Tensor) -> candle_core::Result<Option<Tensor>> {
    let n = norm(v)?;
    if n <= TOLERANCE {
        return Ok(None);
    }
    Ok(Some((v / n)?))
}

/// Leading eigenvector of `covariance` restricted to the complement of `basis`.
fn power_iteration(covariance: &Tensor, basis: Option<&Tensor>, start: Tensor) -> candle_core::Result<Option<Tensor>> {
    let Some(mut v) = unit(&orthogonalize(&start, basis)?)? else {
        return Ok(None);
    };
    for _ in 0..MAX_ITER {
        let Some(w) = unit(&orthogonalize(&covariance.matmul(&v)?, basis)?)? else {
            return Ok(None);
        };
        let agreement = (&w * &v)?.sum_all()?.to_scalar::<f64>()?.abs();
        v = w;
        if 1.0 - agreement < TOLERANCE {
            break;
        }
    }
    Ok(Some(v))
}

/// First standard basis direction with a component outside `basis`.
fn fallback_axis(dim: usize, basis: Option<&Tensor>) -> candle_core::Result<Tensor> {
    for k in 0..dim {
        let mut e = vec![0f64; dim];
        e[k] = 1.0;
        let e = orthogonalize(&Tensor::from_vec(e, (dim, 1), &Device::Cpu)?, basis)?;
        if norm(&e)? > 1e-6 {
            return Ok((&e / norm(&e)?)?);
        }
    }
    Tensor::zeros((dim, 1), candle_core::DType::F64, &Device::Cpu)
}

fn flip_sign(v: &Tensor) -> candle_core::Result<Tensor> {
    let values = v.flatten_all()?.to_vec1::<f64>()?;
    let largest = values.iter().copied().fold(0f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
    if largest < 0.0 { v.neg() } else { Ok(v.clone()) }
}
