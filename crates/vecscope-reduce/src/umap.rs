//! Neighbour-graph layout in the style of UMAP.
//!
//! Fit: cosine kNN graph from a tensor distance matrix, smooth-kNN
//! memberships, fuzzy union, PCA initialisation, then seeded SGD with
//! negative sampling. The RNG is seeded from [`UmapParams::seed`], so the
//! same corpus always gets the same layout.
//!
//! Transform: a new point is placed at the membership-weighted mean of the
//! fitted positions of its nearest training points. Nothing is refit.
use std::collections::BTreeMap;
use std::time::Instant;

use candle_core::{Device, Tensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use vecscope_core::config::ReductionConfig;
use vecscope_core::error::{Error, Result};
use vecscope_core::traits::Reducer;
use vecscope_core::types::ReductionMethod;

use crate::linalg::{cosine_distances, matrix, reduction_error, row, smallest, unit_rows};
use crate::{check_input, PcaReducer};

const SMOOTH_K_TOLERANCE: f64 = 1e-5;
const MIN_K_DIST_SCALE: f64 = 1e-3;
const BISECTION_STEPS: usize = 64;
const INIT_SCALE: f64 = 10.0;
const GRAD_CLIP: f64 = 4.0;

#[derive(Debug, Clone, PartialEq)]
pub struct UmapParams {
    pub n_neighbors: usize,
    pub min_dist: f32,
    pub spread: f32,
    pub n_epochs: usize,
    pub seed: u64,
    pub negative_sample_rate: usize,
    pub learning_rate: f64,
}

impl Default for UmapParams {
    fn default() -> Self {
        Self {
            n_neighbors: 15,
            min_dist: 0.1,
            spread: 1.0,
            n_epochs: 200,
            seed: 42,
            negative_sample_rate: 5,
            learning_rate: 1.0,
        }
    }
}

impl From<&ReductionConfig> for UmapParams {
    fn from(config: &ReductionConfig) -> Self {
        Self {
            n_neighbors: config.n_neighbors,
            min_dist: config.min_dist,
            spread: config.spread,
            n_epochs: config.n_epochs,
            seed: config.seed,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct UmapReducer {
    target_dim: usize,
    params: UmapParams,
    fitted: Option<Fitted>,
}

#[derive(Debug, Clone)]
struct Fitted {
    /// Training vectors with unit-length rows, `[n, d]`.
    training: Tensor,
    /// Layout positions, `[n, target_dim]`.
    embedding: Tensor,
}

impl UmapReducer {
    pub fn new(target_dim: usize, params: UmapParams) -> Self {
        Self { target_dim, params, fitted: None }
    }

    pub fn params(&self) -> &UmapParams {
        &self.params
    }

    fn effective_k(&self, n: usize) -> usize {
        self.params.n_neighbors.min(n.saturating_sub(1)).max(1)
    }

    fn fit(&mut self, data: &[Vec<f32>]) -> Result<Vec<Vec<f64>>> {
        check_input(data, self.target_dim)?;
        let started = Instant::now();
        let n = data.len();
        let training = matrix(data).and_then(|x| unit_rows(&x)).map_err(reduction_error)?;
        if n == 1 {
            let embedding = vec![vec![0.0; self.target_dim]];
            self.store(training, &embedding)?;
            return Ok(embedding);
        }

        let k = self.effective_k(n);
        let distances = cosine_distances(&training, &training)
            .and_then(|d| d.to_vec2::<f64>())
            .map_err(reduction_error)?;
        let knn: Vec<Vec<(usize, f64)>> =
            distances.iter().enumerate().map(|(i, row)| smallest(row, k, Some(i))).collect();

        let edges = fuzzy_union(&knn);
        let (a, b) = find_ab_params(self.params.spread, self.params.min_dist);
        let mut embedding = self.initial_layout(data)?;
        self.optimize(&mut embedding, &edges, a, b);

        info!(points = n, neighbors = k, edges = edges.len(), a, b, elapsed = ?started.elapsed(), "umap layout fitted");
        self.store(training, &embedding)?;
        Ok(embedding)
    }

    fn store(&mut self, training: Tensor, embedding: &[Vec<f64>]) -> Result<()> {
        let flat: Vec<f64> = embedding.iter().flatten().copied().collect();
        let embedding = Tensor::from_vec(flat, (embedding.len(), self.target_dim), &Device::Cpu).map_err(reduction_error)?;
        self.fitted = Some(Fitted { training, embedding });
        Ok(())
    }

    /// PCA coordinates rescaled so the largest absolute coordinate is
    /// `INIT_SCALE`, plus a tiny seeded jitter.
    fn initial_layout(&self, data: &[Vec<f32>]) -> Result<Vec<Vec<f64>>> {
        let coords = PcaReducer::new(self.target_dim).fit_project(data)?;
        let (n, dim) = coords.dims2().map_err(reduction_error)?;
        let max_abs = coords
            .abs()
            .and_then(|c| c.max_all())
            .and_then(|m| m.to_scalar::<f64>())
            .map_err(reduction_error)?;
        let scale = if max_abs > 1e-12 { INIT_SCALE / max_abs } else { 1.0 };
        let mut rng = StdRng::seed_from_u64(self.params.seed ^ 0x9e37_79b9_7f4a_7c15);
        let jitter: Vec<f64> = (0..n * dim).map(|_| rng.gen_range(-1e-4_f64..1e-4)).collect();
        Tensor::from_vec(jitter, (n, dim), &Device::Cpu)
            .and_then(|j| (coords * scale)? + j)
            .and_then(|layout| layout.to_vec2::<f64>())
            .map_err(reduction_error)
    }

    /// Per-edge SGD. Each step reads positions written by the previous one,
    /// so this loop stays sequential over plain rows.
    fn optimize(&self, embedding: &mut [Vec<f64>], edges: &[(usize, usize, f64)], a: f64, b: f64) {
        let n = embedding.len();
        let n_epochs = self.params.n_epochs.max(1);
        let max_w = edges.iter().map(|e| e.2).fold(0f64, f64::max);
        // Edges too weak to be sampled even once are dropped.
        let edges: Vec<_> = edges.iter().copied().filter(|e| e.2 >= max_w / n_epochs as f64).collect();
        let epochs_per_sample: Vec<f64> = edges.iter().map(|e| max_w / e.2).collect();
        let neg_rate = self.params.negative_sample_rate.max(1) as f64;
        let epochs_per_negative: Vec<f64> = epochs_per_sample.iter().map(|e| e / neg_rate).collect();
        let mut next_sample = epochs_per_sample.clone();
        let mut next_negative = epochs_per_negative.clone();
        let mut rng = StdRng::seed_from_u64(self.params.seed);

        for epoch in 0..n_epochs {
            let alpha = self.params.learning_rate * (1.0 - epoch as f64 / n_epochs as f64);
            let now = epoch as f64;
            for (e, &(head, tail, _)) in edges.iter().enumerate() {
                if next_sample[e] > now {
                    continue;
                }
                let dist_sq = squared_distance(&embedding[head], &embedding[tail]);
                if dist_sq > 0.0 {
                    let coeff = -2.0 * a * b * dist_sq.powf(b - 1.0) / (a * dist_sq.powf(b) + 1.0);
                    for d in 0..self.target_dim {
                        let grad = clip(coeff * (embedding[head][d] - embedding[tail][d]));
                        embedding[head][d] += grad * alpha;
                        embedding[tail][d] -= grad * alpha;
                    }
                }
                next_sample[e] += epochs_per_sample[e];

                let n_neg = ((now - next_negative[e]) / epochs_per_negative[e]).floor().max(0.0) as usize;
                for _ in 0..n_neg {
                    let other = rng.gen_range(0..n);
                    if other == head {
                        continue;
                    }
                    let dist_sq = squared_distance(&embedding[head], &embedding[other]);
                    let coeff = if dist_sq > 0.0 { 2.0 * b / ((0.001 + dist_sq) * (a * dist_sq.powf(b) + 1.0)) } else { 0.0 };
                    for d in 0..self.target_dim {
                        let grad = if coeff > 0.0 { clip(coeff * (embedding[head][d] - embedding[other][d])) } else { GRAD_CLIP };
                        embedding[head][d] += grad * alpha;
                    }
                }
                next_negative[e] += n_neg as f64 * epochs_per_negative[e];
            }
        }
        debug!(epochs = n_epochs, "umap optimisation finished");
    }
}

impl Reducer for UmapReducer {
    fn method(&self) -> ReductionMethod { ReductionMethod::Umap }

    fn target_dim(&self) -> usize { self.target_dim }

    fn is_fitted(&self) -> bool { self.fitted.is_some() }

    fn fit_transform(&mut self, data: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
        let embedding = self.fit(data)?;
        Ok(embedding.into_iter().map(|row| row.into_iter().map(|x| x as f32).collect()).collect())
    }

    fn transform(&self, vector: &[f32]) -> Result<Vec<f32>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| Error::Reduction("UMAP transform called before fit".into()))?;
        let (n, expected) = fitted.training.dims2().map_err(reduction_error)?;
        if vector.len() != expected {
            return Err(Error::DimensionMismatch { expected, actual: vector.len() });
        }
        let distances = row(vector)
            .and_then(|q| unit_rows(&q))
            .and_then(|q| cosine_distances(&q, &fitted.training))
            .and_then(|d| d.squeeze(0))
            .and_then(|d| d.to_vec1::<f64>())
            .map_err(reduction_error)?;
        let k = self.params.n_neighbors.min(n).max(1);
        let neighbors = smallest(&distances, k, None);
        let weights = memberships(&neighbors);
        let total: f64 = weights.iter().sum();

        let position = if total > 1e-12 {
            let idx: Vec<u32> = neighbors.iter().map(|(i, _)| *i as u32).collect();
            let weights: Vec<f64> = weights.iter().map(|w| w / total).collect();
            weighted_mean(&fitted.embedding, idx, weights).map_err(reduction_error)?
        } else {
            let first = neighbors.first().map_or(0, |(i, _)| *i);
            fitted.embedding.get(first).and_then(|p| p.to_vec1::<f64>()).map_err(reduction_error)?
        };
        Ok(position.into_iter().map(|x| x as f32).collect())
    }
}

/// `weights · embedding[idx]`, i.e. the weighted mean of the selected rows.
fn weighted_mean(embedding: &Tensor, idx: Vec<u32>, weights: Vec<f64>) -> candle_core::Result<Vec<f64>> {
    let k = idx.len();
    let idx = Tensor::from_vec(idx, k, &Device::Cpu)?;
    let weights = Tensor::from_vec(weights, (1, k), &Device::Cpu)?;
    weights.matmul(&embedding.index_select(&idx, 0)?)?.squeeze(0)?.to_vec1::<f64>()
}

/// Smooth-kNN membership strengths for one point's sorted neighbour list.
fn memberships(neighbors: &[(usize, f64)]) -> Vec<f64> {
    if neighbors.is_empty() {
        return Vec::new();
    }
    let distances: Vec<f64> = neighbors.iter().map(|n| n.1).collect();
    let rho = distances.iter().copied().find(|d| *d > 0.0).unwrap_or(0.0);
    let target = (neighbors.len() as f64).log2().max(1e-3);

    let membership_sum = |sigma: f64| -> f64 {
        distances.iter().map(|d| if *d - rho > 0.0 { (-(d - rho) / sigma).exp() } else { 1.0 }).sum()
    };

    let (mut lo, mut hi, mut sigma) = (0f64, f64::INFINITY, 1f64);
    for _ in 0..BISECTION_STEPS {
        let psum = membership_sum(sigma);
        if (psum - target).abs() < SMOOTH_K_TOLERANCE {
            break;
        }
        if psum > target {
            hi = sigma;
            sigma = (lo + hi) / 2.0;
        } else {
            lo = sigma;
            sigma = if hi.is_infinite() { sigma * 2.0 } else { (lo + hi) / 2.0 };
        }
    }
    let mean_dist = distances.iter().sum::<f64>() / distances.len() as f64;
    sigma = sigma.max(MIN_K_DIST_SCALE * mean_dist).max(1e-12);

    distances.iter().map(|d| if *d - rho > 0.0 { (-(d - rho) / sigma).exp() } else { 1.0 }).collect()
}

/// Symmetrises directed memberships with `w_ij + w_ji - w_ij * w_ji` and
/// returns every edge in both directions, in a fixed order.
fn fuzzy_union(knn: &[Vec<(usize, f64)>]) -> Vec<(usize, usize, f64)> {
    let mut directed: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    for (i, neighbors) in knn.iter().enumerate() {
        for ((j, _), w) in neighbors.iter().zip(memberships(neighbors)) {
            directed.insert((i, *j), w);
        }
    }
    let mut edges = Vec::new();
    for (&(i, j), &w_ij) in &directed {
        let w_ji = directed.get(&(j, i)).copied().unwrap_or(0.0);
        let w = w_ij + w_ji - w_ij * w_ji;
        if w <= 0.0 {
            continue;
        }
        edges.push((i, j, w));
        if w_ji == 0.0 {
            edges.push((j, i, w));
        }
    }
    edges.sort_by(|x, y| x.0.cmp(&y.0).then(x.1.cmp(&y.1)));
    edges
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn clip(v: f64) -> f64 {
    v.clamp(-GRAD_CLIP, GRAD_CLIP)
}

const AB_SAMPLES: usize = 300;
const AB_STEPS: usize = 40;
const AB_ROUNDS: usize = 8;

/// Fits `a`, `b` of the curve `1 / (1 + a·x^(2b))` to the target profile
/// that is 1 below `min_dist` and decays as `exp(-(x - min_dist) / spread)`
/// beyond it. Least squares via successively refined grid search; each round
/// scores the whole `a × b` grid in one tensor expression.
pub fn find_ab_params(spread: f32, min_dist: f32) -> (f64, f64) {
    let spread = f64::from(spread);
    let min_dist = f64::from(min_dist);
    let xs: Vec<f64> = (1..=AB_SAMPLES).map(|i| 3.0 * spread * i as f64 / AB_SAMPLES as f64).collect();
    let ys: Vec<f64> = xs.iter().map(|x| if *x < min_dist { 1.0 } else { (-(x - min_dist) / spread).exp() }).collect();

    let (mut a_lo, mut a_hi, mut b_lo, mut b_hi) = (0.01f64, 10.0f64, 0.05f64, 3.0f64);
    let mut best = (1.0, 1.0);
    for _ in 0..AB_ROUNDS {
        let a_grid = grid(a_lo, a_hi);
        let b_grid = grid(b_lo, b_hi);
        match grid_argmin(&xs, &ys, &a_grid, &b_grid) {
            Ok((ia, ib)) => best = (a_grid[ia], b_grid[ib]),
            Err(e) => {
                debug!(error = %e, "ab grid search stopped early");
                break;
            }
        }
        let (da, db) = ((a_hi - a_lo) / 8.0, (b_hi - b_lo) / 8.0);
        a_lo = (best.0 - da).max(1e-4);
        a_hi = best.0 + da;
        b_lo = (best.1 - db).max(1e-4);
        b_hi = best.1 + db;
    }
    best
}

fn grid(lo: f64, hi: f64) -> Vec<f64> {
    (0..=AB_STEPS).map(|i| lo + (hi - lo) * i as f64 / AB_STEPS as f64).collect()
}

/// Grid position `(ia, ib)` with the lowest squared error.
fn grid_argmin(xs: &[f64], ys: &[f64], a_grid: &[f64], b_grid: &[f64]) -> candle_core::Result<(usize, usize)> {
    let device = Device::Cpu;
    let (na, nb, nx) = (a_grid.len(), b_grid.len(), xs.len());
    let ln_x = Tensor::from_slice(xs, (1, nx), &device)?.log()?;
    let ys = Tensor::from_slice(ys, (1, 1, nx), &device)?;
    let a = Tensor::from_slice(a_grid, (na, 1, 1), &device)?;
    let two_b = (Tensor::from_slice(b_grid, (nb, 1), &device)? * 2.0)?;

    // x^(2b) as exp(2b·ln x): [nb, nx]
    let powers = two_b.broadcast_mul(&ln_x)?.exp()?.unsqueeze(0)?;
    let curve = a.broadcast_mul(&powers)?.affine(1.0, 1.0)?.recip()?;
    let loss = curve.broadcast_sub(&ys)?.sqr()?.sum(2)?;
    let flat = loss.flatten_all()?.argmin(0)?.to_scalar::<u32>()? as usize;
    Ok((flat / nb, flat % nb))
}
