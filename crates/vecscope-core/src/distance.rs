//! Distance helpers over raw `f32` slices.

/// Euclidean distance. Accumulates in `f64` so that identical inputs give
/// exactly zero and argument order never changes the result.
pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt() as f32
}

/// Cosine distance in `[0, 2]`. Zero vectors are treated as maximally
/// dissimilar from everything except themselves.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let (mut dot, mut na, mut nb) = (0f64, 0f64, 0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    let denom = (na * nb).sqrt();
    if denom < 1e-12 {
        return if na < 1e-12 && nb < 1e-12 { 0.0 } else { 1.0 };
    }
    (1.0 - dot / denom).clamp(0.0, 2.0) as f32
}

/// Display similarity for a distance: `1 / (1 + d)`.
pub fn similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

/// Scales `v` to unit length in place; near-zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-12 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
