use crate::types::ReductionMethod;

/// Maps text to fixed-length dense vectors.
///
/// Implementations must be deterministic for a given `model_id` and must
/// return vectors of exactly `dim()` components.
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for a single input"))
    }
}

/// Projects high-dimensional vectors into a 2-D or 3-D display space.
///
/// `fit_transform` is called exactly once over the static corpus; afterwards
/// `transform` places new points with the fitted model and never refits.
pub trait Reducer: Send + Sync {
    fn method(&self) -> ReductionMethod;
    fn target_dim(&self) -> usize;
    fn is_fitted(&self) -> bool;
    fn fit_transform(&mut self, data: &[Vec<f32>]) -> crate::Result<Vec<Vec<f32>>>;
    fn transform(&self, vector: &[f32]) -> crate::Result<Vec<f32>>;
}
