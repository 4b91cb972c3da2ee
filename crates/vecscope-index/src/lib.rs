//! In-memory retrieval index over the embedded corpus.
//!
//! Built once at startup from the preprocessor's [`ChunkRecord`]s: every chunk
//! is embedded, the reducer is fitted over all embeddings, and the resulting
//! chunks are frozen. Queries are read-only, so a built index can be shared
//! behind an `Arc` by any number of request handlers.
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use vecscope_core::error::{Error, Result};
use vecscope_core::traits::{Embedder, Reducer};
use vecscope_core::types::{Chunk, ChunkPoint, ChunkRecord, NeighborResult, QueryProjection, ReductionMethod};
use vecscope_core::validation::{clamp_count, validate_query};

pub mod search;

pub use search::nearest;

pub struct RetrievalIndex {
    chunks: Vec<Chunk>,
    embedder: Arc<dyn Embedder>,
    reducer: Box<dyn Reducer>,
}

impl RetrievalIndex {
    /// Embeds `records` in batches of `batch_size`, fits `reducer` over the
    /// embeddings and freezes the result. Fails on an empty corpus or when the
    /// embedder returns vectors of the wrong length.
    pub fn build(
        records: Vec<ChunkRecord>,
        embedder: Arc<dyn Embedder>,
        mut reducer: Box<dyn Reducer>,
        batch_size: usize,
    ) -> Result<Self> {
        if records.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        let started = Instant::now();
        info!(chunks = records.len(), model = embedder.model_id(), method = %reducer.method(), "building retrieval index");

        let embeddings = embed_records(&records, embedder.as_ref(), batch_size.max(1))?;
        let positions = reducer.fit_transform(&embeddings)?;
        if positions.len() != records.len() {
            return Err(Error::Reduction(format!("reducer returned {} positions for {} chunks", positions.len(), records.len())));
        }

        let chunks: Vec<Chunk> = records
            .into_iter()
            .zip(embeddings)
            .zip(positions)
            .map(|((record, embedding), position)| Chunk {
                id: record.id,
                document: record.document,
                text: record.text,
                position,
                embedding,
            })
            .collect();

        info!(chunks = chunks.len(), dims = reducer.target_dim(), elapsed = ?started.elapsed(), "retrieval index ready");
        Ok(Self { chunks, embedder, reducer })
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Every chunk without its embedding, in id order.
    pub fn points(&self) -> Vec<ChunkPoint> {
        self.chunks.iter().map(ChunkPoint::from).collect()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn method(&self) -> ReductionMethod {
        self.reducer.method()
    }

    pub fn dims(&self) -> usize {
        self.reducer.target_dim()
    }

    pub fn model_id(&self) -> &str {
        self.embedder.model_id()
    }

    /// Embeds `query` and places it in the fitted display space.
    pub fn project(&self, query: &str) -> Result<QueryProjection> {
        validate_query(query)?;
        let embedding = self.embed_query(query)?;
        let position = self.reducer.transform(&embedding)?;
        Ok(QueryProjection { text: query.to_string(), position, embedding })
    }

    /// The `k` chunks closest to `query` in embedding space, nearest first.
    /// `k` larger than the corpus returns every chunk.
    pub fn neighbors(&self, query: &str, k: usize) -> Result<Vec<NeighborResult>> {
        if k == 0 {
            return Err(Error::Validation("n must be a positive integer".into()));
        }
        validate_query(query)?;
        let embedding = self.embed_query(query)?;
        let hits = self.nearest(&embedding, clamp_count(k, self.chunks.len()));
        debug!(k = hits.len(), best = hits.first().map(|h| h.distance), "neighbour search");
        Ok(hits)
    }

    /// Pure lookup by an already computed embedding.
    pub fn nearest(&self, embedding: &[f32], k: usize) -> Vec<NeighborResult> {
        nearest(&self.chunks, embedding, k)
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let embedding = self.embedder.embed(query).map_err(|e| {
            warn!(error = %e, "query embedding failed");
            Error::EmbeddingUnavailable(e.to_string())
        })?;
        let expected = self.chunks.first().map_or(self.embedder.dim(), |c| c.embedding.len());
        if embedding.len() != expected {
            return Err(Error::DimensionMismatch { expected, actual: embedding.len() });
        }
        Ok(embedding)
    }
}

fn embed_records(records: &[ChunkRecord], embedder: &dyn Embedder, batch_size: usize) -> Result<Vec<Vec<f32>>> {
    let pb = ProgressBar::new(records.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let dim = embedder.dim();
    let mut embeddings = Vec::with_capacity(records.len());
    for batch in records.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;
        if vectors.len() != batch.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(Error::DimensionMismatch { expected: dim, actual: bad.len() });
        }
        embeddings.extend(vectors);
        pb.inc(batch.len() as u64);
        if let Some(last) = batch.last() {
            pb.set_message(last.document.clone());
        }
    }
    pb.finish_with_message("embedded");
    Ok(embeddings)
}
