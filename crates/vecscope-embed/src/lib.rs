use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use vecscope_core::config::{expand_path, EmbeddingConfig};
use vecscope_core::distance::l2_normalize;
pub use vecscope_core::traits::Embedder;

mod device;
mod pool;
mod tokenize;

pub use device::select_device;
pub use pool::masked_mean_l2;
pub use tokenize::{prepare_tokenizer, tokenize_batch};

const DEFAULT_MODEL_DIR: &str = "models/all-MiniLM-L6-v2";

/// Sentence encoder with the all-MiniLM-L6-v2 layout: a BERT encoder followed
/// by masked mean pooling and L2 normalisation.
pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    id: String,
}

impl MiniLmEmbedder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading sentence encoder");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let tokenizer = prepare_tokenizer(tokenizer, max_len)?;

        let config_path = model_dir.join("config.json");
        let raw: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?,
        )?;
        let dim = raw
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .and_then(|d| usize::try_from(d).ok())
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))?;
        let config: BertConfig = serde_json::from_value(raw)?;

        let vb = load_weights(model_dir, &device)?;
        let model = BertModel::load(vb, &config)?;
        let name = model_dir.file_name().map_or_else(|| "bert".to_string(), |n| n.to_string_lossy().to_string());
        info!(dim, "sentence encoder loaded");
        Ok(Self { model, tokenizer, device, dim, max_len, id: format!("local:{name}:d{dim}") })
    }

    fn forward(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        Ok(pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2::<f32>()?)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the weights file is opened read-only and is not modified while mapped.
        return Ok(unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DTYPE, device)? });
    }
    let weights_path = model_dir.join("pytorch_model.bin");
    if !weights_path.exists() {
        return Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", model_dir.display()));
    }
    let weights = candle_core::pickle::read_all(&weights_path)?;
    let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, DTYPE, device))
}

impl Embedder for MiniLmEmbedder {
    fn model_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let out = self.forward(texts)?;
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 500 {
            warn!(batch = texts.len(), ?elapsed, "slow embedding batch");
        } else {
            debug!(batch = texts.len(), ?elapsed, "embedded batch");
        }
        Ok(out)
    }
}

/// Deterministic bag-of-words hashing embedder. Needs no model files, so it
/// backs tests and offline demos.
pub struct FakeEmbedder { dim: usize, id: String }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim, id: format!("fake:xxhash:d{dim}") } }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        let tokens = text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()).map(str::to_lowercase);
        for (i, token) in tokens.enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = usize::try_from(h % self.dim as u64).unwrap_or(0);
            let val = 0.5 + 0.5 * (((h >> 32) as u32) as f32 / u32::MAX as f32);
            v[idx] += val + (i % 3) as f32 * 0.01;
        }
        l2_normalize(&mut v);
        v
    }
}

impl Embedder for FakeEmbedder {
    fn model_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn fake_forced_by_env() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Builds the embedder described by `config`. `APP_USE_FAKE_EMBEDDINGS=1`
/// forces the fake embedder.
pub fn load_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    if config.use_fake || fake_forced_by_env() {
        info!(dim = config.fake_dim, "using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(config.fake_dim)));
    }
    let model_dir = resolve_model_dir(config.model_dir.as_deref())?;
    Ok(Arc::new(MiniLmEmbedder::load(&model_dir, config.max_len)?))
}

pub fn get_default_embedder() -> Result<Arc<dyn Embedder>> {
    load_embedder(&EmbeddingConfig::default())
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let candidates = configured
        .map(str::to_string)
        .into_iter()
        .chain(std::env::var("APP_MODEL_DIR").ok())
        .chain(std::env::var("MODEL_DIR").ok())
        .chain([format!("../{DEFAULT_MODEL_DIR}"), DEFAULT_MODEL_DIR.to_string()]);
    for candidate in candidates {
        let p = expand_path(&candidate);
        if p.exists() { info!(dir = %p.display(), "using model dir"); return Ok(p); }
        debug!(dir = %p.display(), "model dir candidate missing");
    }
    Err(anyhow!("Could not locate the sentence-encoder model directory (set embedding.model_dir or APP_MODEL_DIR)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_embedder_ignores_case_and_punctuation() {
        let e = FakeEmbedder::new(64);
        assert_eq!(e.embed_one("Hello, World!"), e.embed_one("hello world"));
    }

    #[test]
    fn fake_embedder_empty_text_is_zero_vector() {
        let e = FakeEmbedder::new(16);
        assert!(e.embed_one("").iter().all(|x| *x == 0.0));
    }
}
