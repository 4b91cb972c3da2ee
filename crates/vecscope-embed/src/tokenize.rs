use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// Configures batch-longest padding and truncation to `max_len` tokens.
pub fn prepare_tokenizer(mut tokenizer: Tokenizer, max_len: usize) -> Result<Tokenizer> {
    let padding = PaddingParams { strategy: PaddingStrategy::BatchLongest, ..Default::default() };
    tokenizer.with_padding(Some(padding));
    tokenizer
        .with_truncation(Some(TruncationParams { max_length: max_len, ..Default::default() }))
        .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
    Ok(tokenizer)
}

/// Encodes a batch into `(input_ids, attention_mask)` tensors of shape `[B, T]`.
pub fn tokenize_batch(tokenizer: &Tokenizer, texts: &[String], device: &Device) -> Result<(Tensor, Tensor)> {
    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let ids = encodings
        .iter()
        .map(|enc| Tensor::new(enc.get_ids(), device))
        .collect::<candle_core::Result<Vec<_>>>()?;
    let mask = encodings
        .iter()
        .map(|enc| Tensor::new(enc.get_attention_mask(), device))
        .collect::<candle_core::Result<Vec<_>>>()?;
    Ok((Tensor::stack(&ids, 0)?, Tensor::stack(&mask, 0)?))
}
