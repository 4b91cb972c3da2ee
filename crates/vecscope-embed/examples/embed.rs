use vecscope_embed::{get_default_embedder, Embedder};

fn main() -> anyhow::Result<()> {
    let embedder = get_default_embedder()?;
    let texts = vec!["hello world".to_string(), "rust embeddings".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    println!("model={} B={} dim={}", embedder.model_id(), embs.len(), embedder.dim());
    Ok(())
}
