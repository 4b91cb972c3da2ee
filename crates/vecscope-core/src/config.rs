//! Layered configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`, `config.<env>.toml`
//! and `APP_*` env vars (`__` separates nested keys, e.g.
//! `APP_REDUCTION__METHOD=pca`). Provides helpers to expand `~` and `${VAR}`
//! and to resolve relative paths against a known base directory.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::data_processor::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::ReductionMethod;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub corpus: CorpusConfig,
    pub embedding: EmbeddingConfig,
    pub reduction: ReductionConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Directory of `.txt` documents; the built-in sample corpus is used when unset.
    pub dir: Option<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self { dir: None, chunk_size: 200, chunk_overlap: 50 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model_dir: Option<String>,
    pub use_fake: bool,
    pub fake_dim: usize,
    pub max_len: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { model_dir: None, use_fake: false, fake_dim: 384, max_len: 256, batch_size: 32 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    pub method: ReductionMethod,
    pub dims: usize,
    pub seed: u64,
    pub n_neighbors: usize,
    pub min_dist: f32,
    pub spread: f32,
    pub n_epochs: usize,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            method: ReductionMethod::Umap,
            dims: 3,
            seed: 42,
            n_neighbors: 15,
            min_dist: 0.1,
            spread: 1.0,
            n_epochs: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub default_neighbors: usize,
    pub query_timeout_ms: u64,
    pub enable_cors: bool,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            default_neighbors: 5,
            query_timeout_ms: 10_000,
            enable_cors: true,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    pub fn chunking(&self) -> Result<ChunkingConfig> {
        ChunkingConfig::new(self.corpus.chunk_size, self.corpus.chunk_overlap)
    }

    /// Checks every startup invariant. A failure here keeps the service from starting.
    pub fn validate(&self) -> Result<()> {
        self.chunking()?;
        if !matches!(self.reduction.dims, 2 | 3) {
            return Err(Error::InvalidConfig(format!("reduction.dims must be 2 or 3, got {}", self.reduction.dims)));
        }
        if self.reduction.n_neighbors < 2 {
            return Err(Error::InvalidConfig("reduction.n_neighbors must be at least 2".into()));
        }
        if self.reduction.min_dist > self.reduction.spread {
            return Err(Error::InvalidConfig("reduction.min_dist must not exceed reduction.spread".into()));
        }
        if self.embedding.batch_size == 0 || self.embedding.fake_dim == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size and embedding.fake_dim must be positive".into()));
        }
        if self.server.default_neighbors == 0 {
            return Err(Error::InvalidConfig("server.default_neighbors must be positive".into()));
        }
        if self.server.query_timeout_ms == 0 {
            return Err(Error::InvalidConfig("server.query_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(None)
    }

    /// Same layering as [`Config::load`], with `extra` merged just below the environment.
    pub fn load_with(extra: Option<&Path>) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        if let Some(path) = extra {
            if !path.exists() {
                anyhow::bail!("config file {} does not exist", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extracts and validates the typed application configuration.
    pub fn app(&self) -> anyhow::Result<AppConfig> {
        let app: AppConfig = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract configuration: {}", e))?;
        app.validate()?;
        Ok(app)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        if matches!(env, "prod" | "production") && self.get::<bool>("embedding.use_fake").unwrap_or(false) {
            tracing::warn!("fake embeddings enabled in a production environment");
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        cfg.validate().expect("defaults validate");
        assert_eq!(cfg.server.default_neighbors, 5);
        assert_eq!(cfg.reduction.method, ReductionMethod::Umap);
        assert_eq!(cfg.reduction.dims, 3);
    }

    #[test]
    fn rejects_unsupported_dims() {
        let mut cfg = AppConfig::default();
        cfg.reduction.dims = 4;
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_overlap_at_least_chunk_size() {
        let mut cfg = AppConfig::default();
        cfg.corpus.chunk_overlap = cfg.corpus.chunk_size;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let base = Path::new("/srv/vecscope");
        assert_eq!(resolve_with_base(base, "docs"), PathBuf::from("/srv/vecscope/docs"));
        assert_eq!(resolve_with_base(base, "/abs/docs"), PathBuf::from("/abs/docs"));
    }
}
