//! Startup pipeline shared by the `vecscope-server` and `vecscope-query`
//! binaries: argument parsing, configuration layering, logging setup and the
//! corpus → embed → reduce build.
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use vecscope_core::config::{expand_path, AppConfig, Config, CorpusConfig};
use vecscope_core::data_processor::{Corpus, DataProcessor};
use vecscope_core::types::ReductionMethod;
use vecscope_embed::load_embedder;
use vecscope_index::RetrievalIndex;
use vecscope_reduce::build_reducer;

/// Options both binaries accept. Flags override `config.toml` and `APP_*`.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Extra TOML file merged over config.toml
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Reduction method: pca or umap
    #[arg(long)]
    pub method: Option<ReductionMethod>,

    /// Display dimensions (2 or 3)
    #[arg(long)]
    pub dims: Option<usize>,

    /// Directory of .txt documents; the built-in sample corpus when omitted
    #[arg(long)]
    pub corpus_dir: Option<String>,

    /// Use the hashing embedder instead of loading a model
    #[arg(long)]
    pub fake_embeddings: bool,
}

impl CommonArgs {
    pub fn load_config(&self) -> anyhow::Result<AppConfig> {
        let config = Config::load_with(self.config.as_deref())?;
        let mut app = config.app()?;
        self.apply(&mut app);
        app.validate()?;
        Ok(app)
    }

    pub fn apply(&self, app: &mut AppConfig) {
        if let Some(method) = self.method {
            app.reduction.method = method;
        }
        if let Some(dims) = self.dims {
            app.reduction.dims = dims;
        }
        if let Some(dir) = &self.corpus_dir {
            app.corpus.dir = Some(dir.clone());
        }
        if self.fake_embeddings {
            app.embedding.use_fake = true;
        }
    }
}

/// Serve the embedding visualizer API
#[derive(Debug, Parser)]
#[command(name = "vecscope-server", version, about)]
pub struct ServerCli {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Port to listen on
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,
}

impl ServerCli {
    pub fn load_config(&self) -> anyhow::Result<AppConfig> {
        let mut app = self.common.load_config()?;
        if let Some(port) = self.port {
            app.server.port = port;
        }
        if let Some(host) = &self.host {
            app.server.host = host.clone();
        }
        Ok(app)
    }
}

/// Print the nearest corpus chunks for a query
#[derive(Debug, Parser)]
#[command(name = "vecscope-query", version, about)]
pub struct QueryCli {
    /// Query text
    pub query: String,

    /// Number of neighbours to print
    #[arg(short = 'n', long, default_value_t = 5)]
    pub n: usize,

    /// Also print the query's display position
    #[arg(long)]
    pub show_position: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Handle to the installed log filter, for switching level once the
/// configuration has been read.
pub struct LogFilter {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogFilter {
    /// Applies `level` unless `RUST_LOG` chose the filter.
    pub fn set_level(&self, level: &str) {
        if self.from_env {
            return;
        }
        match EnvFilter::try_new(level) {
            Ok(filter) => {
                if let Err(e) = self.handle.reload(filter) {
                    warn!(error = %e, "could not change log level");
                }
            }
            Err(e) => warn!(level, error = %e, "ignoring invalid log level"),
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `default_level`.
/// Call before loading configuration so its warnings are not lost.
pub fn init_tracing(default_level: &str) -> LogFilter {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(default_level), false),
    };
    let (layer, handle) = reload::Layer::new(filter);
    let _ = tracing_subscriber::registry().with(layer).with(fmt::layer().with_target(false)).try_init();
    LogFilter { handle, from_env }
}

pub fn load_corpus(config: &CorpusConfig) -> anyhow::Result<Corpus> {
    match &config.dir {
        Some(dir) => {
            let path = expand_path(dir);
            Corpus::from_dir(&path).with_context(|| format!("loading corpus from {}", path.display()))
        }
        None => Ok(Corpus::sample()),
    }
}

/// Runs the whole startup pipeline. Any failure here means the service
/// must not start.
pub fn build_index(app: &AppConfig) -> anyhow::Result<RetrievalIndex> {
    let corpus = load_corpus(&app.corpus)?;
    let records = DataProcessor::new(app.chunking()?).process(&corpus);
    info!(documents = corpus.len(), chunks = records.len(), "corpus chunked");

    let embedder = load_embedder(&app.embedding).context("loading embedding model")?;
    let reducer = build_reducer(&app.reduction);
    let index = RetrievalIndex::build(records, embedder, reducer, app.embedding.batch_size)?;
    Ok(index)
}
