use std::sync::Arc;

use clap::Parser;

use vecscope_cli::{build_index, init_tracing, ServerCli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = ServerCli::parse();
    let logging = init_tracing("info");
    let config = cli.load_config()?;
    logging.set_level(&config.server.log_level);

    tracing::info!(
        method = %config.reduction.method,
        dims = config.reduction.dims,
        corpus = config.corpus.dir.as_deref().unwrap_or("<sample>"),
        "building index"
    );
    let build_config = config.clone();
    let index = tokio::task::spawn_blocking(move || build_index(&build_config)).await??;

    vecscope_server::serve(&config.server, Arc::new(index)).await
}
