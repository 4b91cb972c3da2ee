use clap::Parser;

use vecscope_cli::{build_index, init_tracing, QueryCli};

fn main() -> anyhow::Result<()> {
    let cli = QueryCli::parse();
    init_tracing("warn");
    let config = cli.common.load_config()?;

    let index = build_index(&config)?;
    println!("vecscope-query ({} chunks, {} {}D, model {})", index.len(), index.method(), index.dims(), index.model_id());
    println!("Query: {}", cli.query);

    if cli.show_position {
        let projection = index.project(&cli.query)?;
        let coords: Vec<String> = projection.position.iter().map(|x| format!("{x:.3}")).collect();
        println!("Position: [{}]", coords.join(", "));
    }

    let hits = index.neighbors(&cli.query, cli.n)?;
    println!("\nTop {} neighbours:", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        println!("\n  {}. [{}] distance={:.4} similarity={:.4} id={}", i + 1, hit.document, hit.distance, hit.similarity, hit.id);
        println!("     {}", hit.text);
    }
    Ok(())
}
