use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use portfolio_rag::config::{init_tracing, load_dotenv, ServiceArgs};
use portfolio_rag::{chunk, Index, IndexSnapshot};
use tracing::warn;

#[derive(Parser, Debug)]
#[command(
    name = "portfolio-index-builder",
    about = "Embeds CV fragments and writes an index snapshot"
)]
struct BuilderCli {
    #[command(flatten)]
    service: ServiceArgs,

    /// Snapshot file to write (CBOR).
    #[arg(long, env = "PORTFOLIO_INDEX", default_value = "data/index.cbor")]
    output: PathBuf,
}

fn main() -> Result<()> {
    load_dotenv();
    init_tracing();
    let cli = BuilderCli::parse();

    let cv = cli.service.load_cv()?;
    let credential = cli
        .service
        .credential()
        .context("an API key is required to embed CV fragments")?;
    let embedder = cli.service.build_embedder(Some(&credential))?;

    let fragments = chunk(&cv);
    let count = fragments.len();
    anyhow::ensure!(count > 0, "CV {:?} produced no fragments", cli.service.cv);
    let index = Index::build(fragments, &embedder);
    let degenerate = index
        .vectors()
        .iter()
        .filter(|row| row.iter().all(|value| *value == 0.0))
        .count();
    if degenerate > 0 {
        warn!(degenerate, "some fragments could not be embedded and were stored as zero vectors");
    }

    let snapshot = IndexSnapshot::from_index(&index, &cv);
    if let Some(parent) = cli.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {:?}", parent))?;
    }
    snapshot
        .save(&cli.output)
        .with_context(|| format!("failed to write {:?}", cli.output))?;

    let (rows, columns) = snapshot.shape();
    println!("chunks: {count}");
    println!("embedding matrix: {rows} x {columns}");
    println!("snapshot written to {}", cli.output.display());
    Ok(())
}
