use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use portfolio_rag::config::{init_tracing, load_dotenv, ServiceArgs};
use portfolio_rag::{ContextAssembler, KnowledgeBase, Language, PortfolioAssistant};

#[derive(Parser, Debug)]
#[command(
    name = "portfolio-ask",
    about = "Ask the CV assistant a question from the terminal"
)]
struct AskCli {
    #[command(flatten)]
    service: ServiceArgs,

    /// Question to answer.
    #[arg(long)]
    query: String,

    /// Reply language.
    #[arg(long, value_enum, default_value_t = Language::Tr)]
    lang: Language,

    /// Optional index snapshot to load instead of embedding the CV.
    #[arg(long)]
    index: Option<PathBuf>,

    /// Print the retrieved context and prompt without calling the generator.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

fn main() -> Result<()> {
    load_dotenv();
    init_tracing();
    let cli = AskCli::parse();

    let cv = cli.service.load_cv()?;
    let credential = cli.service.credential();
    let embedder = Arc::new(cli.service.build_embedder(credential.as_ref())?);
    let knowledge = match &cli.index {
        Some(path) => KnowledgeBase::from_snapshot_or_cv(cv, embedder, path),
        None => KnowledgeBase::new(cv, embedder),
    };
    let generator = if cli.dry_run {
        None
    } else {
        cli.service.build_generator(credential.as_ref())?
    };
    let assistant = PortfolioAssistant::new(
        knowledge,
        generator,
        cli.service.retrieval_config(),
        ContextAssembler::new(cli.service.assembler_config()),
    );

    let prepared = assistant.prepare(&cli.query, &[], cli.lang)?;
    println!("retrieval: {:?}", prepared.retrieval.path);
    for (rank, fragment) in prepared.retrieval.fragments.iter().enumerate() {
        println!("[{}] {}", rank + 1, fragment.text());
    }
    if cli.dry_run {
        println!("\n{}", prepared.prompt);
        return Ok(());
    }
    println!("\n{}", assistant.generate_reply(&prepared.prompt, cli.lang));
    Ok(())
}
