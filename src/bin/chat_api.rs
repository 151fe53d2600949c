use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use portfolio_rag::config::{init_tracing, load_dotenv, ServiceArgs};
use portfolio_rag::server::{router, AppState, CorsSettings, RateLimiter};
use portfolio_rag::{ContextAssembler, KnowledgeBase, PortfolioAssistant};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "portfolio-chat-api",
    about = "HTTP API answering questions about a CV"
)]
struct ApiCli {
    #[command(flatten)]
    service: ServiceArgs,

    /// Address to bind the HTTP server to (host:port).
    #[arg(long, env = "PORTFOLIO_BIND", default_value = "0.0.0.0:8000")]
    bind: String,

    /// Prebuilt index snapshot; the index is rebuilt from the CV when it is missing or stale.
    #[arg(long, env = "PORTFOLIO_INDEX", default_value = "data/index.cbor")]
    index: PathBuf,

    /// Allowed CORS origins, comma separated (defaults to the built-in list).
    #[arg(long, env = "PORTFOLIO_CORS_ORIGINS")]
    cors_origins: Option<String>,

    /// Host suffixes accepted for any https origin, comma separated.
    #[arg(long, env = "PORTFOLIO_CORS_SUFFIXES")]
    cors_suffixes: Option<String>,

    /// Max POST requests per minute (0 disables rate limiting).
    #[arg(long, env = "PORTFOLIO_MAX_RPM", default_value_t = 60)]
    max_requests_per_minute: u32,

    /// Rate-limit burst size (tokens available instantly).
    #[arg(long, default_value_t = 10)]
    rate_limit_burst: u32,

    /// Build the index before accepting requests instead of on the first question.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    warm_index: bool,
}

fn main() -> Result<()> {
    load_dotenv();
    init_tracing();
    let cli = ApiCli::parse();

    let cv = cli.service.load_cv()?;
    let credential = cli.service.credential();
    let embedder = Arc::new(cli.service.build_embedder(credential.as_ref())?);
    let generator = cli.service.build_generator(credential.as_ref())?;
    let knowledge = KnowledgeBase::from_snapshot_or_cv(cv, embedder, &cli.index);
    let assistant = Arc::new(PortfolioAssistant::new(
        knowledge,
        generator,
        cli.service.retrieval_config(),
        ContextAssembler::new(cli.service.assembler_config()),
    ));
    if cli.warm_index {
        let fragments = assistant.knowledge().index().len();
        info!(fragments, "index ready");
    }

    let state = AppState::new(Arc::clone(&assistant)).with_rate_limiter(RateLimiter::new(
        cli.max_requests_per_minute,
        cli.rate_limit_burst,
    ));
    let app = router(state, cors_settings(&cli));
    let addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cli.bind))?;

    // HTTP clients inside the assistant are blocking; the last handle is
    // released here, after the runtime has shut down.
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(serve(addr, app))?;
    drop(runtime);
    drop(assistant);
    Ok(())
}

async fn serve(addr: SocketAddr, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "portfolio chat API listening");
    axum::serve(listener, app).await.context("server shutdown")?;
    Ok(())
}

fn cors_settings(cli: &ApiCli) -> CorsSettings {
    let mut settings = CorsSettings::default();
    if let Some(origins) = &cli.cors_origins {
        settings.allowed_origins = split_list(origins);
    }
    if let Some(suffixes) = &cli.cors_suffixes {
        settings.allowed_suffixes = split_list(suffixes);
    }
    settings
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
