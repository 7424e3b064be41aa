//! prediction-ninja entry point

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use futures::future::join_all;
use ninja_predict::{
    PredictConfig, PredictionCache, PredictionRequest, Provider, Scheduler, Symbol, build_clients,
    build_clients_for,
};
use ninja_server::{AppState, ServerConfig, create_router, report};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "ninja-server")]
#[command(about = "Scheduled GPT and Grok stock predictions served over HTTP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scheduler and the HTTP API (default)
    Serve,
    /// Ask the providers once and print the comparison
    Predict {
        /// Ticker symbol, e.g. TSLA or BTC-USD
        #[arg(short, long)]
        ticker: String,

        #[arg(short, long, value_enum, default_value_t = ProviderChoice::Both)]
        provider: ProviderChoice,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProviderChoice {
    #[value(alias = "openai")]
    Gpt,
    #[value(alias = "xai")]
    Grok,
    Both,
}

impl ProviderChoice {
    fn providers(self) -> &'static [Provider] {
        match self {
            Self::Both => &Provider::ALL,
            Self::Gpt => &[Provider::Gpt],
            Self::Grok => &[Provider::Grok],
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Some(path) = ninja_utils::load_dotenv() {
        eprintln!("loaded environment from {}", path.display());
    }
    ninja_utils::init_tracing();

    match Cli::parse().command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Predict {
            ticker,
            provider,
            json,
        } => predict(&ticker, provider, json).await,
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = Arc::new(PredictConfig::from_env().context("invalid prediction configuration")?);
    let server_config = ServerConfig::from_env().context("invalid server configuration")?;
    let addr = server_config.socket_addr()?;
    info!(?config, "starting prediction-ninja");

    let clients = build_clients(&config)?;
    let cache = PredictionCache::new(config.history_limit);
    let scheduler = Scheduler::new(Arc::clone(&config), clients, cache);

    let shutdown_token = CancellationToken::new();
    let trigger = scheduler.spawn(shutdown_token.clone());

    let app = create_router(AppState::new(config, scheduler));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "API server listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
        .await;

    shutdown_token.cancel();
    if let Err(e) = trigger.await {
        warn!(error = %e, "scheduler task ended abnormally");
    }
    served.context("server error")?;

    info!("server shutdown complete");
    Ok(())
}

async fn predict(ticker: &str, choice: ProviderChoice, json: bool) -> anyhow::Result<()> {
    let symbol = Symbol::parse(ticker)?;
    let providers = choice.providers();
    let config = PredictConfig::from_env_for(vec![symbol.clone()], providers)?;
    let target_date = config.target_date_for(chrono::Utc::now().date_naive());
    let clients = build_clients_for(&config, providers)?;

    let started = Instant::now();
    let records = join_all(clients.iter().map(|client| {
        client.predict(PredictionRequest::new(
            symbol.clone(),
            client.provider(),
            target_date,
        ))
    }))
    .await;
    let overall = started.elapsed();

    if json {
        println!(
            "{}",
            report::render_json(symbol.as_str(), target_date, &records, overall)?
        );
    } else {
        println!("{}", report::render_text(&records, overall));
    }
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM, or when `shutdown_token` is cancelled.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => warn!("received Ctrl+C, shutting down"),
        () = terminate => warn!("received SIGTERM, shutting down"),
        () = shutdown_token.cancelled() => {}
    }
}
