//! Option Chain Viewer
//!
//! Command-line front end: polls the chain backend and prints the chain table
//! on every update, or fetches metrics once.

use anyhow::{Context, Result};
use chain_client::{Role, Selector};
use clap::{Args, Parser, Subcommand};
use option_chain_viewer::render::{render_chain, render_metrics};
use option_chain_viewer::{Config, PollEvent, ViewerState};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default configuration file, read when present.
const DEFAULT_CONFIG_PATH: &str = "option-chain-viewer.toml";

#[derive(Parser, Debug)]
#[command(name = "option-chain-viewer")]
#[command(about = "Live option chain viewer")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, env = "VIEWER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the chain and print it on every update (resumes a persisted run)
    Watch(SelectorArgs),
    /// Mark a persisted run as stopped
    Stop,
    /// Drop the stored chain snapshot
    Clear,
    /// Fetch and print aggregate metrics once
    Metrics(SelectorArgs),
    /// Print the broker login URL
    LoginUrl,
    /// Exchange an auth code for a role token
    Token {
        /// Auth code returned by the broker login
        #[arg(long)]
        code: String,
        /// Role to authorize
        #[arg(long, default_value = "Emperor")]
        role: Role,
    },
}

#[derive(Args, Debug)]
struct SelectorArgs {
    /// Instrument key, e.g. "NSE_INDEX|Nifty 50"
    #[arg(short, long)]
    instrument: Option<String>,
    /// Expiry date (YYYY-MM-DD)
    #[arg(short, long)]
    expiry: Option<String>,
}

impl SelectorArgs {
    fn is_empty(&self) -> bool {
        self.instrument.is_none() && self.expiry.is_none()
    }

    fn apply(&self, base: Selector) -> Selector {
        Selector {
            instrument_key: self.instrument.clone().unwrap_or(base.instrument_key),
            expiry_date: self.expiry.clone().unwrap_or(base.expiry_date),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; stdout is reserved for tables
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let state = ViewerState::from_config(config).context("failed to initialize viewer")?;

    match cli.command {
        Commands::Watch(args) => watch(&state, &args).await,
        Commands::Stop => {
            state.controller.stop();
            state.store.set_running(false);
            println!("Polling stopped");
            Ok(())
        }
        Commands::Clear => {
            state.controller.clear();
            println!("Chain data cleared");
            Ok(())
        }
        Commands::Metrics(args) => metrics(&state, &args).await,
        Commands::LoginUrl => {
            let response = state.client.login_url().await?;
            println!("{}", response.auth_url);
            Ok(())
        }
        Commands::Token { code, role } => {
            let response = state.client.exchange_code(&code, role).await?;
            println!("{}", response.message);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("failed to load config from {DEFAULT_CONFIG_PATH}")),
        None => Ok(Config::default()),
    }
}

async fn watch(state: &ViewerState, args: &SelectorArgs) -> Result<()> {
    let controller = &state.controller;
    let mut events = controller.subscribe();

    let resumed = args.is_empty() && controller.resume(&state.config.selector())?;
    if !resumed {
        controller.start(args.apply(state.selector()))?;
    }

    let selector = controller.selector();
    print!("{}", render_chain(&selector, state.store.latest_stored().as_ref()));
    info!(selector = %selector, "watching, press Ctrl-C to exit");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(PollEvent::SnapshotUpdated { .. }) => {
                    let selector = controller.selector();
                    print!("{}", render_chain(&selector, state.store.latest_stored().as_ref()));
                }
                Ok(PollEvent::ReadFailed { message }) => {
                    eprintln!("Read failed, keeping previous chain: {message}");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event receiver lagged");
                }
                Err(RecvError::Closed) => break,
            },
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for Ctrl-C")?;
                // The run flag stays set so the next watch resumes.
                info!("exiting");
                break;
            }
        }
    }

    Ok(())
}

async fn metrics(state: &ViewerState, args: &SelectorArgs) -> Result<()> {
    let base = state.selector();
    let base = match state.store.metrics_expiry_date() {
        Some(expiry_date) if !expiry_date.is_empty() => Selector { expiry_date, ..base },
        _ => base,
    };
    let selector = args.apply(base);

    if !selector.has_expiry() {
        anyhow::bail!("no expiry date selected, pass --expiry");
    }

    let result = state.metrics.on_selector_change(&selector).await;
    let panel = state.metrics.state();
    print!("{}", render_metrics(&state.metrics.view(), panel.error.as_deref()));
    result.map(|_| ()).map_err(Into::into)
}
