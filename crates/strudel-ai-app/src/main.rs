//! strudel-ai - AI endpoints for the Strudel live-coding editor
//!
//! Serves compose, edit and suggestion routes backed by Claude or OpenAI.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use strudel_ai_adapters::{Config, FileConfig};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "strudel_ai=info,strudel_ai_server=info,strudel_ai_adapters=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(
    name = "strudel-ai",
    about = "AI compose, edit and suggestion endpoints for Strudel",
    long_about = "Serves /api/compose, /api/claude-api, /api/claude-suggestions,\n\
                  /api/openai-suggestions and /api/health.\n\n\
                  API keys are read from ANTHROPIC_API_KEY and OPENAI_API_KEY.",
    version
)]
struct Args {
    /// Address to listen on (overrides the config file)
    #[arg(long)]
    bind: Option<String>,

    /// Path prefix every route is mounted under
    #[arg(long)]
    base_path: Option<String>,

    /// Config file (defaults to ~/.config/strudel-ai/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Upstream request timeout in seconds
    #[arg(long)]
    request_timeout_secs: Option<u64>,

    /// Print the resolved config file location and exit
    #[arg(long)]
    config_path: bool,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.config_path {
        match &args.config {
            Some(path) => println!("{}", path.display()),
            None => println!("{}", FileConfig::config_location()),
        }
        return Ok(());
    }

    init_tracing();

    let mut config = Config::load(args.config.as_deref())?;
    let location = match &args.config {
        Some(path) => path.display().to_string(),
        None => FileConfig::config_location(),
    };
    tracing::info!(config = %location, "loaded config");
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(base_path) = args.base_path {
        config.base_path = base_path;
    }
    if let Some(secs) = args.request_timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
    }

    strudel_ai_server::serve(config).await
}
