use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fpl_assistant::api::ApiServer;
use fpl_assistant::config::profile::default_profile_path;
use fpl_assistant::{Assistant, Config, FetchPolicy};

/// FPL Assistant - Fantasy Premier League chat backed by OpenAI or Gemini
#[derive(Parser)]
#[command(name = "fpl-assistant", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP chat API (default)
    Serve {
        /// Port to listen on
        #[arg(long, env = "FPL_ASSISTANT_PORT")]
        port: Option<u16>,
        /// Directory holding a web UI to serve
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Chat in the terminal
    Chat {
        /// Profile file holding the FPL user ID and Gemini key
        #[arg(long)]
        profile: Option<PathBuf>,
        /// Fetch FPL data on every turn instead of asking the model first
        #[arg(long)]
        always_fetch: bool,
    },
    /// Interactive first-run setup
    Setup,
    /// Show which provider keys are configured
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,fpl_assistant=info",
        1 => "info,fpl_assistant=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = cli.command.unwrap_or(Command::Serve {
        port: None,
        static_dir: None,
    });

    match command {
        Command::Serve { port, static_dir } => serve(port, static_dir).await,
        Command::Chat {
            profile,
            always_fetch,
        } => chat(profile, always_fetch).await,
        Command::Setup => fpl_assistant::setup::run_setup(),
        Command::Status => cmd_status(),
    }
}

async fn serve(port: Option<u16>, static_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = Config::load();
    if let Some(port) = port {
        config.server.port = port;
    }
    if static_dir.is_some() {
        config.server.static_dir = static_dir;
    }

    tracing::info!(
        port = config.server.port,
        provider = config.llm.provider.as_str(),
        source = config.fpl.source.as_str(),
        fetch_policy = config.fpl.fetch_policy.as_str(),
        "starting fpl assistant"
    );

    let assistant = Arc::new(Assistant::from_config(&config)?);
    ApiServer::new(assistant, &config).run().await?;

    Ok(())
}

async fn chat(profile: Option<PathBuf>, always_fetch: bool) -> anyhow::Result<()> {
    let mut config = Config::load();
    let profile_path = profile.unwrap_or_else(default_profile_path);

    let need_api_key = config.api_keys.openai.is_none() && config.api_keys.gemini.is_none();
    let profile = fpl_assistant::setup::ensure_profile(&profile_path, need_api_key)?;
    config.apply_profile(&profile);

    // The terminal chat asks the model before fetching unless told otherwise
    config.fpl.fetch_policy = if always_fetch {
        FetchPolicy::Always
    } else {
        FetchPolicy::Router
    };

    let user_id = config.fpl.user_id.clone();
    let assistant = Arc::new(Assistant::from_config(&config)?);
    fpl_assistant::repl::run_chat(assistant, user_id).await
}

fn cmd_status() -> anyhow::Result<()> {
    let status = Config::load().key_status();
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
