use clap::{ArgAction, Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use milestone_relay::config::RelayConfig;
use milestone_relay::logging::{init_logging, LogLevel, LoggingConfig};
use milestone_relay::webhooks::{create_webhook_router, signature, AppState};

/// Configuration file picked up when `--config` is not given
const DEFAULT_CONFIG_FILE: &str = "milestone-relay.toml";

#[derive(Parser, Debug)]
#[command(name = "milestone-relay")]
#[command(version)]
#[command(about = "Relay signed GitHub milestone webhooks to Slack")]
struct Cli {
    /// Suppress all output except errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short, action = ArgAction::Count, global = true, conflicts_with = "quiet")]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the webhook server
    Serve {
        /// Path to a TOML configuration file
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Address to bind to (overrides configuration)
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (overrides configuration)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Print the X-Hub-Signature value GitHub would send for a payload
    Sign {
        /// Webhook secret
        #[arg(long, short, env = "MILESTONE_RELAY__GITHUB__SECRET", hide_env_values = true)]
        secret: String,

        /// Payload file, or `-` for stdin
        #[arg(default_value = "-")]
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet {
        LogLevel::Error
    } else {
        LogLevel::from(cli.verbose)
    };
    init_logging(LoggingConfig::new().with_level(level));

    let result = match cli.command {
        Commands::Serve { config, bind, port } => serve(config, bind, port),
        Commands::Sign { secret, file } => sign(&secret, &file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<RelayConfig, String> {
    let config = match path {
        Some(path) => RelayConfig::load(&path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            RelayConfig::load(DEFAULT_CONFIG_FILE)
        }
        None => RelayConfig::from_env(),
    };
    config.map_err(|e| e.to_string())
}

fn serve(config: Option<PathBuf>, bind: Option<String>, port: Option<u16>) -> Result<(), String> {
    let mut config = load_config(config)?;
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;
    runtime.block_on(run_server(config))
}

async fn run_server(config: RelayConfig) -> Result<(), String> {
    let state = AppState::from_config(&config).map_err(|e| e.to_string())?;
    let app = create_webhook_router(state);

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;

    tracing::info!(
        address = %addr,
        channel = %config.slack.channel_id,
        "Milestone relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("Server error: {}", e))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down");
}

fn sign(secret: &str, file: &Path) -> Result<(), String> {
    let payload = if file.as_os_str() == "-" {
        let mut buffer = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buffer)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        buffer
    } else {
        std::fs::read(file).map_err(|e| format!("Failed to read {}: {}", file.display(), e))?
    };

    println!("{}", signature::create(&payload, secret.as_bytes()));
    Ok(())
}
