use anyhow::{Context, Result};
use bridge::config::NetworkConfig;
use bridge::notify::Notifier;
use bridge::{metrics, Bridge};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Premium streaming bridge: checks NEAR payment streams and reports the
/// outcome as host events (JSON lines on stdout).
#[derive(Debug, Parser)]
#[command(name = "bridge", version)]
struct Cli {
    /// NEAR JSON-RPC endpoint (overrides NEAR_NODE_URL).
    #[arg(long, global = true)]
    node_url: Option<String>,

    /// Account the operations act for.
    #[arg(long, global = true)]
    account: Option<String>,

    /// Account premium streams must pay into (overrides PREMIUM_RECEIVER).
    #[arg(long, global = true)]
    receiver: Option<String>,

    /// Expose Prometheus metrics while running.
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect to the node and report its status.
    Status,
    /// Premium status of the account.
    Premium,
    /// wNEAR balance of the account.
    Balance,
    /// Read-only contract call.
    View {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        method: String,
        /// JSON arguments.
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = NetworkConfig::from_env();
    if let Some(url) = cli.node_url {
        config.node_url = url;
    }
    if let Some(receiver) = cli.receiver {
        config.premium_receiver = receiver;
    }

    if cli.metrics {
        metrics::serve_prometheus()?;
    }

    let (notifier, mut events) = Notifier::channel(config.event_queue_capacity);
    let printer = tokio::spawn(async move {
        while let Some(ev) = events.recv().await {
            match serde_json::to_string(&ev) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(target = "cli", "unprintable event {}: {e}", ev.name),
            }
        }
    });

    let bridge = Bridge::new(config, cli.account, notifier);
    let outcome = run(&bridge, cli.command).await;

    drop(bridge);
    printer.await.context("event printer")?;
    outcome
}

async fn run(bridge: &Bridge, command: Command) -> Result<()> {
    bridge.init_near().await?;
    match command {
        Command::Status => {}
        Command::Premium => {
            bridge.stream_premium_status(None).await?;
        }
        Command::Balance => {
            bridge.wnear_balance(None).await?;
        }
        Command::View {
            contract,
            method,
            args,
        } => {
            let args = serde_json::from_str(&args).context("--args must be JSON")?;
            bridge.contract_view(&contract, &method, args).await?;
        }
    }
    Ok(())
}
