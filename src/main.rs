// sagectl - Sagemcom router port forward manager
// Main entry point

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::prelude::*;

use sagectl::cli::commands::{run_browser, run_close, run_list, run_open};
use sagectl::cli::completion::{self, CompletionShell};
use sagectl::config::load_config;
use sagectl::mcp::McpServer;
use sagectl::router::Protocol;

#[derive(Parser, Debug)]
#[command(name = "sagectl")]
#[command(about = "Sagemcom router port forward manager", version)]
struct Args {
    /// Router IP address (overrides config file and SAGEMCOM_MODEM_IP)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Output in JSON format for machine parsing
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// Open a port forwarding rule
    Open {
        /// Name for the port forwarding rule
        #[arg(long)]
        name: String,

        /// Local IP address (full IP or shorthand like "100")
        #[arg(long)]
        local_address: String,

        /// Local port number
        #[arg(long)]
        local_port: i64,

        /// External port number
        #[arg(long)]
        external_port: i64,

        /// Protocol
        #[arg(long, value_enum, default_value_t = Protocol::Tcp)]
        protocol: Protocol,
    },
    /// Close a port forwarding rule
    Close {
        /// External port number of the rule to remove
        #[arg(long)]
        port: i64,
    },
    /// List all port forwarding rules
    List,
    /// Open router web interface in browser
    Browser,
    /// Generate shell completion script
    Completion {
        /// The shell to generate completion for
        #[arg(value_enum, default_value = "bash")]
        shell: CompletionShell,
    },
    /// Run the MCP server on stdio
    Mcp,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();

    let mut config = load_config()?;
    if let Some(host) = args.host {
        config.router.host = host;
    }

    let success = match args.command {
        Command::Open {
            name,
            local_address,
            local_port,
            external_port,
            protocol,
        } => {
            run_open(
                &config,
                args.json,
                &name,
                &local_address,
                local_port,
                external_port,
                protocol,
            )
            .await
        }
        Command::Close { port } => run_close(&config, args.json, port).await,
        Command::List => run_list(&config, args.json).await,
        Command::Browser => run_browser(&config, args.json).await,
        Command::Completion { shell } => completion::generate(shell),
        Command::Mcp => {
            McpServer::new(config).serve().await?;
            true
        }
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

/// Initialize tracing to stderr.
///
/// stdout is reserved for command output: --json payloads and the MCP
/// server's JSON-RPC framing must stay machine-clean.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
