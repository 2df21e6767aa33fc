use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nudge", version, about = "Nudge - reminder-tracking chat assistant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Start {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, default_value = "8000")]
        port: u16,
    },

    /// Show current status
    Status,

    /// Create the config directory layout
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config_loader = nudge_config::ConfigLoader::new()?;
    config_loader.ensure_dirs()?;
    let config = config_loader.load()?;

    match cli.command {
        Commands::Start { host, port } => {
            let mut config = config;
            config.gateway.host = host;
            config.gateway.port = port;

            let server = nudge_gateway::GatewayServer::new(config);
            server.run().await?;
        }
        Commands::Status => {
            let client = reqwest::Client::new();
            let request = client.get(format!(
                "http://{}:{}/health",
                config.gateway.host, config.gateway.port
            ));

            let resp = request.send().await.map_err(|_| {
                anyhow::anyhow!(
                    "Gateway is not running at {}:{}",
                    config.gateway.host,
                    config.gateway.port
                )
            })?;

            println!("gateway: {}", resp.text().await?);
        }
        Commands::Init => {
            println!("Nudge setup");
            println!("Config directory: {}", config_loader.config_dir().display());
            println!("Directories created. Edit config.yml to get started.");
        }
    }

    Ok(())
}
