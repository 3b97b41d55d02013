use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use tokibot_core::config::{self, Config};

#[derive(Parser)]
#[command(
    name = "tokibot",
    about = "tokibot - WhatsApp dialog bot for the Toki card service",
    version = tokibot_core::VERSION,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook service
    Serve {
        /// Bind port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Config file path (defaults to ~/.tokibot/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Write a default config file
    Onboard,
    /// Show the resolved configuration
    Status {
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tokibot=info".parse().unwrap())
                .add_directive("tokibot_core=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, config } => cmd_serve(port, config).await?,
        Commands::Onboard => cmd_onboard()?,
        Commands::Status { config } => cmd_status(config)?,
    }

    Ok(())
}

// ====== Commands ======

async fn cmd_serve(port: Option<u16>, config_path: Option<PathBuf>) -> Result<()> {
    let mut cfg = config::load_config_from_env(config_path.as_deref());
    if let Some(port) = port {
        cfg.server.port = port;
    }
    info!("Starting tokibot on port {}", cfg.server.port);
    tokibot_core::service::gateway::run_gateway(cfg).await
}

fn cmd_onboard() -> Result<()> {
    let path = config::get_config_path();
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }

    config::save_config(&Config::default(), Some(&path))?;
    println!("Wrote default config to {}", path.display());
    println!("Fill in webhook.verifyToken and the whatsapp section, then run: tokibot serve");
    Ok(())
}

fn cmd_status(config_path: Option<PathBuf>) -> Result<()> {
    let cfg = config::load_config_from_env(config_path.as_deref());

    println!("tokibot {}", tokibot_core::VERSION);
    println!("  bind:              {}:{}", cfg.server.host, cfg.server.port);
    println!(
        "  verify token:      {}",
        if cfg.webhook.verify_token.is_empty() { "(not set)" } else { "set" }
    );
    println!(
        "  whatsapp phone id: {}",
        if cfg.whatsapp.phone_number_id.is_empty() {
            "(not set)"
        } else {
            &cfg.whatsapp.phone_number_id
        }
    );
    println!("  account service:   {}", cfg.profile.base_url);
    println!("  session idle TTL:  {}s", cfg.session.idle_ttl_secs);
    println!("  dedup retention:   {}s", cfg.dedup.retention_secs);
    Ok(())
}
