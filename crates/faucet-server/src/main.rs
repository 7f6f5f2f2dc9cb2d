//! Main entry point for the faucet server.

use anyhow::Result;
use clap::{Arg, Command};
use faucet_server::{config::FaucetConfig, error::FaucetError, http::start_server};
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Parse command line arguments
    let matches = Command::new("faucet-server")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Token Faucet Server - rate-limited token distribution with cooldown and lifetime cap")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to configuration file")
                .default_value("faucet-config.toml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .help("Generate a default configuration file and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("faucet-config.toml");

    // Handle config generation
    if matches.get_flag("generate-config") {
        return generate_config(config_path);
    }

    info!("Starting Token Faucet Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Loading configuration from: {}", config_path);

    // Load configuration
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("Use --generate-config to create a default configuration file");
            std::process::exit(1);
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    info!("Configuration loaded and validated successfully");
    info!("Server will bind to: {}:{}", config.http.bind_address, config.http.port);
    info!(
        "Policy: {} {} per claim, {} lifetime, {}s cooldown",
        config.policy.claim_amount,
        config.token.symbol,
        config.policy.lifetime_limit,
        config.policy.cooldown_secs
    );
    match &config.deployment.state_path {
        Some(path) => info!("State file: {}", path),
        None => info!("State file: none (in-memory only)"),
    }

    // Start the server
    if let Err(e) = start_server(&config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Load configuration from file
fn load_config(path: &str) -> Result<FaucetConfig> {
    if !Path::new(path).exists() {
        return Err(anyhow::anyhow!(
            "Configuration file '{}' not found. Use --generate-config to create one.",
            path
        ));
    }

    let config = FaucetConfig::from_file(path).map_err(FaucetError::from)?;
    Ok(config)
}

/// Generate a default configuration file
fn generate_config(path: &str) -> Result<()> {
    let config = FaucetConfig::default();

    config.save_to_file(path)?;

    println!("Generated default configuration file: {}", path);
    println!();
    println!("IMPORTANT: Please edit the configuration file before running the server:");
    println!("1. Set the deployer address (deployment.deployer_address); it administers the faucet");
    println!("2. Adjust token metadata (token section)");
    println!("3. Adjust the claim policy (policy section)");
    println!("4. Choose where state is persisted (deployment.state_path)");
    println!();
    println!("Example usage after configuration:");
    println!("  cargo run --bin faucet-server -- --config {}", path);

    Ok(())
}
