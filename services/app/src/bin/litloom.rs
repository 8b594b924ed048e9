//! services/app/src/bin/litloom.rs

use clap::Parser;
use litloom_app::{
    cli::{self, Cli},
    config::Config,
    context::build_context,
    error::AppError,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // --- 1. Parse Arguments & Load Configuration ---
    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded.");

    // --- 2. Build the Application Context ---
    let ctx = build_context(&config)?;

    // --- 3. Execute the Command ---
    let output = cli::run(&ctx, &config, cli.command).await?;
    println!("{}", output);
    Ok(())
}
