use std::path::PathBuf;

use clap::Parser;
use server::{config::read_config, serve};

#[derive(Debug, Parser)]
#[command(version, about = "Sink and source servers with per-operation idle timeouts")]
struct Args {
    /// Path to the TOML config file
    config_file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let config = read_config(&args.config_file).await?;
    serve(config).await?;
    Ok(())
}
