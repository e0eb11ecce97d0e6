mod cli;
mod commands;
mod config;
mod constants;
mod csfloat;
mod csv_export;
mod trades;

use clap::Parser;
use cli::Cli;
use anyhow::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    commands::export::execute(cli).await
}
