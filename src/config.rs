use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;
use crate::constants::MAX_PAGE_SIZE;
use crate::csfloat::FetchOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PriceFormat {
    /// Integer cents, as returned by the API
    #[default]
    Cents,
    /// Dollars with two decimals; sales are net of the 2% seller fee
    Dollars,
}

/// Everything the export needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub api_key: String,
    pub steam_id: String,
    pub base_url: String,
    pub output_dir: PathBuf,
    pub price_format: PriceFormat,
    pub fetch: FetchOptions,
}

impl ExportConfig {
    pub fn resolve(cli: Cli) -> Result<Self> {
        let api_key = require(cli.api_key, "API_KEY", "--api-key")?;
        let steam_id = require(cli.steam_id, "STEAM_ID", "--steam-id")?;

        if cli.page_size == 0 || cli.page_size > MAX_PAGE_SIZE {
            bail!("Invalid page size {}: must be between 1 and {}", cli.page_size, MAX_PAGE_SIZE);
        }
        if cli.max_pages == 0 {
            bail!("Invalid max pages: must be at least 1");
        }

        Ok(Self {
            api_key,
            steam_id,
            base_url: cli.base_url.trim_end_matches('/').to_string(),
            output_dir: cli.output_dir,
            price_format: cli.price_format,
            fetch: FetchOptions {
                page_size: cli.page_size,
                max_pages: cli.max_pages,
                request_delay: Duration::from_secs(cli.request_delay),
            },
        })
    }
}

fn require(value: Option<String>, var: &str, flag: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .with_context(|| format!("{} not set: add it to a .env file or pass {}", var, flag))
}
