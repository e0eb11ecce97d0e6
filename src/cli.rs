use clap::Parser;
use std::path::PathBuf;

use crate::config::PriceFormat;
use crate::constants::{CSFLOAT_API_URL, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};

#[derive(Parser, Debug)]
#[command(name = "csfloat-export")]
#[command(about = "Export CSFloat trade history to purchase and sale CSV files", long_about = None)]
#[command(version = include_str!("../version.txt").trim_ascii())]
pub struct Cli {
    /// CSFloat API key. Falls back to API_KEY (a .env file is loaded first).
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Steam ID of the account the API key belongs to.
    #[arg(long, env = "STEAM_ID")]
    pub steam_id: Option<String>,

    /// Directory the two CSV files are written to
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Seconds between API requests; 120 avoids CSFloat rate limits
    #[arg(long, default_value_t = 0)]
    pub request_delay: u64,

    /// Trades requested per page (1-1000)
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    /// Upper bound on pages fetched per role
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    pub max_pages: u32,

    /// How prices are written: raw cents, or dollars net of the seller fee on sales
    #[arg(long, value_enum, default_value_t = PriceFormat::Cents)]
    pub price_format: PriceFormat,

    #[arg(long, default_value = CSFLOAT_API_URL, hide = true)]
    pub base_url: String,
}
