pub const CSFLOAT_API_URL: &str = "https://csfloat.com";
pub const TRADES_PATH: &str = "/api/v1/me/trades";

pub const USER_AGENT: &str = concat!("csfloat-export/", env!("CARGO_PKG_VERSION"));
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_PAGE_SIZE: u32 = 500;
pub const MAX_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_MAX_PAGES: u32 = 1000;

pub const PURCHASES_FILE: &str = "csfloat_purchases.csv";
pub const SALES_FILE: &str = "csfloat_sales.csv";

pub const PURCHASES_HEADER: [&str; 6] = ["item name", "price", "float", "type", "date bought", "transaction id"];
pub const SALES_HEADER: [&str; 6] = ["item name", "price", "float", "type", "date sold", "transaction id"];

pub const VERIFIED_STATE: &str = "verified";
