use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use reqwest::{header::AUTHORIZATION, Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::constants::{REQUEST_TIMEOUT_SECS, TRADES_PATH, USER_AGENT, VERIFIED_STATE};

/// Side of a trade the API is asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Buyer,
    Seller,
}

impl Role {
    pub fn as_query(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Trade {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub buyer: Option<Party>,
    #[serde(default, deserialize_with = "lenient")]
    pub seller: Option<Party>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub accepted_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub verified_at: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub contract: Option<Contract>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Party {
    #[serde(default, deserialize_with = "lenient_string")]
    pub steam_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Contract {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub price: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub item: Option<Item>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Item {
    #[serde(default, deserialize_with = "lenient_string")]
    pub market_hash_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub float_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub wear_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub type_name: Option<String>,
}

// Field decoders that turn a mistyped value into `None` instead of failing
// the whole record. Numbers and numeric strings are accepted interchangeably.

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    })
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<i64>, D::Error> {
    let from_f64 = |f: f64| f.is_finite().then(|| f.round() as i64);
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(from_f64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().and_then(from_f64))
        }
        _ => None,
    })
}

fn lenient<'de, D: Deserializer<'de>, T: DeserializeOwned>(d: D) -> std::result::Result<Option<T>, D::Error> {
    Ok(serde_json::from_value(Value::deserialize(d)?).ok())
}

/// Decoded trades from one or more pages.
///
/// `received` counts every record the API returned. `malformed` counts the
/// ones that were not JSON objects and were dropped, so pagination is not
/// cut short by a bad record and the summary can report them.
#[derive(Debug, Clone, Default)]
pub struct TradeBatch {
    pub trades: Vec<Trade>,
    pub received: usize,
    pub malformed: usize,
}

impl TradeBatch {
    pub fn extend(&mut self, other: TradeBatch) {
        self.trades.extend(other.trades);
        self.received += other.received;
        self.malformed += other.malformed;
    }
}

#[derive(Deserialize)]
struct RawPage {
    trades: Option<Vec<Value>>,
}

/// Decode a trades response body. Records that aren't JSON objects are dropped.
pub fn parse_trades_page(body: &str) -> Result<TradeBatch> {
    let raw: RawPage = serde_json::from_str(body).context("Failed to parse trades response")?;
    let records = raw.trades.unwrap_or_default();
    let received = records.len();

    let mut trades = Vec::with_capacity(received);
    let mut malformed = 0;
    for (idx, value) in records.into_iter().enumerate() {
        if !value.is_object() {
            warn!("skipping malformed trade at position {}: expected an object, got {}", idx, value);
            malformed += 1;
            continue;
        }
        match serde_json::from_value::<Trade>(value) {
            Ok(trade) => trades.push(trade),
            Err(e) => {
                warn!("skipping malformed trade at position {}: {}", idx, e);
                malformed += 1;
            }
        }
    }

    Ok(TradeBatch { trades, received, malformed })
}

/// Map a non-success status to a fatal error. 401/403 mean the API key was rejected.
pub fn check_status(status: StatusCode, body: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        bail!("Authentication failed ({}): check API_KEY. Response: {}", status, body.trim());
    }
    bail!("Trades request failed ({}): {}", status, body.trim());
}

#[allow(async_fn_in_trait)]
pub trait TradeSource {
    async fn fetch_page(&self, role: Role, page: u32, limit: u32) -> Result<TradeBatch>;
}

pub struct CsFloatClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl CsFloatClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn trades_url(&self, role: Role, page: u32, limit: u32) -> String {
        format!(
            "{}{}?role={}&state={}&limit={}&page={}",
            self.base_url, TRADES_PATH, role.as_query(), VERIFIED_STATE, limit, page
        )
    }
}

impl TradeSource for CsFloatClient {
    async fn fetch_page(&self, role: Role, page: u32, limit: u32) -> Result<TradeBatch> {
        let url = self.trades_url(role, page, limit);
        debug!("GET {}", url);

        let resp = self.http.get(&url)
            .header(AUTHORIZATION, &self.api_key)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {} trades page {}", role, page))?;

        let status = resp.status();
        let body = resp.text().await.context("Failed to read trades response")?;
        check_status(status, &body)?;

        parse_trades_page(&body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub page_size: u32,
    pub max_pages: u32,
    pub request_delay: Duration,
}

/// Keeps consecutive requests at least `delay` apart.
pub struct Pacer {
    delay: Duration,
    last_request: Option<Instant>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last_request: None }
    }

    pub async fn wait(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                let remaining = self.delay - elapsed;
                info!("waiting {:.2} seconds before next api request", remaining.as_secs_f64());
                sleep(remaining).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

/// Fetch every page of `role` trades.
///
/// Stops at the first empty page, the first short page, or after
/// `max_pages` requests.
pub async fn fetch_trades<S: TradeSource>(
    source: &S,
    role: Role,
    options: &FetchOptions,
    pacer: &mut Pacer,
) -> Result<TradeBatch> {
    let mut fetched = TradeBatch::default();

    for page in 0..options.max_pages {
        pacer.wait().await;
        info!("fetching {} trades page {}", role, page);

        let batch = source.fetch_page(role, page, options.page_size).await?;
        if batch.received == 0 {
            info!("no more {} trades found", role);
            return Ok(fetched);
        }

        let short = batch.received < options.page_size as usize;
        fetched.extend(batch);
        if short {
            info!("end of {} trades", role);
            return Ok(fetched);
        }
    }

    warn!(
        "stopped after {} pages of {} trades; raise --max-pages to fetch more",
        options.max_pages, role
    );
    Ok(fetched)
}
