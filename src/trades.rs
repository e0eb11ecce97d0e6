use anyhow::{Context, Result};
use chrono::DateTime;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::config::PriceFormat;
use crate::constants::VERIFIED_STATE;
use crate::csfloat::{Party, Trade};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeKind {
    Purchase,
    Sale,
}

/// One output line.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRow {
    pub item_name: String,
    pub price: String,
    pub float: Option<f64>,
    pub item_type: String,
    pub date: String,
    pub transaction_id: String,
}

impl TradeRow {
    pub fn to_record(&self) -> [String; 6] {
        [
            self.item_name.clone(),
            self.price.clone(),
            self.float.map(|f| f.to_string()).unwrap_or_default(),
            self.item_type.clone(),
            self.date.clone(),
            self.transaction_id.clone(),
        ]
    }
}

#[derive(Debug, Default)]
pub struct Ledger {
    pub purchases: Vec<TradeRow>,
    pub sales: Vec<TradeRow>,
    pub skipped: usize,
}

/// Decide which side of `trade` the account was on. Buyer wins if both match.
pub fn classify(trade: &Trade, steam_id: &str) -> Option<TradeKind> {
    let is = |party: &Option<Party>| {
        party.as_ref().and_then(|p| p.steam_id.as_deref()) == Some(steam_id)
    };

    if is(&trade.buyer) {
        Some(TradeKind::Purchase)
    } else if is(&trade.seller) {
        Some(TradeKind::Sale)
    } else {
        None
    }
}

/// Format an API timestamp as YYYY-MM-DD.
pub fn format_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive().format("%Y-%m-%d").to_string());
    }
    match raw.split_once('T') {
        Some((date, _)) => Some(date.to_string()),
        None => Some(raw.chars().take(10).collect()),
    }
}

pub fn format_price(cents: i64, kind: TradeKind, format: PriceFormat) -> String {
    match format {
        PriceFormat::Cents => cents.to_string(),
        PriceFormat::Dollars => {
            let dollars = (Decimal::from(cents) / Decimal::from(100)).round_dp(2);
            let mut net = match kind {
                TradeKind::Purchase => dollars,
                // CSFloat keeps 2% of every sale
                TradeKind::Sale => (dollars * Decimal::new(98, 2)).round_dp(2),
            };
            net.rescale(2);
            net.to_string()
        }
    }
}

pub fn map_trade(trade: &Trade, kind: TradeKind, format: PriceFormat) -> Result<TradeRow> {
    let transaction_id = trade.id.clone()
        .filter(|id| !id.is_empty())
        .context("trade has no id")?;

    let date = [trade.accepted_at.as_deref(), trade.verified_at.as_deref()]
        .into_iter()
        .flatten()
        .find_map(format_date)
        .with_context(|| format!("trade {} has no date", transaction_id))?;

    let contract = trade.contract.clone().unwrap_or_default();
    let item = contract.item.unwrap_or_default();

    Ok(TradeRow {
        item_name: item.market_hash_name.unwrap_or_else(|| "Unknown".to_string()),
        price: format_price(contract.price.unwrap_or(0), kind, format),
        float: item.float_value,
        item_type: item.wear_name
            .or(item.type_name)
            .unwrap_or_else(|| "Unknown".to_string()),
        date,
        transaction_id,
    })
}

/// Route every trade into purchases or sales, each sorted by date.
///
/// Trades seen twice (same id) are kept once. Trades that are not verified,
/// don't involve `steam_id` or can't be mapped are counted in `skipped`.
pub fn build_ledger(trades: impl IntoIterator<Item = Trade>, steam_id: &str, format: PriceFormat) -> Ledger {
    let mut ledger = Ledger::default();
    let mut seen = HashSet::new();

    for trade in trades {
        if let Some(state) = trade.state.as_deref().filter(|s| *s != VERIFIED_STATE) {
            warn!("skipping trade {}: state is {}, not {}",
                trade.id.as_deref().unwrap_or("<no id>"), state, VERIFIED_STATE);
            ledger.skipped += 1;
            continue;
        }

        let Some(kind) = classify(&trade, steam_id) else {
            warn!("skipping trade {}: steam id {} is neither buyer nor seller",
                trade.id.as_deref().unwrap_or("<no id>"), steam_id);
            ledger.skipped += 1;
            continue;
        };

        let row = match map_trade(&trade, kind, format) {
            Ok(row) => row,
            Err(e) => {
                warn!("skipping trade: {}", e);
                ledger.skipped += 1;
                continue;
            }
        };

        if !seen.insert(row.transaction_id.clone()) {
            debug!("trade {} already exported", row.transaction_id);
            continue;
        }

        match kind {
            TradeKind::Purchase => ledger.purchases.push(row),
            TradeKind::Sale => ledger.sales.push(row),
        }
    }

    ledger.purchases.sort_by(|a, b| a.date.cmp(&b.date));
    ledger.sales.sort_by(|a, b| a.date.cmp(&b.date));
    ledger
}
