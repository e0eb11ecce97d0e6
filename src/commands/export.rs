use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use crate::cli::Cli;
use crate::config::ExportConfig;
use crate::constants::{PURCHASES_FILE, PURCHASES_HEADER, SALES_FILE, SALES_HEADER};
use crate::csfloat::{fetch_trades, CsFloatClient, Pacer, Role, TradeBatch, TradeSource};
use crate::csv_export::{write_trades_csvs, CsvOutput};
use crate::trades::build_ledger;

#[derive(Debug)]
pub struct ExportSummary {
    pub fetched: usize,
    pub purchases: usize,
    pub sales: usize,
    pub skipped: usize,
    pub purchases_path: PathBuf,
    pub sales_path: PathBuf,
}

pub async fn execute(cli: Cli) -> Result<()> {
    let config = ExportConfig::resolve(cli)?;
    let client = CsFloatClient::new(&config.base_url, &config.api_key)?;

    let summary = run(&client, &config).await?;

    println!("exported {} purchases to {}", summary.purchases, summary.purchases_path.display());
    println!("exported {} sales to {}", summary.sales, summary.sales_path.display());
    if summary.skipped > 0 {
        println!("skipped {} of {} trades (see warnings above)", summary.skipped, summary.fetched);
    }
    println!("done! :)");
    Ok(())
}

/// Fetch both sides of the account's history, then write the two CSVs.
///
/// Nothing is written unless every page was fetched.
pub async fn run<S: TradeSource>(source: &S, config: &ExportConfig) -> Result<ExportSummary> {
    let mut pacer = Pacer::new(config.fetch.request_delay);
    let mut fetched = TradeBatch::default();

    for role in [Role::Buyer, Role::Seller] {
        let batch = fetch_trades(source, role, &config.fetch, &mut pacer)
            .await
            .with_context(|| format!("Failed to fetch {} trades", role))?;
        info!("found {} {} trades", batch.received, role);
        fetched.extend(batch);
    }

    let ledger = build_ledger(fetched.trades, &config.steam_id, config.price_format);

    let purchases_path = config.output_dir.join(PURCHASES_FILE);
    let sales_path = config.output_dir.join(SALES_FILE);
    write_trades_csvs(&[
        CsvOutput { path: &purchases_path, header: &PURCHASES_HEADER, rows: &ledger.purchases },
        CsvOutput { path: &sales_path, header: &SALES_HEADER, rows: &ledger.sales },
    ])?;

    Ok(ExportSummary {
        fetched: fetched.received,
        purchases: ledger.purchases.len(),
        sales: ledger.sales.len(),
        skipped: ledger.skipped + fetched.malformed,
        purchases_path,
        sales_path,
    })
}
