use anyhow::{Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::{info, warn};

use pyusd_indexer::chain::EthersChain;
use pyusd_indexer::config::{DexRegistry, TokenConfig, PYUSD_CONTRACT};
use pyusd_indexer::db;
use pyusd_indexer::decoder::LogDecoder;
use pyusd_indexer::etherscan::EtherscanClient;
use pyusd_indexer::extractor::extract_range;
use pyusd_indexer::metrics::{compute_metrics, MetricsBundle};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// SQLite ledger path
    #[arg(short, long, default_value = "pyusd_ledger.db")]
    db_path: String,

    /// Ethereum JSON-RPC HTTP URL. If not provided, read from ETH_RPC_URL env.
    #[arg(short, long)]
    rpc: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a block range and append decoded Transfer records to the ledger
    Extract {
        /// Inclusive lower bound of the range
        #[arg(short, long)]
        start_block: u64,

        /// Blocks to process (clamped to the chain head)
        #[arg(short, long, default_value = "100")]
        num_blocks: u64,

        /// Token contract address (default PYUSD)
        #[arg(short, long)]
        contract: Option<String>,

        /// Token decimals (default 6, PYUSD)
        #[arg(long, default_value = "6")]
        decimals: u32,
    },
    /// Compute the dashboard metrics from the ledger and print the report
    Metrics {
        /// ETH/USD price to apply; fetched from Etherscan when omitted
        #[arg(short, long)]
        price: Option<f64>,
    },
    /// Export the ledger to a CSV file
    Export {
        #[arg(short, long, default_value = "pyusd.csv")]
        out: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut conn = db::open_db(&cli.db_path)?;

    match cli.command {
        Commands::Extract {
            start_block,
            num_blocks,
            contract,
            decimals,
        } => {
            let rpc_url = cli
                .rpc
                .or_else(|| std::env::var("ETH_RPC_URL").ok())
                .context("provide an RPC URL via --rpc or the ETH_RPC_URL env var")?;

            let config = match contract {
                Some(addr) => TokenConfig::new(&addr, decimals),
                None => TokenConfig::default(),
            };
            info!(
                "extracting transfers for {} starting at block {start_block}",
                config.contract_address
            );

            let chain = EthersChain::connect(&rpc_url)?;
            let decoder = LogDecoder::new(&config);
            let records = extract_range(&chain, &decoder, start_block, num_blocks).await?;

            let inserted = db::insert_transfers(&mut conn, &records)?;
            println!(
                "Extracted {} transfer records ({} new, {} duplicates ignored)",
                records.len(),
                inserted,
                records.len() - inserted
            );
        }

        Commands::Metrics { price } => {
            let records = db::load_transfers(&conn)?;

            let etherscan = std::env::var("ETHERSCAN_API_KEY")
                .ok()
                .map(|key| EtherscanClient::new(&key));

            let eth_price = match price {
                Some(p) => p,
                None => {
                    let client = etherscan.as_ref().context(
                        "provide --price or set ETHERSCAN_API_KEY to fetch the latest ETH price",
                    )?;
                    let (p, quoted_at) = client.latest_eth_price().await?;
                    println!("ETH: ${p} (as of {})", format_period(quoted_at));
                    p
                }
            };

            // Supply is decoration on the report; a failed lookup degrades
            // the card, not the run.
            if let Some(client) = &etherscan {
                match client.token_supply(PYUSD_CONTRACT).await {
                    Ok(raw) => {
                        let millions = raw as f64 / 10f64.powi(6) / 1e6;
                        println!("Total supply: {millions:.3} M");
                    }
                    Err(err) => warn!("token supply lookup failed: {err:#}"),
                }
            }

            let bundle = compute_metrics(&records, eth_price, &DexRegistry::default())?;
            print_report(&bundle);
        }

        Commands::Export { out } => {
            let records = db::load_transfers(&conn)?;
            db::export_csv(&records, &out)?;
            println!("Wrote {} records to {out}", records.len());
        }
    }

    Ok(())
}

fn format_period(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn print_report(bundle: &MetricsBundle) {
    let h = &bundle.headline;
    println!("\n=== PYUSD metrics (ETH at ${}) ===", bundle.eth_price_usd);
    println!("Transfers: {}", h.transfer_count);
    println!("Total volume: {:.3}", h.total_volume);
    println!("Average amount: {:.3}", h.average_amount);
    println!(
        "Unique senders / receivers: {} / {}",
        h.unique_senders, h.unique_receivers
    );
    println!("Active wallets: {}", h.active_wallets);
    println!(
        "Gas revenue: ${:.3} total, ${:.3} per transfer",
        h.total_revenue_usd, h.average_revenue_usd
    );

    println!("\n--- Daily activity ---");
    for period in &bundle.rollups.daily {
        println!(
            "{}  txs {:<6} volume {:<14.3} fees ${:.3}",
            format_period(period.period),
            period.tx_count,
            period.total_amount,
            period.total_fees_usd
        );
    }

    println!("\n--- Weekly active wallets ---");
    for period in &bundle.active_wallets.weekly {
        println!("{}  {}", format_period(period.period), period.active_wallets);
    }

    println!("\n--- Cohort retention (% by weeks since first seen) ---");
    for row in &bundle.retention.cohorts {
        let rates: Vec<String> = row.rates.iter().map(|r| format!("{r:>6.2}")).collect();
        println!("{}  {}", format_period(row.cohort_week), rates.join(" "));
    }

    println!("\n--- Top holders (net flow) ---");
    for holder in &bundle.top_holders {
        println!("{}  {:.3}", holder.address, holder.balance);
    }

    println!("\n--- Top senders ---");
    for mover in &bundle.top_senders {
        println!(
            "{}  txs {:<5} volume {:<14.3} fees ${:.3}",
            mover.address, mover.tx_count, mover.total_amount, mover.total_fees_usd
        );
    }

    println!("\n--- Top receivers ---");
    for mover in &bundle.top_receivers {
        println!(
            "{}  txs {:<5} volume {:<14.3} fees ${:.3}",
            mover.address, mover.tx_count, mover.total_amount, mover.total_fees_usd
        );
    }

    println!("\n--- Swaps ---");
    let swap_txs: u64 = bundle.swaps.overall.daily.iter().map(|p| p.tx_count).sum();
    let swap_volume: f64 = bundle.swaps.overall.daily.iter().map(|p| p.total_amount).sum();
    println!("Overall: {swap_txs} swaps, volume {swap_volume:.3}");
    for (venue, rollups) in &bundle.swaps.per_venue {
        let txs: u64 = rollups.daily.iter().map(|p| p.tx_count).sum();
        let volume: f64 = rollups.daily.iter().map(|p| p.total_amount).sum();
        println!("{venue}: {txs} swaps, volume {volume:.3}");
    }

    println!("\n--- Transaction health ---");
    for (label, count) in bundle.health.as_rows() {
        println!("{label:<14} {count}");
    }
}
