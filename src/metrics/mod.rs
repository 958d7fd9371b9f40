//! Pure transformation layer from the transfer ledger to dashboard tables.
//! Full recompute on every call; callers memoize per (ledger, price)
//! snapshot if they care.

pub mod health;
pub mod rankings;
pub mod resample;
pub mod retention;

use std::collections::{BTreeMap, HashSet};

use anyhow::{bail, Result};

use crate::config::DexRegistry;
use crate::models::TransferRecord;

use health::{health_distribution, HealthDistribution};
use rankings::{top_holders, top_receivers, top_senders, AddressActivity, HolderBalance};
use resample::{
    active_wallets, rollup, swap_metrics, Granularity, PeriodCount, PeriodStats, SwapMetrics,
};
use retention::{cohort_retention, RetentionMatrix};

/// A ledger row with the session's fiat enrichment applied. Built fresh from
/// the stored records; the canonical ledger is never rewritten, so calling
/// the engine twice on the same ledger cannot double-enrich.
#[derive(Debug, Clone)]
pub struct EnrichedRecord {
    pub timestamp: i64,
    pub block_number: u64,
    pub from_address: String,
    pub to_address: String,
    pub tx_hash: String,
    /// Rounded to 3 decimals.
    pub amount: f64,
    pub gas_fees_eth: f64,
    /// `gas_fees_eth * eth_price_usd`, rounded to 3 decimals. The current
    /// price is applied uniformly to historical fees, a known approximation.
    pub gas_fees_usd: f64,
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Non-mutating fiat enrichment of the ledger for one session price.
pub fn enrich_fiat(records: &[TransferRecord], eth_price_usd: f64) -> Vec<EnrichedRecord> {
    records
        .iter()
        .map(|rec| EnrichedRecord {
            timestamp: rec.timestamp,
            block_number: rec.block_number,
            from_address: rec.from_address.clone(),
            to_address: rec.to_address.clone(),
            tx_hash: rec.tx_hash.clone(),
            amount: round_to(rec.amount, 3),
            gas_fees_eth: rec.gas_fees_eth,
            gas_fees_usd: round_to(rec.gas_fees_eth * eth_price_usd, 3),
        })
        .collect()
}

/// Single-number dashboard cards.
#[derive(Debug, Clone)]
pub struct HeadlineStats {
    pub transfer_count: u64,
    pub total_volume: f64,
    pub average_amount: f64,
    pub unique_senders: u64,
    pub unique_receivers: u64,
    pub active_wallets: u64,
    /// Gas spend in USD across the window.
    pub total_revenue_usd: f64,
    pub average_revenue_usd: f64,
}

fn headline(records: &[EnrichedRecord]) -> HeadlineStats {
    let n = records.len() as f64;
    let total_volume: f64 = records.iter().map(|r| r.amount).sum();
    let total_revenue: f64 = records.iter().map(|r| r.gas_fees_usd).sum();

    let senders: HashSet<&str> = records.iter().map(|r| r.from_address.as_str()).collect();
    let receivers: HashSet<&str> = records.iter().map(|r| r.to_address.as_str()).collect();
    let wallets: HashSet<&str> = senders.union(&receivers).copied().collect();

    HeadlineStats {
        transfer_count: records.len() as u64,
        total_volume,
        average_amount: total_volume / n,
        unique_senders: senders.len() as u64,
        unique_receivers: receivers.len() as u64,
        active_wallets: wallets.len() as u64,
        total_revenue_usd: total_revenue,
        average_revenue_usd: total_revenue / n,
    }
}

/// Per-block aggregates (no gap filling; block numbers are the axis).
#[derive(Debug, Clone)]
pub struct BlockStats {
    pub block_number: u64,
    pub tx_count: u64,
    pub total_amount: f64,
    pub average_amount: f64,
    pub total_fees_eth: f64,
    pub average_fees_eth: f64,
}

fn by_block(records: &[EnrichedRecord]) -> Vec<BlockStats> {
    #[derive(Default)]
    struct Acc {
        count: u64,
        amount: f64,
        fees_eth: f64,
    }

    let mut blocks: BTreeMap<u64, Acc> = BTreeMap::new();
    for rec in records {
        let acc = blocks.entry(rec.block_number).or_default();
        acc.count += 1;
        acc.amount += rec.amount;
        acc.fees_eth += rec.gas_fees_eth;
    }

    blocks
        .into_iter()
        .map(|(block_number, acc)| {
            let n = acc.count as f64;
            BlockStats {
                block_number,
                tx_count: acc.count,
                total_amount: acc.amount,
                average_amount: acc.amount / n,
                total_fees_eth: acc.fees_eth,
                average_fees_eth: acc.fees_eth / n,
            }
        })
        .collect()
}

/// The same count/sum/mean rollup at every dashboard granularity.
#[derive(Debug, Clone)]
pub struct Rollups {
    pub hourly: Vec<PeriodStats>,
    pub daily: Vec<PeriodStats>,
    pub weekly: Vec<PeriodStats>,
    pub monthly: Vec<PeriodStats>,
}

#[derive(Debug, Clone)]
pub struct ActiveWalletSeries {
    pub daily: Vec<PeriodCount>,
    pub weekly: Vec<PeriodCount>,
    pub monthly: Vec<PeriodCount>,
}

/// Everything the dashboard renders, computed in one pass over the ledger.
#[derive(Debug, Clone)]
pub struct MetricsBundle {
    pub eth_price_usd: f64,
    pub headline: HeadlineStats,
    pub rollups: Rollups,
    pub by_block: Vec<BlockStats>,
    pub active_wallets: ActiveWalletSeries,
    pub retention: RetentionMatrix,
    pub top_holders: Vec<HolderBalance>,
    pub swaps: SwapMetrics,
    pub top_senders: Vec<AddressActivity>,
    pub top_receivers: Vec<AddressActivity>,
    pub health: HealthDistribution,
}

/// Pure function of (ledger, price, dex table). An empty ledger is a
/// precondition violation: better a clear error here than NaNs in charts.
pub fn compute_metrics(
    records: &[TransferRecord],
    eth_price_usd: f64,
    dex: &DexRegistry,
) -> Result<MetricsBundle> {
    if records.is_empty() {
        bail!("metrics require a non-empty ledger; run an extraction first");
    }

    let enriched = enrich_fiat(records, eth_price_usd);

    Ok(MetricsBundle {
        eth_price_usd,
        headline: headline(&enriched),
        rollups: Rollups {
            hourly: rollup(&enriched, Granularity::Hour),
            daily: rollup(&enriched, Granularity::Day),
            weekly: rollup(&enriched, Granularity::Week),
            monthly: rollup(&enriched, Granularity::Month),
        },
        by_block: by_block(&enriched),
        active_wallets: ActiveWalletSeries {
            daily: active_wallets(&enriched, Granularity::Day),
            weekly: active_wallets(&enriched, Granularity::Week),
            monthly: active_wallets(&enriched, Granularity::Month),
        },
        retention: cohort_retention(&enriched),
        top_holders: top_holders(&enriched),
        swaps: swap_metrics(&enriched, dex),
        top_senders: top_senders(&enriched),
        top_receivers: top_receivers(&enriched),
        health: health_distribution(&enriched),
    })
}
