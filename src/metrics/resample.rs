use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Datelike, Months, NaiveDate};

use crate::config::DexRegistry;
use crate::metrics::EnrichedRecord;

/// Fixed-width time windows records are grouped into. Week buckets start
/// Monday 00:00 UTC; month buckets are calendar months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Hour,
    Day,
    Week,
    Month,
}

/// Unix time of the start of the bucket containing `ts`.
pub fn bucket_start(ts: i64, granularity: Granularity) -> i64 {
    match granularity {
        Granularity::Hour => ts - ts.rem_euclid(3600),
        Granularity::Day => ts - ts.rem_euclid(86_400),
        Granularity::Week => week_start(ts),
        Granularity::Month => month_start(ts),
    }
}

/// Start of the bucket after the one starting at `start`.
pub fn next_bucket(start: i64, granularity: Granularity) -> i64 {
    match granularity {
        Granularity::Hour => start + 3600,
        Granularity::Day => start + 86_400,
        Granularity::Week => start + 7 * 86_400,
        Granularity::Month => DateTime::from_timestamp(start, 0)
            .and_then(|dt| dt.date_naive().checked_add_months(Months::new(1)))
            .and_then(date_to_timestamp)
            .unwrap_or(start + 31 * 86_400),
    }
}

/// Monday 00:00 UTC of the week containing `ts`.
pub fn week_start(ts: i64) -> i64 {
    let day = ts - ts.rem_euclid(86_400);
    DateTime::from_timestamp(day, 0)
        .map(|dt| day - i64::from(dt.date_naive().weekday().num_days_from_monday()) * 86_400)
        .unwrap_or(day)
}

fn month_start(ts: i64) -> i64 {
    DateTime::from_timestamp(ts, 0)
        .and_then(|dt| {
            let date = dt.date_naive();
            NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        })
        .and_then(date_to_timestamp)
        .unwrap_or(ts)
}

fn date_to_timestamp(date: NaiveDate) -> Option<i64> {
    date.and_hms_opt(0, 0, 0).map(|t| t.and_utc().timestamp())
}

/// Aggregates for one time bucket. Empty buckets carry zero counts/sums and
/// NaN means so charts show troughs rather than missing points.
#[derive(Debug, Clone)]
pub struct PeriodStats {
    /// Unix time of the bucket start.
    pub period: i64,
    pub tx_count: u64,
    pub total_amount: f64,
    pub average_amount: f64,
    pub total_fees_usd: f64,
    pub average_fees_usd: f64,
    pub total_fees_eth: f64,
    pub average_fees_eth: f64,
}

/// Count/sum/mean rollup over a continuous bucket timeline. Buckets between
/// the first and last observed record always appear, active or not.
pub fn rollup(records: &[EnrichedRecord], granularity: Granularity) -> Vec<PeriodStats> {
    if records.is_empty() {
        return Vec::new();
    }

    #[derive(Default)]
    struct Acc {
        count: u64,
        amount: f64,
        fees_usd: f64,
        fees_eth: f64,
    }

    let mut buckets: BTreeMap<i64, Acc> = BTreeMap::new();
    for rec in records {
        let acc = buckets.entry(bucket_start(rec.timestamp, granularity)).or_default();
        acc.count += 1;
        acc.amount += rec.amount;
        acc.fees_usd += rec.gas_fees_usd;
        acc.fees_eth += rec.gas_fees_eth;
    }

    let first = *buckets.keys().next().unwrap_or(&0);
    let last = *buckets.keys().next_back().unwrap_or(&0);

    let mut out = Vec::new();
    let mut period = first;
    loop {
        let stats = match buckets.get(&period) {
            Some(acc) => {
                let n = acc.count as f64;
                PeriodStats {
                    period,
                    tx_count: acc.count,
                    total_amount: acc.amount,
                    average_amount: acc.amount / n,
                    total_fees_usd: acc.fees_usd,
                    average_fees_usd: acc.fees_usd / n,
                    total_fees_eth: acc.fees_eth,
                    average_fees_eth: acc.fees_eth / n,
                }
            }
            None => PeriodStats {
                period,
                tx_count: 0,
                total_amount: 0.0,
                average_amount: f64::NAN,
                total_fees_usd: 0.0,
                average_fees_usd: f64::NAN,
                total_fees_eth: 0.0,
                average_fees_eth: f64::NAN,
            },
        };
        out.push(stats);
        if period >= last {
            break;
        }
        period = next_bucket(period, granularity);
    }
    out
}

/// Distinct active wallets per bucket, zero-filled like `rollup`.
#[derive(Debug, Clone)]
pub struct PeriodCount {
    pub period: i64,
    pub active_wallets: u64,
}

/// A wallet counts as active in a period if it appears as sender or
/// receiver; one appearing as both counts once.
pub fn active_wallets(records: &[EnrichedRecord], granularity: Granularity) -> Vec<PeriodCount> {
    if records.is_empty() {
        return Vec::new();
    }

    let mut buckets: BTreeMap<i64, HashSet<&str>> = BTreeMap::new();
    for rec in records {
        let wallets = buckets.entry(bucket_start(rec.timestamp, granularity)).or_default();
        wallets.insert(rec.from_address.as_str());
        wallets.insert(rec.to_address.as_str());
    }

    let first = *buckets.keys().next().unwrap_or(&0);
    let last = *buckets.keys().next_back().unwrap_or(&0);

    let mut out = Vec::new();
    let mut period = first;
    loop {
        let count = buckets.get(&period).map(|w| w.len() as u64).unwrap_or(0);
        out.push(PeriodCount {
            period,
            active_wallets: count,
        });
        if period >= last {
            break;
        }
        period = next_bucket(period, granularity);
    }
    out
}

/// Swap rollups at the dashboard's three granularities.
#[derive(Debug, Clone, Default)]
pub struct SwapRollups {
    pub daily: Vec<PeriodStats>,
    pub weekly: Vec<PeriodStats>,
    pub monthly: Vec<PeriodStats>,
}

fn swap_rollups(records: &[EnrichedRecord]) -> SwapRollups {
    SwapRollups {
        daily: rollup(records, Granularity::Day),
        weekly: rollup(records, Granularity::Week),
        monthly: rollup(records, Granularity::Month),
    }
}

/// Swap activity: overall and broken out per venue.
#[derive(Debug, Clone, Default)]
pub struct SwapMetrics {
    pub overall: SwapRollups,
    pub per_venue: BTreeMap<String, SwapRollups>,
}

/// A transfer is a swap iff its destination is a known router address.
pub fn swap_metrics(records: &[EnrichedRecord], dex: &DexRegistry) -> SwapMetrics {
    let swaps: Vec<EnrichedRecord> = records
        .iter()
        .filter(|r| dex.venue(&r.to_address).is_some())
        .cloned()
        .collect();

    let mut per_venue = BTreeMap::new();
    for venue in dex.venues() {
        let venue_swaps: Vec<EnrichedRecord> = swaps
            .iter()
            .filter(|r| dex.venue(&r.to_address) == Some(venue.as_str()))
            .cloned()
            .collect();
        per_venue.insert(venue, swap_rollups(&venue_swaps));
    }

    SwapMetrics {
        overall: swap_rollups(&swaps),
        per_venue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::enriched;

    // 2024-01-01 was a Monday.
    const MON_JAN_1: i64 = 1_704_067_200;

    #[test]
    fn week_buckets_start_monday() {
        // Wednesday Jan 3 2024, 15:30 UTC
        let wednesday = MON_JAN_1 + 2 * 86_400 + 15 * 3600 + 1800;
        assert_eq!(bucket_start(wednesday, Granularity::Week), MON_JAN_1);
        // A Monday maps to itself.
        assert_eq!(bucket_start(MON_JAN_1, Granularity::Week), MON_JAN_1);
    }

    #[test]
    fn month_buckets_are_calendar_months() {
        // Jan 31 and Jan 1 share a bucket; Feb 1 starts a new one.
        let jan_31 = MON_JAN_1 + 30 * 86_400;
        let feb_1 = MON_JAN_1 + 31 * 86_400;
        assert_eq!(bucket_start(jan_31, Granularity::Month), MON_JAN_1);
        assert_eq!(bucket_start(feb_1, Granularity::Month), feb_1);
        assert_eq!(next_bucket(MON_JAN_1, Granularity::Month), feb_1);
    }

    #[test]
    fn rollup_fills_quiet_buckets_with_zero_counts() {
        // Activity in hour 0 and hour 3 only.
        let records = vec![
            enriched("0xa", "0xb", 100.0, MON_JAN_1),
            enriched("0xa", "0xb", 50.0, MON_JAN_1 + 3 * 3600),
        ];
        let hourly = rollup(&records, Granularity::Hour);
        assert_eq!(hourly.len(), 4);
        assert_eq!(hourly[0].tx_count, 1);
        assert_eq!(hourly[1].tx_count, 0);
        assert_eq!(hourly[1].total_amount, 0.0);
        assert!(hourly[1].average_amount.is_nan());
        assert_eq!(hourly[3].tx_count, 1);
        assert_eq!(hourly[3].total_amount, 50.0);
    }

    #[test]
    fn rollup_sums_and_means_within_a_bucket() {
        let records = vec![
            enriched("0xa", "0xb", 100.0, MON_JAN_1),
            enriched("0xc", "0xd", 200.0, MON_JAN_1 + 60),
        ];
        let daily = rollup(&records, Granularity::Day);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].tx_count, 2);
        assert_eq!(daily[0].total_amount, 300.0);
        assert_eq!(daily[0].average_amount, 150.0);
    }

    #[test]
    fn active_wallet_counts_are_bounded_by_record_count() {
        let records = vec![
            enriched("0xa", "0xb", 1.0, MON_JAN_1),
            // 0xb active as both sender and receiver: counts once.
            enriched("0xb", "0xb", 1.0, MON_JAN_1 + 60),
        ];
        let daily = active_wallets(&records, Granularity::Day);
        assert_eq!(daily.len(), 1);
        let count = daily[0].active_wallets;
        assert_eq!(count, 2);
        assert!(count >= 1);
        assert!(count <= records.len() as u64 * 2);
    }

    #[test]
    fn swaps_are_classified_by_destination_router() {
        let dex = DexRegistry::default();
        let records = vec![
            enriched("0xa", "0x4a4d2410c3d4cfa8dd0d275bedefbd2f7b61ba2e", 10.0, MON_JAN_1),
            enriched("0xa", "0x13394005c1012e708fce1eb974f1130fdc73a5ce", 20.0, MON_JAN_1),
            enriched("0xa", "0xf313d711d71eb9a607b4a61a827a9e32a7846621", 30.0, MON_JAN_1),
            enriched("0xa", "0xb", 40.0, MON_JAN_1),
        ];
        let swaps = swap_metrics(&records, &dex);
        assert_eq!(swaps.overall.daily[0].tx_count, 3);
        assert_eq!(swaps.overall.daily[0].total_amount, 60.0);
        // Two routers alias to uniswapv3.
        assert_eq!(swaps.per_venue["uniswapv3"].daily[0].tx_count, 2);
        assert_eq!(swaps.per_venue["uniswapv2"].daily[0].tx_count, 1);
    }
}
