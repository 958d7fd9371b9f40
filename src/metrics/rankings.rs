use std::cmp::Ordering;
use std::collections::HashMap;

use crate::metrics::EnrichedRecord;

pub const TOP_HOLDERS: usize = 5;
pub const TOP_MOVERS: usize = 6;

/// Net flow over the observed window, not a true on-chain balance: an
/// address receiving then re-sending nets out.
#[derive(Debug, Clone, PartialEq)]
pub struct HolderBalance {
    pub address: String,
    pub balance: f64,
}

/// Top addresses by net received minus sent. Addresses that netted nothing
/// (or sent out more than observed in) are excluded.
pub fn top_holders(records: &[EnrichedRecord]) -> Vec<HolderBalance> {
    let mut net: HashMap<&str, f64> = HashMap::new();
    for rec in records {
        *net.entry(rec.to_address.as_str()).or_insert(0.0) += rec.amount;
        *net.entry(rec.from_address.as_str()).or_insert(0.0) -= rec.amount;
    }

    let mut holders: Vec<HolderBalance> = net
        .into_iter()
        .filter(|(_, balance)| *balance > 0.0)
        .map(|(address, balance)| HolderBalance {
            address: address.to_string(),
            balance,
        })
        .collect();
    holders.sort_by(|a, b| b.balance.partial_cmp(&a.balance).unwrap_or(Ordering::Equal));
    holders.truncate(TOP_HOLDERS);
    holders
}

/// Per-address activity totals for the sender/receiver leaderboards.
#[derive(Debug, Clone)]
pub struct AddressActivity {
    pub address: String,
    pub tx_count: u64,
    pub total_amount: f64,
    pub total_fees_usd: f64,
    pub total_fees_eth: f64,
}

pub fn top_senders(records: &[EnrichedRecord]) -> Vec<AddressActivity> {
    top_by(records, |rec| rec.from_address.as_str())
}

pub fn top_receivers(records: &[EnrichedRecord]) -> Vec<AddressActivity> {
    top_by(records, |rec| rec.to_address.as_str())
}

fn top_by<'a>(
    records: &'a [EnrichedRecord],
    key: impl Fn(&'a EnrichedRecord) -> &'a str,
) -> Vec<AddressActivity> {
    let mut grouped: HashMap<&str, AddressActivity> = HashMap::new();
    for rec in records {
        let entry = grouped.entry(key(rec)).or_insert_with(|| AddressActivity {
            address: key(rec).to_string(),
            tx_count: 0,
            total_amount: 0.0,
            total_fees_usd: 0.0,
            total_fees_eth: 0.0,
        });
        entry.tx_count += 1;
        entry.total_amount += rec.amount;
        entry.total_fees_usd += rec.gas_fees_usd;
        entry.total_fees_eth += rec.gas_fees_eth;
    }

    let mut movers: Vec<AddressActivity> = grouped.into_values().collect();
    movers.sort_by(|a, b| b.tx_count.cmp(&a.tx_count).then_with(|| a.address.cmp(&b.address)));
    movers.truncate(TOP_MOVERS);
    movers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::enriched;

    const TS: i64 = 1_704_067_200;

    #[test]
    fn non_positive_net_balances_never_rank() {
        // 0xa sends everything away, 0xb breaks even, 0xc accumulates.
        let records = vec![
            enriched("0xa", "0xc", 100.0, TS),
            enriched("0xb", "0xc", 50.0, TS),
            enriched("0xc", "0xb", 50.0, TS),
        ];
        let holders = top_holders(&records);
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].address, "0xc");
        assert_eq!(holders[0].balance, 100.0);
    }

    #[test]
    fn holders_are_sorted_descending_and_capped() {
        let mut records = Vec::new();
        for i in 0..8u32 {
            records.push(enriched("0xsource", &format!("0x{i}"), f64::from(i + 1), TS));
        }
        let holders = top_holders(&records);
        assert_eq!(holders.len(), TOP_HOLDERS);
        assert_eq!(holders[0].address, "0x7");
        assert!(holders.windows(2).all(|w| w[0].balance >= w[1].balance));
    }

    #[test]
    fn senders_rank_by_transaction_count() {
        let records = vec![
            enriched("0xa", "0xz", 1.0, TS),
            enriched("0xa", "0xz", 1.0, TS),
            enriched("0xa", "0xz", 1.0, TS),
            enriched("0xb", "0xz", 500.0, TS),
        ];
        let senders = top_senders(&records);
        // Count beats volume for ranking.
        assert_eq!(senders[0].address, "0xa");
        assert_eq!(senders[0].tx_count, 3);
        assert_eq!(senders[1].address, "0xb");
        assert_eq!(senders[1].total_amount, 500.0);
    }

    #[test]
    fn leaderboards_are_capped_at_six() {
        let mut records = Vec::new();
        for i in 0..10u32 {
            records.push(enriched(&format!("0x{i}"), "0xz", 1.0, TS));
        }
        assert_eq!(top_senders(&records).len(), TOP_MOVERS);
        assert_eq!(top_receivers(&records).len(), 1);
    }
}
