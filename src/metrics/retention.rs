use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::metrics::{round_to, EnrichedRecord};
use crate::metrics::resample::week_start;

const WEEK_SECS: i64 = 7 * 86_400;

/// One cohort row: wallets first seen in `cohort_week`, with distinct-wallet
/// counts and retention rates per weeks-since-cohort offset. `counts[0]` is
/// the cohort size, so `rates[0]` is always exactly 100.
#[derive(Debug, Clone)]
pub struct CohortRow {
    /// Unix time of the cohort week's Monday.
    pub cohort_week: i64,
    pub counts: Vec<u64>,
    pub rates: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct RetentionMatrix {
    /// Rows sorted by cohort week ascending; all rows share a column count.
    pub cohorts: Vec<CohortRow>,
}

/// Cohort retention over the whole ledger. A wallet's cohort is the
/// Monday-start week of its first appearance as sender or receiver; each
/// later active week contributes to that cohort's count at offset
/// `(week - cohort_week) / 1 week`.
pub fn cohort_retention(records: &[EnrichedRecord]) -> RetentionMatrix {
    // wallet -> set of active weeks
    let mut activity: HashMap<&str, BTreeSet<i64>> = HashMap::new();
    for rec in records {
        let week = week_start(rec.timestamp);
        activity.entry(rec.from_address.as_str()).or_default().insert(week);
        activity.entry(rec.to_address.as_str()).or_default().insert(week);
    }

    // (cohort week, offset) -> distinct wallet count. Week sets are deduped
    // per wallet, so each wallet contributes at most once per cell.
    let mut cells: BTreeMap<i64, HashMap<usize, u64>> = BTreeMap::new();
    let mut max_offset = 0usize;
    for weeks in activity.values() {
        let Some(&cohort) = weeks.first() else { continue };
        for &week in weeks {
            let offset = ((week - cohort) / WEEK_SECS) as usize;
            max_offset = max_offset.max(offset);
            *cells.entry(cohort).or_default().entry(offset).or_insert(0) += 1;
        }
    }

    let cohorts = cells
        .into_iter()
        .map(|(cohort_week, offsets)| {
            let counts: Vec<u64> = (0..=max_offset)
                .map(|offset| offsets.get(&offset).copied().unwrap_or(0))
                .collect();
            let cohort_size = counts[0] as f64;
            let rates = counts
                .iter()
                .map(|&c| round_to(c as f64 / cohort_size * 100.0, 2))
                .collect();
            CohortRow {
                cohort_week,
                counts,
                rates,
            }
        })
        .collect();

    RetentionMatrix { cohorts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::enriched;

    // 2024-01-01, a Monday.
    const WEEK_1: i64 = 1_704_067_200;
    const WEEK_2: i64 = WEEK_1 + WEEK_SECS;
    const WEEK_3: i64 = WEEK_1 + 2 * WEEK_SECS;

    #[test]
    fn offset_zero_is_always_one_hundred_percent() {
        let records = vec![
            enriched("0xa", "0xb", 10.0, WEEK_1),
            enriched("0xc", "0xd", 10.0, WEEK_2),
            enriched("0xa", "0xc", 10.0, WEEK_3),
        ];
        let matrix = cohort_retention(&records);
        assert!(!matrix.cohorts.is_empty());
        for row in &matrix.cohorts {
            assert_eq!(row.rates[0], 100.0);
        }
    }

    #[test]
    fn wallet_active_two_weeks_after_cohort_lands_at_offset_two() {
        // A sends 100 to B in week 1; B sends 30 back in week 3. Both
        // wallets' cohort is week 1.
        let records = vec![
            enriched("0xa", "0xb", 100.0, WEEK_1),
            enriched("0xb", "0xa", 30.0, WEEK_3),
        ];
        let matrix = cohort_retention(&records);
        assert_eq!(matrix.cohorts.len(), 1);
        let row = &matrix.cohorts[0];
        assert_eq!(row.cohort_week, WEEK_1);
        assert_eq!(row.counts[0], 2);
        // Both wallets reappear in week 3.
        assert_eq!(row.counts[2], 2);
        assert_eq!(row.rates[2], 100.0);
        assert_eq!(row.counts[1], 0);
    }

    #[test]
    fn rates_are_cohort_fractions_rounded_to_two_decimals() {
        // Three wallets in week 1; only one of them returns in week 2.
        let records = vec![
            enriched("0xa", "0xb", 1.0, WEEK_1),
            enriched("0xc", "0xa", 1.0, WEEK_1),
            enriched("0xa", "0xa", 1.0, WEEK_2),
        ];
        let matrix = cohort_retention(&records);
        assert_eq!(matrix.cohorts.len(), 1);
        let row = &matrix.cohorts[0];
        assert_eq!(row.counts, vec![3, 1]);
        assert_eq!(row.rates, vec![100.0, 33.33]);
    }
}
