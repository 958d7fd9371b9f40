use crate::metrics::EnrichedRecord;

/// Stand-in for the ±infinity a zero-amount transfer would otherwise
/// produce; sorts below every real score and labels "Extremely bad".
pub const ZERO_AMOUNT_SENTINEL: f64 = -9999.0;

/// Fee cost relative to transfer value: `gas_fees_usd * 100 / amount`.
pub fn health_score(gas_fees_usd: f64, amount: f64) -> f64 {
    if amount == 0.0 {
        return ZERO_AMOUNT_SENTINEL;
    }
    gas_fees_usd * 100.0 / amount
}

/// Qualitative fee-burden buckets, ordered best to worst (the non-positive
/// bucket catches the sentinel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthLabel {
    ExtremelyBad,
    Excellent,
    Good,
    Fair,
    Poor,
}

impl HealthLabel {
    /// Threshold boundaries are half-open: a score of exactly 10 is Good,
    /// exactly 30 is Poor.
    pub fn classify(score: f64) -> Self {
        if score <= 0.0 {
            HealthLabel::ExtremelyBad
        } else if score < 10.0 {
            HealthLabel::Excellent
        } else if score < 20.0 {
            HealthLabel::Good
        } else if score < 30.0 {
            HealthLabel::Fair
        } else {
            HealthLabel::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthLabel::ExtremelyBad => "Extremely bad",
            HealthLabel::Excellent => "Excellent",
            HealthLabel::Good => "Good",
            HealthLabel::Fair => "Fair",
            HealthLabel::Poor => "Poor",
        }
    }
}

/// Full label distribution over the ledger, not a single aggregate score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthDistribution {
    pub extremely_bad: u64,
    pub excellent: u64,
    pub good: u64,
    pub fair: u64,
    pub poor: u64,
}

impl HealthDistribution {
    pub fn as_rows(&self) -> [(&'static str, u64); 5] {
        [
            ("Extremely bad", self.extremely_bad),
            ("Excellent", self.excellent),
            ("Good", self.good),
            ("Fair", self.fair),
            ("Poor", self.poor),
        ]
    }
}

pub fn health_distribution(records: &[EnrichedRecord]) -> HealthDistribution {
    let mut dist = HealthDistribution::default();
    for rec in records {
        match HealthLabel::classify(health_score(rec.gas_fees_usd, rec.amount)) {
            HealthLabel::ExtremelyBad => dist.extremely_bad += 1,
            HealthLabel::Excellent => dist.excellent += 1,
            HealthLabel::Good => dist.good += 1,
            HealthLabel::Fair => dist.fair += 1,
            HealthLabel::Poor => dist.poor += 1,
        }
    }
    dist
}
