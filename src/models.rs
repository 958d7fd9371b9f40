use serde::{Deserialize, Serialize};

/// One decoded ERC-20 Transfer event, as stored in the ledger.
///
/// `tx_hash` is unique per transaction, not per record: a single transaction
/// may emit several Transfer logs, so `(tx_hash, log_index)` is the natural
/// identity. `gas_fees_eth` is transaction-level and repeats across records
/// sharing a transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferRecord {
    /// Unix time the containing block was mined.
    pub timestamp: i64,
    pub block_number: u64,
    pub log_index: u64,
    /// Lowercase 0x-prefixed hex.
    pub from_address: String,
    /// Lowercase 0x-prefixed hex.
    pub to_address: String,
    pub tx_hash: String,
    /// Token quantity, already scaled by the token's decimals.
    pub amount: f64,
    /// Whole-transaction gas cost in ETH.
    pub gas_fees_eth: f64,
}
