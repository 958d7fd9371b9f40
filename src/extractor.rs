use anyhow::{bail, Context, Result};
use log::{info, warn};

use crate::chain::ChainRpc;
use crate::decoder::{u256_to_f64, LogDecoder};
use crate::models::TransferRecord;

/// Walks a block range most-recent-first and collects decoded Transfer
/// records. Partial results stay useful if the caller stops reading early.
///
/// The requested range is clamped so it never runs past the chain head:
/// `end = start_block + num_blocks`, with `num_blocks` reduced to the blocks
/// actually available. Any failure while processing a single block is logged
/// and that block is skipped, so the result is best-effort and may contain
/// gaps.
pub async fn extract_range(
    chain: &dyn ChainRpc,
    decoder: &LogDecoder,
    start_block: u64,
    num_blocks: u64,
) -> Result<Vec<TransferRecord>> {
    let latest = chain
        .latest_block_number()
        .await
        .context("failed to fetch chain head")?;

    if start_block > latest {
        bail!("start block {start_block} is beyond the chain head {latest}");
    }

    let available = latest.saturating_sub(start_block);
    let num_blocks = num_blocks.min(available);
    let end_block = start_block + num_blocks;

    info!(
        "processing blocks {start_block}..={end_block} (head {latest}, {} blocks)",
        end_block - start_block + 1
    );

    let mut records = Vec::new();
    for block_number in (start_block..=end_block).rev() {
        match process_block(chain, decoder, block_number).await {
            Ok(mut block_records) => records.append(&mut block_records),
            Err(err) => {
                warn!("error processing block {block_number}, skipping: {err:#}");
                continue;
            }
        }
    }

    info!("extracted {} transfer records", records.len());
    Ok(records)
}

/// One block: fetch the block with its transactions plus the receipt list,
/// correlate them positionally, and decode every receipt log.
async fn process_block(
    chain: &dyn ChainRpc,
    decoder: &LogDecoder,
    block_number: u64,
) -> Result<Vec<TransferRecord>> {
    let block = chain
        .block_with_transactions(block_number)
        .await?
        .with_context(|| format!("block {block_number} not found"))?;
    let receipts = chain.block_receipts(block_number).await?;

    let timestamp = block.timestamp.as_u64() as i64;

    let mut records = Vec::new();
    for (tx, receipt) in block.transactions.iter().zip(receipts.iter()) {
        for log in &receipt.logs {
            let Some(decoded) = decoder.decode(log) else {
                continue;
            };

            // Post-fee-market receipts carry the effective gas price; legacy
            // transactions only have the nominal one.
            let gas_used = receipt.gas_used.unwrap_or_default();
            let gas_price = receipt.effective_gas_price.or(tx.gas_price).unwrap_or_default();
            let gas_fees_eth = u256_to_f64(gas_used * gas_price) / 1e18;

            records.push(TransferRecord {
                timestamp,
                block_number,
                log_index: log.log_index.map(|i| i.as_u64()).unwrap_or(0),
                from_address: decoded.from_address,
                to_address: decoded.to_address,
                tx_hash: format!("{:#x}", tx.hash),
                amount: decoded.amount,
                gas_fees_eth,
            });
        }
    }
    Ok(records)
}
