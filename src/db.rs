use anyhow::Result;
use chrono::DateTime;
use rusqlite::{params, Connection};

use crate::models::TransferRecord;

/// Open or create the ledger database at `path`.
pub fn open_db(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(include_str!("../sql/schema.sql"))?;
    Ok(conn)
}

/// Append records to the ledger. Duplicates from re-extracting an
/// overlapping block range are dropped by the `(tx_hash, log_index)` unique
/// constraint; returns the number of rows actually inserted.
pub fn insert_transfers(conn: &mut Connection, records: &[TransferRecord]) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut inserted = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO transfers
                (tx_hash, log_index, block_number, timestamp, from_address, to_address, amount, gas_fees_eth)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for rec in records {
            inserted += stmt.execute(params![
                rec.tx_hash,
                rec.log_index as i64,
                rec.block_number as i64,
                rec.timestamp,
                rec.from_address,
                rec.to_address,
                rec.amount,
                rec.gas_fees_eth,
            ])?;
        }
    }
    tx.commit()?;
    Ok(inserted)
}

/// Full ledger, ordered by block then log index. The metrics engine reads
/// from here, never from the chain.
pub fn load_transfers(conn: &Connection) -> Result<Vec<TransferRecord>> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, block_number, log_index, from_address, to_address, tx_hash, amount, gas_fees_eth
        FROM transfers
        ORDER BY block_number, log_index",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(TransferRecord {
            timestamp: r.get(0)?,
            block_number: r.get::<_, i64>(1)? as u64,
            log_index: r.get::<_, i64>(2)? as u64,
            from_address: r.get(3)?,
            to_address: r.get(4)?,
            tx_hash: r.get(5)?,
            amount: r.get(6)?,
            gas_fees_eth: r.get(7)?,
        })
    })?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

/// Write the ledger to a CSV file in the published column layout.
pub fn export_csv(records: &[TransferRecord], path: &str) -> Result<()> {
    let mut w = csv::WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record([
        "timestamp",
        "block_number",
        "from_address",
        "to_address",
        "tx_hash",
        "amount",
        "gas_fees_eth",
    ])?;
    for rec in records {
        let ts = DateTime::from_timestamp(rec.timestamp, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        w.write_record([
            ts.as_str(),
            &rec.block_number.to_string(),
            rec.from_address.as_str(),
            rec.to_address.as_str(),
            rec.tx_hash.as_str(),
            &rec.amount.to_string(),
            &rec.gas_fees_eth.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
