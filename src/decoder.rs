use ethers::types::{Address, Log, H256, U256};
use ethers::utils::keccak256;

use crate::config::TokenConfig;

/// ERC20 Transfer event signature: `Transfer(address,address,uint256)`.
pub fn transfer_topic() -> H256 {
    H256::from(keccak256(b"Transfer(address,address,uint256)"))
}

/// The pieces of a `TransferRecord` a single log contributes. Block and
/// transaction context (timestamp, gas) are filled in by the extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTransfer {
    pub from_address: String,
    pub to_address: String,
    /// Token quantity, scaled by the token's decimals.
    pub amount: f64,
}

/// Decodes Transfer logs for one target contract.
#[derive(Debug, Clone)]
pub struct LogDecoder {
    contract_address: String,
    topic: H256,
    decimals: u32,
}

impl LogDecoder {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            contract_address: config.contract_address.clone(),
            topic: transfer_topic(),
            decimals: config.decimals,
        }
    }

    /// Returns `Some` iff the log is a Transfer event emitted by the target
    /// contract. Malformed logs (missing topics, oversized data) yield
    /// `None`; non-matching logs are the expected common case, not an error.
    pub fn decode(&self, log: &Log) -> Option<DecodedTransfer> {
        if format!("{:#x}", log.address) != self.contract_address {
            return None;
        }
        if log.topics.first() != Some(&self.topic) {
            return None;
        }
        if log.topics.len() < 3 {
            return None;
        }
        // The value is a single 32-byte uint256.
        if log.data.len() > 32 {
            return None;
        }

        // Indexed address params are right-aligned in 32-byte topics.
        let from = topic_address(&log.topics[1]);
        let to = topic_address(&log.topics[2]);

        let raw = U256::from_big_endian(log.data.as_ref());
        let amount = u256_to_f64(raw) / 10f64.powi(self.decimals as i32);

        Some(DecodedTransfer {
            from_address: from,
            to_address: to,
            amount,
        })
    }
}

/// Lower 20 bytes of a 32-byte topic, as lowercase 0x hex.
fn topic_address(topic: &H256) -> String {
    let addr = Address::from_slice(&topic.as_bytes()[12..]);
    format!("{:#x}", addr)
}

/// Lossy conversion; values beyond f64 precision lose low-order digits but
/// never panic, unlike `U256::as_u128` on wide values.
pub(crate) fn u256_to_f64(value: U256) -> f64 {
    value.to_string().parse::<f64>().unwrap_or(f64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Bytes;

    fn decoder() -> LogDecoder {
        LogDecoder::new(&TokenConfig::default())
    }

    fn address_topic(addr: &str) -> H256 {
        let addr: Address = addr.parse().unwrap();
        let mut bytes = [0u8; 32];
        bytes[12..].copy_from_slice(addr.as_bytes());
        H256::from(bytes)
    }

    /// A well-formed Transfer log for the configured contract.
    fn transfer_log(from: &str, to: &str, raw_amount: u128) -> Log {
        let mut data = [0u8; 32];
        U256::from(raw_amount).to_big_endian(&mut data);
        Log {
            address: crate::config::PYUSD_CONTRACT.parse().unwrap(),
            topics: vec![transfer_topic(), address_topic(from), address_topic(to)],
            data: Bytes::from(data.to_vec()),
            ..Default::default()
        }
    }

    #[test]
    fn round_trips_a_synthetic_transfer() {
        let from = "0x1111111111111111111111111111111111111111";
        let to = "0x2222222222222222222222222222222222222222";
        let decoded = decoder().decode(&transfer_log(from, to, 123_456_789)).unwrap();
        assert_eq!(decoded.from_address, from);
        assert_eq!(decoded.to_address, to);
        // 6 decimals: raw / 10^6
        assert!((decoded.amount - 123.456_789).abs() < 1e-9);
    }

    #[test]
    fn rejects_logs_from_other_contracts() {
        let mut log = transfer_log(
            "0x1111111111111111111111111111111111111111",
            "0x2222222222222222222222222222222222222222",
            1_000_000,
        );
        log.address = "0x000000000000000000000000000000000000dead"
            .parse()
            .unwrap();
        assert_eq!(decoder().decode(&log), None);
    }

    #[test]
    fn rejects_non_transfer_topics() {
        let mut log = transfer_log(
            "0x1111111111111111111111111111111111111111",
            "0x2222222222222222222222222222222222222222",
            1_000_000,
        );
        log.topics[0] = H256::from(keccak256(b"Approval(address,address,uint256)"));
        assert_eq!(decoder().decode(&log), None);
    }

    #[test]
    fn matches_contract_address_case_insensitively() {
        let upper = crate::config::PYUSD_CONTRACT.to_uppercase().replace("0X", "0x");
        let decoder = LogDecoder::new(&TokenConfig::new(&upper, 6));
        let log = transfer_log(
            "0x1111111111111111111111111111111111111111",
            "0x2222222222222222222222222222222222222222",
            5_000_000,
        );
        let decoded = decoder.decode(&log).unwrap();
        assert!((decoded.amount - 5.0).abs() < 1e-12);
    }

    #[test]
    fn malformed_logs_yield_none_without_panicking() {
        // Missing indexed params.
        let mut log = transfer_log(
            "0x1111111111111111111111111111111111111111",
            "0x2222222222222222222222222222222222222222",
            1,
        );
        log.topics.truncate(1);
        assert_eq!(decoder().decode(&log), None);

        // Oversized data payload.
        let mut log = transfer_log(
            "0x1111111111111111111111111111111111111111",
            "0x2222222222222222222222222222222222222222",
            1,
        );
        log.data = Bytes::from(vec![0u8; 64]);
        assert_eq!(decoder().decode(&log), None);
    }

    /// False-positive sweep over a pile of deliberately non-matching logs.
    #[test]
    fn never_matches_unrelated_logs() {
        let decoder = decoder();
        for i in 0..100u64 {
            let mut bytes = [0u8; 20];
            bytes[12..].copy_from_slice(&i.to_be_bytes());
            let log = Log {
                address: Address::from(bytes),
                topics: vec![H256::from(keccak256(i.to_be_bytes()))],
                data: Bytes::from(i.to_be_bytes().to_vec()),
                ..Default::default()
            };
            assert_eq!(decoder.decode(&log), None);
        }
    }
}
