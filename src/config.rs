use std::collections::HashMap;

/// PYUSD on Ethereum mainnet.
pub const PYUSD_CONTRACT: &str = "0x6c3ea9036406852006290770bedfcaba0e23a0e8";

/// PYUSD uses 6 decimals, unlike the 18 most ERC-20s carry.
pub const PYUSD_DECIMALS: u32 = 6;

/// Token parameters the decoder and metrics engine operate against.
/// Passed in explicitly so alternate tokens/chains are a config change,
/// not a code change.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Target contract, lowercase 0x-prefixed hex.
    pub contract_address: String,
    pub decimals: u32,
}

impl TokenConfig {
    pub fn new(contract_address: &str, decimals: u32) -> Self {
        Self {
            contract_address: contract_address.to_lowercase(),
            decimals,
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self::new(PYUSD_CONTRACT, PYUSD_DECIMALS)
    }
}

/// Known DEX router addresses, each mapped to a venue name. A transfer whose
/// destination is in this table is classified as a swap. Inferred from the
/// address only, not verified on-chain.
#[derive(Debug, Clone)]
pub struct DexRegistry {
    routers: HashMap<String, String>,
}

impl DexRegistry {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        let routers = entries
            .iter()
            .map(|(addr, venue)| (addr.to_lowercase(), venue.to_string()))
            .collect();
        Self { routers }
    }

    /// Venue name for a destination address, if it is a known router.
    pub fn venue(&self, to_address: &str) -> Option<&str> {
        self.routers.get(&to_address.to_lowercase()).map(String::as_str)
    }

    /// Distinct venue names, sorted for stable output.
    pub fn venues(&self) -> Vec<String> {
        let mut names: Vec<String> = self.routers.values().cloned().collect();
        names.sort();
        names.dedup();
        names
    }
}

impl Default for DexRegistry {
    fn default() -> Self {
        // Two uniswapv3 routers alias to the same venue name.
        Self::new(&[
            ("0x4a4d2410c3d4cfa8dd0d275bedefbd2f7b61ba2e", "uniswapv2"),
            ("0x13394005c1012e708fce1eb974f1130fdc73a5ce", "uniswapv3"),
            ("0xf313d711d71eb9a607b4a61a827a9e32a7846621", "uniswapv3"),
        ])
    }
}
