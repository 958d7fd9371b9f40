use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

const API_URL: &str = "https://api.etherscan.io/v2/api";

#[derive(Deserialize, Debug)]
struct Envelope<T> {
    status: String,
    message: String,
    result: T,
}

#[derive(Deserialize, Debug)]
struct EthPriceResult {
    ethusd: String,
    ethusd_timestamp: String,
}

/// Etherscan stats API client. Consulted once per session for the token
/// supply and the latest ETH/USD price; failures here degrade the report
/// (the caller falls back to a supplied price), they never abort a run.
pub struct EtherscanClient {
    http: reqwest::Client,
    api_key: String,
}

impl EtherscanClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
        }
    }

    /// Total token supply in raw (undivided) units.
    pub async fn token_supply(&self, contract_address: &str) -> Result<u128> {
        let envelope: Envelope<String> = self
            .http
            .get(API_URL)
            .query(&[
                ("module", "stats"),
                ("action", "tokensupply"),
                ("contractaddress", contract_address),
                ("apikey", self.api_key.as_str()),
                ("chainid", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if envelope.status != "1" {
            return Err(anyhow!("etherscan tokensupply error: {}", envelope.message));
        }
        envelope
            .result
            .parse()
            .context("unparseable token supply")
    }

    /// Latest ETH/USD price and the unix time it was quoted at.
    pub async fn latest_eth_price(&self) -> Result<(f64, i64)> {
        let envelope: Envelope<EthPriceResult> = self
            .http
            .get(API_URL)
            .query(&[
                ("module", "stats"),
                ("action", "ethprice"),
                ("apikey", self.api_key.as_str()),
                ("chainid", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if envelope.status != "1" {
            return Err(anyhow!("etherscan ethprice error: {}", envelope.message));
        }
        let price = envelope.result.ethusd.parse().context("unparseable ETH price")?;
        let quoted_at = envelope
            .result
            .ethusd_timestamp
            .parse()
            .context("unparseable price timestamp")?;
        Ok((price, quoted_at))
    }
}
