use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Block, BlockNumber, Transaction, TransactionReceipt};

/// The slice of the node RPC surface extraction needs. Errors from any of
/// these are block-scoped and recoverable; the extractor skips the block and
/// moves on.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn latest_block_number(&self) -> Result<u64>;

    /// Full block including its transactions, `None` if the node does not
    /// have it.
    async fn block_with_transactions(&self, number: u64) -> Result<Option<Block<Transaction>>>;

    /// Receipts for every transaction in the block, in transaction order.
    async fn block_receipts(&self, number: u64) -> Result<Vec<TransactionReceipt>>;
}

/// JSON-RPC over HTTP via ethers.
pub struct EthersChain {
    provider: Provider<Http>,
}

impl EthersChain {
    pub fn connect(rpc_url: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .with_context(|| format!("invalid RPC URL: {rpc_url}"))?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl ChainRpc for EthersChain {
    async fn latest_block_number(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?.as_u64())
    }

    async fn block_with_transactions(&self, number: u64) -> Result<Option<Block<Transaction>>> {
        Ok(self
            .provider
            .get_block_with_txs(BlockNumber::Number(number.into()))
            .await?)
    }

    async fn block_receipts(&self, number: u64) -> Result<Vec<TransactionReceipt>> {
        Ok(self
            .provider
            .get_block_receipts(BlockNumber::Number(number.into()))
            .await?)
    }
}
