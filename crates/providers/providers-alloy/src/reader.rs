//! Contains the [`AlloyChainReader`], a [`ChainReader`] backed by an alloy [`RootProvider`].

use crate::transport_error;
use alloy_eips::BlockId;
use alloy_primitives::{B256, TxHash};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types_eth::{Filter, Log};
use alloy_transport::TransportResult;
use async_trait::async_trait;
use ferry_messages::{BlockInfo, ChainReader, ChainReaderError, LogQuery, ReceiptInfo};
use lru::LruCache;
use std::{num::NonZeroUsize, sync::Arc};
use tokio::sync::Mutex;
use tracing::trace;

/// The [`AlloyChainReader`] reads logs, receipts and headers over JSON-RPC.
///
/// Headers fetched by hash are immutable and cached.
#[derive(Debug, Clone)]
pub struct AlloyChainReader {
    /// The inner RPC provider.
    pub inner: RootProvider,
    chain_id: u64,
    header_by_hash_cache: Arc<Mutex<LruCache<B256, BlockInfo>>>,
}

impl AlloyChainReader {
    /// Creates a new [`AlloyChainReader`] for `chain_id` over `inner`.
    pub fn new(inner: RootProvider, chain_id: u64, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        let header_by_hash_cache = Arc::new(Mutex::new(LruCache::new(capacity)));
        Self { inner, chain_id, header_by_hash_cache }
    }

    /// Creates a new [`AlloyChainReader`] from the provided [`url::Url`].
    pub fn new_http(url: url::Url, chain_id: u64, cache_size: usize) -> Self {
        Self::new(RootProvider::new_http(url), chain_id, cache_size)
    }

    /// Connects to `url` and binds the reader to the chain id the node reports.
    pub async fn connect(url: url::Url, cache_size: usize) -> Result<Self, ChainReaderError> {
        let inner = RootProvider::new_http(url);
        let chain_id = inner.get_chain_id().await.map_err(transport_error)?;
        Ok(Self::new(inner, chain_id, cache_size))
    }
}

/// Builds the `eth_getLogs` filter for `query`.
pub fn log_filter(query: &LogQuery) -> Filter {
    let mut filter = Filter::new()
        .event_signature(query.event_signature)
        .from_block(query.from_block)
        .to_block(query.to_block);
    if let Some(address) = query.address {
        filter = filter.address(address);
    }
    let [topic1, topic2, topic3] = query.topics;
    if let Some(topic) = topic1 {
        filter = filter.topic1(topic);
    }
    if let Some(topic) = topic2 {
        filter = filter.topic2(topic);
    }
    if let Some(topic) = topic3 {
        filter = filter.topic3(topic);
    }
    filter
}

/// Records the outcome of an RPC call and maps its error.
fn record<T>(method: &'static str, result: TransportResult<T>) -> Result<T, ChainReaderError> {
    #[cfg(feature = "metrics")]
    {
        metrics::counter!(crate::Metrics::RPC_CALLS, "method" => method).increment(1);
        if result.is_err() {
            metrics::counter!(crate::Metrics::RPC_ERRORS, "method" => method).increment(1);
        }
    }
    result.map_err(|err| {
        trace!(target: "providers::alloy", method, %err, "RPC call failed");
        transport_error(err)
    })
}

#[async_trait]
impl ChainReader for AlloyChainReader {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<Log>, ChainReaderError> {
        record("eth_getLogs", self.inner.get_logs(&log_filter(query)).await)
    }

    async fn get_transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<ReceiptInfo>, ChainReaderError> {
        let receipt =
            record("eth_getTransactionReceipt", self.inner.get_transaction_receipt(hash).await)?;
        Ok(receipt.map(Into::into))
    }

    async fn get_block(&self, id: BlockId) -> Result<Option<BlockInfo>, ChainReaderError> {
        if let BlockId::Hash(hash) = id &&
            let Some(header) = self.header_by_hash_cache.lock().await.get(&hash.block_hash)
        {
            return Ok(Some(header.clone()));
        }

        let method = match id {
            BlockId::Hash(_) => "eth_getBlockByHash",
            BlockId::Number(_) => "eth_getBlockByNumber",
        };
        let block = record(method, self.inner.get_block(id).await)?;
        let Some(block) = block else {
            return Ok(None);
        };
        let header: BlockInfo = block.header.into();
        self.header_by_hash_cache.lock().await.put(header.hash, header.clone());
        Ok(Some(header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use alloy_rpc_types_eth::FilterBlockOption;

    #[test]
    fn test_log_filter_carries_every_field() {
        let emitter = Address::repeat_byte(0x64);
        let query = LogQuery::new(Some(emitter), B256::repeat_byte(0xaa))
            .with_topic1(B256::repeat_byte(1))
            .with_topic3(B256::repeat_byte(3))
            .with_blocks(10, 20);

        let filter = log_filter(&query);
        assert!(filter.address.matches(&emitter));
        assert!(!filter.address.matches(&Address::ZERO));
        assert!(filter.topics[0].matches(&B256::repeat_byte(0xaa)));
        assert!(filter.topics[1].matches(&B256::repeat_byte(1)));
        assert!(!filter.topics[1].matches(&B256::repeat_byte(2)));
        assert!(filter.topics[2].is_empty());
        assert!(filter.topics[3].matches(&B256::repeat_byte(3)));
        let FilterBlockOption::Range { from_block, to_block } = filter.block_option else {
            panic!("expected a block range");
        };
        assert_eq!(from_block.and_then(|block| block.as_number()), Some(10));
        assert_eq!(to_block.and_then(|block| block.as_number()), Some(20));
    }

    #[test]
    fn test_log_filter_without_address_matches_any_emitter() {
        let filter = log_filter(&LogQuery::new(None, B256::repeat_byte(0xaa)));
        assert!(filter.address.is_empty());
        assert!(filter.topics[1].is_empty());
    }

    #[test]
    fn test_zero_cache_size_is_clamped() {
        let url = "http://localhost:8545".parse().unwrap();
        let reader = AlloyChainReader::new_http(url, 1, 0);
        assert_eq!(reader.chain_id(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_node_is_a_retryable_transport_error() {
        let url = "http://127.0.0.1:1".parse().unwrap();
        let reader = AlloyChainReader::new_http(url, 1, 16);
        let err = reader.get_block(BlockId::latest()).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
