//! Bounded exponential retry around chain reads.

use crate::{
    BlockInfo, ChainReader, ChainReaderError, LogQuery, MessageError, ReceiptInfo, RetryConfig,
};
use alloy_eips::BlockId;
use alloy_primitives::TxHash;
use alloy_rpc_types_eth::Log;
use backon::{ExponentialBuilder, Retryable};
use core::future::Future;
use tracing::warn;

impl RetryConfig {
    /// Builds the backoff policy described by this configuration.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay())
            .with_max_delay(self.max_delay())
            .with_max_times(self.max_retries)
    }
}

/// Runs `read`, retrying transient [`ChainReaderError`]s with the backoff of `config`.
///
/// Non-retryable errors and the last transient error are returned as is.
pub async fn retry_read<T, F, Fut>(
    config: &RetryConfig,
    operation: &'static str,
    read: F,
) -> Result<T, ChainReaderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ChainReaderError>>,
{
    read.retry(config.backoff())
        .when(ChainReaderError::is_retryable)
        .notify(|err, delay| {
            warn!(target: "messages::retry", operation, %err, ?delay, "Retrying chain read");
            #[cfg(feature = "metrics")]
            metrics::counter!(crate::Metrics::CHAIN_READ_RETRIES, "operation" => operation)
                .increment(1);
        })
        .await
}

/// A [`ChainReader`] view that retries every read.
#[derive(Debug)]
pub struct RetryingReader<'a, R: ?Sized> {
    reader: &'a R,
    config: RetryConfig,
}

impl<'a, R: ChainReader + ?Sized> RetryingReader<'a, R> {
    /// Wraps `reader` with the retry policy of `config`.
    pub const fn new(reader: &'a R, config: RetryConfig) -> Self {
        Self { reader, config }
    }

    /// Returns the chain id of the underlying reader.
    pub fn chain_id(&self) -> u64 {
        self.reader.chain_id()
    }

    /// Fetches the logs matching `query`.
    pub async fn logs(&self, query: &LogQuery) -> Result<Vec<Log>, ChainReaderError> {
        retry_read(&self.config, "get_logs", || self.reader.get_logs(query)).await
    }

    /// Fetches a transaction receipt.
    pub async fn receipt(&self, hash: TxHash) -> Result<Option<ReceiptInfo>, MessageError> {
        Ok(retry_read(&self.config, "get_transaction_receipt", || {
            self.reader.get_transaction_receipt(hash)
        })
        .await?)
    }

    /// Fetches a block, if it exists.
    pub async fn maybe_block(&self, id: BlockId) -> Result<Option<BlockInfo>, MessageError> {
        Ok(retry_read(&self.config, "get_block", || self.reader.get_block(id)).await?)
    }

    /// Fetches a block that must exist.
    pub async fn block(&self, id: BlockId) -> Result<BlockInfo, MessageError> {
        self.maybe_block(id).await?.ok_or(MessageError::BlockNotFound(id))
    }
}
