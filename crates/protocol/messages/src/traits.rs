//! Chain access traits for the `ferry-messages` crate.

use crate::{BlockInfo, ChainReaderError, LogQuery, ReceiptInfo, TransactionCall};
use alloy_eips::BlockId;
use alloy_primitives::TxHash;
use alloy_rpc_types_eth::Log;
use async_trait::async_trait;
use core::fmt::Debug;

/// Read access to a single chain.
///
/// Implementations are shared between trackers and must be safe for concurrent use.
#[async_trait]
pub trait ChainReader: Debug + Send + Sync {
    /// Returns the chain id this reader is bound to.
    fn chain_id(&self) -> u64;

    /// Fetches every log matching `query`, in `(block number, log index)` order.
    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<Log>, ChainReaderError>;

    /// Fetches the receipt of a mined transaction. Returns `None` if the transaction is unknown
    /// or not yet mined.
    async fn get_transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<ReceiptInfo>, ChainReaderError>;

    /// Fetches a block header by number, hash or tag. Returns `None` if the block is unknown.
    async fn get_block(&self, id: BlockId) -> Result<Option<BlockInfo>, ChainReaderError>;
}

/// Submits transactions to a single chain on behalf of a signer.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait TransactionSender: Send + Sync {
    /// Returns the chain id this sender submits to.
    fn chain_id(&self) -> u64;

    /// Submits `call` and waits for its receipt.
    ///
    /// A call rejected during gas estimation surfaces as [`ChainReaderError::Reverted`] with the
    /// revert data. A mined transaction is returned even if it failed.
    async fn send_transaction(
        &self,
        call: TransactionCall,
    ) -> Result<ReceiptInfo, ChainReaderError>;
}
