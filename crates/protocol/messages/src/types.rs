//! Chain data types consumed and produced by the message trackers.

use crate::DecodeError;
use alloy_eips::BlockNumberOrTag;
use alloy_network_primitives::ReceiptResponse;
use alloy_primitives::{Address, B256, BlockHash, BlockNumber, Bytes, TxHash, U256};
use alloy_rpc_types_eth::{Header, Log, TransactionReceipt};
use derive_more::Display;

/// The subset of a block header the trackers need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BlockInfo {
    /// The block hash.
    pub hash: BlockHash,
    /// The block number.
    pub number: BlockNumber,
    /// The block timestamp, in seconds.
    pub timestamp: u64,
    /// The header `mixHash`. On the child chain its first eight bytes hold the send count.
    pub mix_hash: B256,
    /// The header `extraData`. On the child chain it holds the send root.
    pub extra_data: Bytes,
}

impl BlockInfo {
    /// Returns the number of L2 to L1 sends committed up to and including this child chain block.
    pub fn send_count(&self) -> u64 {
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.mix_hash[..8]);
        u64::from_be_bytes(word)
    }
}

impl From<Header> for BlockInfo {
    fn from(header: Header) -> Self {
        Self {
            hash: header.hash,
            number: header.inner.number,
            timestamp: header.inner.timestamp,
            mix_hash: header.inner.mix_hash,
            extra_data: header.inner.extra_data,
        }
    }
}

/// A mined transaction receipt with its logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiptInfo {
    /// The transaction hash.
    pub transaction_hash: TxHash,
    /// The hash of the including block.
    pub block_hash: BlockHash,
    /// The number of the including block.
    pub block_number: BlockNumber,
    /// The sender of the transaction.
    pub from: Address,
    /// The recipient, `None` for contract creations.
    pub to: Option<Address>,
    /// `true` if the transaction succeeded.
    pub status: bool,
    /// The logs emitted by the transaction, in log index order.
    pub logs: Vec<Log>,
}

impl From<TransactionReceipt> for ReceiptInfo {
    fn from(receipt: TransactionReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash(),
            block_hash: receipt.block_hash().unwrap_or_default(),
            block_number: receipt.block_number().unwrap_or_default(),
            from: receipt.from(),
            to: receipt.to(),
            status: receipt.status(),
            logs: receipt.inner.logs().to_vec(),
        }
    }
}

/// A single `eth_getLogs` query.
///
/// Topic filters apply to the indexed topics after the event signature. `None` matches any value.
/// Both block bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    /// The emitting contract, `None` for any.
    pub address: Option<Address>,
    /// The event signature hash (`topic0`).
    pub event_signature: B256,
    /// Filters for `topic1..=topic3`.
    pub topics: [Option<B256>; 3],
    /// First block of the query.
    pub from_block: BlockNumber,
    /// Last block of the query.
    pub to_block: BlockNumber,
}

impl LogQuery {
    /// Creates a query for `event_signature` with no topic filters over block zero.
    pub const fn new(address: Option<Address>, event_signature: B256) -> Self {
        Self { address, event_signature, topics: [None; 3], from_block: 0, to_block: 0 }
    }

    /// Sets the filter for `topic1`.
    pub const fn with_topic1(mut self, topic: B256) -> Self {
        self.topics[0] = Some(topic);
        self
    }

    /// Sets the filter for `topic2`.
    pub const fn with_topic2(mut self, topic: B256) -> Self {
        self.topics[1] = Some(topic);
        self
    }

    /// Sets the filter for `topic3`.
    pub const fn with_topic3(mut self, topic: B256) -> Self {
        self.topics[2] = Some(topic);
        self
    }

    /// Returns a copy of the query restricted to `from_block..=to_block`.
    pub const fn with_blocks(mut self, from_block: BlockNumber, to_block: BlockNumber) -> Self {
        self.from_block = from_block;
        self.to_block = to_block;
        self
    }

    /// Returns `true` if `log` satisfies every filter of the query, block bounds included.
    pub fn matches(&self, log: &Log) -> bool {
        if self.address.is_some_and(|address| address != log.address()) {
            return false;
        }
        let topics = log.topics();
        if topics.first() != Some(&self.event_signature) {
            return false;
        }
        let topics_match = self.topics.iter().enumerate().all(|(i, filter)| match filter {
            Some(expected) => topics.get(i + 1) == Some(expected),
            None => true,
        });
        let in_range = log
            .block_number
            .is_some_and(|number| (self.from_block..=self.to_block).contains(&number));
        topics_match && in_range
    }
}

/// A block range for a log scan. `to_block` may be a tag resolved when the scan starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BlockRange {
    /// First block of the range.
    pub from_block: BlockNumber,
    /// Last block of the range.
    pub to_block: BlockNumberOrTag,
}

impl BlockRange {
    /// A range from `from_block` to the latest block.
    pub const fn starting_at(from_block: BlockNumber) -> Self {
        Self { from_block, to_block: BlockNumberOrTag::Latest }
    }

    /// A closed range `from_block..=to_block`.
    pub const fn between(from_block: BlockNumber, to_block: BlockNumber) -> Self {
        Self { from_block, to_block: BlockNumberOrTag::Number(to_block) }
    }
}

/// Optional sender and destination filters for a message scan. `None` matches any address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageFilter {
    /// The account that sent the message.
    pub sender: Option<Address>,
    /// The account the message is addressed to.
    pub destination: Option<Address>,
}

impl MessageFilter {
    /// A filter that only matches messages from `sender`.
    pub const fn sender(sender: Address) -> Self {
        Self { sender: Some(sender), destination: None }
    }

    /// A filter that only matches messages to `destination`.
    pub const fn destination(destination: Address) -> Self {
        Self { sender: None, destination: Some(destination) }
    }
}

/// A call to submit as a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionCall {
    /// The callee.
    pub to: Address,
    /// The ABI encoded call data.
    pub data: Bytes,
    /// The value to attach.
    pub value: U256,
}

/// Identifies a single cross-layer message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("{source_chain_id}->{destination_chain_id}#{sequence_number} ({origin_tx_hash})")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MessageIdentity {
    /// The chain the message was sent from.
    pub source_chain_id: u64,
    /// The chain the message is delivered to.
    pub destination_chain_id: u64,
    /// The bridge message index for L1 to L2 messages, the send position for L2 to L1 messages.
    pub sequence_number: u64,
    /// The transaction that sent the message.
    pub origin_tx_hash: TxHash,
}

/// Addresses and chain ids of a child chain and its bridge contracts on the parent chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ChildNetwork {
    /// The child (L2) chain id.
    pub chain_id: u64,
    /// The parent (L1) chain id.
    pub parent_chain_id: u64,
    /// The `Bridge` contract on the parent chain.
    pub bridge: Address,
    /// The `Inbox` contract on the parent chain.
    pub inbox: Address,
    /// The `Outbox` contract on the parent chain.
    pub outbox: Address,
}

/// Returns the block number, log index and transaction hash of a mined log.
pub fn log_position(log: &Log) -> Result<(BlockNumber, u64, TxHash), DecodeError> {
    match (log.block_number, log.log_index, log.transaction_hash) {
        (Some(number), Some(index), Some(tx_hash)) => Ok((number, index, tx_hash)),
        _ => Err(DecodeError::MissingLogMetadata),
    }
}

/// Narrows a 256 bit value to a `u64`.
pub fn to_u64(value: U256) -> Result<u64, DecodeError> {
    u64::try_from(value).map_err(|_| DecodeError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::LogData;

    fn log_at(block: u64, topics: Vec<B256>) -> Log {
        Log {
            inner: alloy_primitives::Log {
                address: Address::repeat_byte(1),
                data: LogData::new_unchecked(topics, Bytes::new()),
            },
            block_number: Some(block),
            ..Default::default()
        }
    }

    #[test]
    fn test_log_query_matches_filters() {
        let sig = B256::repeat_byte(0xaa);
        let t1 = B256::repeat_byte(0x01);
        let query =
            LogQuery::new(Some(Address::repeat_byte(1)), sig).with_topic1(t1).with_blocks(5, 9);

        assert!(query.matches(&log_at(5, vec![sig, t1])));
        assert!(query.matches(&log_at(9, vec![sig, t1, B256::ZERO])));
        assert!(!query.matches(&log_at(10, vec![sig, t1])));
        assert!(!query.matches(&log_at(7, vec![sig, B256::ZERO])));
        assert!(!query.matches(&log_at(7, vec![B256::ZERO, t1])));
        assert!(!query.with_topic2(t1).matches(&log_at(7, vec![sig, t1])));
    }

    #[test]
    fn test_block_info_send_count() {
        let mut mix_hash = B256::ZERO;
        mix_hash[..8].copy_from_slice(&42u64.to_be_bytes());
        mix_hash[8..16].copy_from_slice(&7u64.to_be_bytes());
        let block = BlockInfo { mix_hash, ..Default::default() };

        assert_eq!(block.send_count(), 42);
        assert_eq!(BlockInfo::default().send_count(), 0);
    }

    #[test]
    fn test_log_position_requires_metadata() {
        let log = log_at(3, vec![]);
        assert_eq!(log_position(&log), Err(DecodeError::MissingLogMetadata));
    }

    #[test]
    fn test_to_u64_overflow() {
        assert_eq!(to_u64(U256::from(7)), Ok(7));
        assert_eq!(to_u64(U256::MAX), Err(DecodeError::Overflow));
    }
}
