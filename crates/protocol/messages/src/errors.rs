//! Error types for the `ferry-messages` crate.

use crate::{L1ToL2Status, L2ToL1Status};
use alloy_eips::BlockId;
use alloy_primitives::{B256, Bytes, TxHash};
use thiserror::Error;

/// JSON-RPC error code for "limit exceeded" responses.
const RPC_LIMIT_EXCEEDED: i64 = -32005;
/// JSON-RPC error code for internal node errors.
const RPC_INTERNAL_ERROR: i64 = -32603;
/// HTTP style "too many requests" code that some providers return in the JSON-RPC envelope.
const RPC_TOO_MANY_REQUESTS: i64 = 429;

/// An error returned by a [`ChainReader`](crate::ChainReader) or a
/// [`TransactionSender`](crate::TransactionSender).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainReaderError {
    /// The request never produced a JSON-RPC response.
    #[error("Transport error: {0}")]
    Transport(String),
    /// The node answered with a JSON-RPC error.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// The JSON-RPC error code.
        code: i64,
        /// The error message.
        message: String,
    },
    /// The call or transaction reverted with the given revert data.
    #[error("Execution reverted: {0}")]
    Reverted(Bytes),
}

impl ChainReaderError {
    /// Returns `true` if repeating the request may succeed.
    ///
    /// Transport failures and rate limiting are transient. Everything else, including reverts,
    /// is deterministic for a given chain state.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Rpc { code, .. } => matches!(
                *code,
                RPC_TOO_MANY_REQUESTS | RPC_LIMIT_EXCEEDED | RPC_INTERNAL_ERROR
            ),
            Self::Reverted(_) => false,
        }
    }

    /// Returns the revert data if this is a revert.
    pub const fn revert_data(&self) -> Option<&Bytes> {
        match self {
            Self::Reverted(data) => Some(data),
            _ => None,
        }
    }
}

/// An error raised while decoding bridge logs or their payloads.
///
/// Decode failures mean the data on chain does not have the shape this crate expects. They are
/// never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A log was presented as an event it is not.
    #[error("Log is not a {expected} event")]
    UnexpectedEvent {
        /// The expected event signature.
        expected: &'static str,
    },
    /// A log matched an event signature but its payload failed to decode.
    #[error("Failed to decode {event}: {reason}")]
    Event {
        /// The event signature.
        event: &'static str,
        /// The decoder's message.
        reason: String,
    },
    /// The retryable submission payload has the wrong length.
    #[error("Retryable payload length mismatch. Expected {expected} bytes, got {actual}")]
    RetryableData {
        /// The expected payload length.
        expected: usize,
        /// The actual payload length.
        actual: usize,
    },
    /// An address word carries non-zero upper bytes.
    #[error("Address word {0} has non-zero upper bytes")]
    DirtyAddressWord(B256),
    /// The inbox payload for a bridge message is missing from the receipt.
    #[error("No inbox data for message {message_index}")]
    MissingInboxData {
        /// The bridge message index.
        message_index: u64,
    },
    /// A log carries no block number, log index or transaction hash.
    #[error("Log is missing block metadata")]
    MissingLogMetadata,
    /// A 256 bit value does not fit the target integer.
    #[error("Value does not fit in 64 bits")]
    Overflow,
}

/// An error returned by the message trackers, the factory and the scanner.
#[derive(Debug, Error)]
pub enum MessageError {
    /// A scanner sub-range query failed after exhausting its retries.
    #[error("Log query for blocks {from_block}..={to_block} failed: {source}")]
    RangeQuery {
        /// First block of the failed sub-range.
        from_block: u64,
        /// Last block of the failed sub-range.
        to_block: u64,
        /// The underlying error.
        #[source]
        source: ChainReaderError,
    },
    /// A single chain read failed after exhausting its retries.
    #[error("Chain read failed: {0}")]
    ChainRead(#[from] ChainReaderError),
    /// A log or payload failed to decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// A block required to determine status does not exist.
    #[error("Block {0} not found")]
    BlockNotFound(BlockId),
    /// The withdrawal proof was requested before the message was confirmed.
    #[error("Withdrawal proof is not available while the message is {status}")]
    ProofNotAvailable {
        /// The status at the time of the request.
        status: L2ToL1Status,
    },
    /// The send root the proof was built for is unknown to the outbox.
    #[error("Send root {root} is stale; refetch the proof")]
    ProofStale {
        /// The send root of the discarded proof.
        root: B256,
    },
    /// The withdrawal has already been executed on L1.
    #[error("Withdrawal {position} has already been executed")]
    AlreadyExecuted {
        /// The position of the withdrawal in the send tree.
        position: u64,
    },
    /// The redeem or execute transaction was mined but failed.
    #[error("Transaction {tx_hash} reverted")]
    ExecutionReverted {
        /// The hash of the failed transaction.
        tx_hash: TxHash,
    },
    /// The rebuilt send tree does not hash to the posted root.
    #[error("Send root mismatch. Expected {expected}, computed {computed}")]
    RootMismatch {
        /// The root posted on L1.
        expected: B256,
        /// The root rebuilt from L2 logs.
        computed: B256,
    },
    /// Some sends below the confirmed send count were not found on L2.
    #[error("Incomplete send history. Expected {expected} sends, found {found}")]
    IncompleteSendHistory {
        /// The send count of the confirming root.
        expected: u64,
        /// The number of sends found.
        found: u64,
    },
    /// A redemption was attempted on an expired ticket.
    #[error("Retryable ticket {ticket_id} has expired")]
    TicketExpired {
        /// The ticket id.
        ticket_id: B256,
    },
    /// A redemption was attempted on a ticket that was already redeemed.
    #[error("Retryable ticket {ticket_id} has already been redeemed")]
    AlreadyRedeemed {
        /// The ticket id.
        ticket_id: B256,
    },
    /// A redemption was attempted on a ticket that does not exist on L2.
    #[error("Retryable ticket cannot be redeemed while {status}")]
    NotRedeemable {
        /// The status at the time of the request.
        status: L1ToL2Status,
    },
    /// A transaction sender is bound to the wrong chain.
    #[error("Sender is bound to chain {actual}, expected {expected}")]
    WrongChain {
        /// The chain the action must be submitted to.
        expected: u64,
        /// The chain of the sender.
        actual: u64,
    },
}

/// A [`Result`] alias with [`MessageError`] as the error type.
pub type MessageResult<T> = Result<T, MessageError>;
