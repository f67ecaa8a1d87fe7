//! Bridge event, call and error bindings.
//!
//! The L1 side is made of the `Bridge`, `Inbox` and `Outbox` contracts. The L2 side is made of
//! the `ArbSys` and `ArbRetryableTx` precompiles.

use crate::{DecodeError, LogQuery};
use alloy_primitives::{Address, B256};
use alloy_rpc_types_eth::Log;
use alloy_sol_types::{SolEvent, sol};

sol! {
    /// @notice Emitted by the L1 bridge for every message appended to the delayed inbox.
    #[derive(Debug, PartialEq, Eq)]
    event MessageDelivered(
        uint256 indexed messageIndex,
        bytes32 indexed beforeInboxAcc,
        address inbox,
        uint8 kind,
        address sender,
        bytes32 messageDataHash,
        uint256 baseFeeL1,
        uint64 timestamp
    );

    /// @notice Emitted by the L1 inbox alongside [MessageDelivered] with the message payload.
    #[derive(Debug, PartialEq, Eq)]
    event InboxMessageDelivered(uint256 indexed messageNum, bytes data);

    /// @notice Emitted by `ArbSys` when an L2 to L1 message is sent.
    #[derive(Debug, PartialEq, Eq)]
    event L2ToL1Tx(
        address caller,
        address indexed destination,
        uint256 indexed hash,
        uint256 indexed position,
        uint256 arbBlockNum,
        uint256 ethBlockNum,
        uint256 timestamp,
        uint256 callvalue,
        bytes data
    );

    /// @notice Emitted by `ArbRetryableTx` when a ticket is created.
    #[derive(Debug, PartialEq, Eq)]
    event TicketCreated(bytes32 indexed ticketId);

    /// @notice Emitted by `ArbRetryableTx` for every scheduled redemption attempt, automatic or
    /// manual.
    #[derive(Debug, PartialEq, Eq)]
    event RedeemScheduled(
        bytes32 indexed ticketId,
        bytes32 indexed retryTxHash,
        uint64 indexed sequenceNum,
        uint64 donatedGas,
        address gasDonor,
        uint256 maxRefund,
        uint256 submissionFeeRefund
    );

    /// @notice Emitted by `ArbRetryableTx` when a ticket's lifetime is extended.
    #[derive(Debug, PartialEq, Eq)]
    event LifetimeExtended(bytes32 indexed ticketId, uint256 newTimeout);

    /// @notice Emitted by the L1 outbox when a new send root is accepted.
    #[derive(Debug, PartialEq, Eq)]
    event SendRootUpdated(bytes32 indexed outputRoot, bytes32 indexed l2BlockHash);

    /// @notice Emitted by the L1 outbox when an L2 to L1 message is executed.
    #[derive(Debug, PartialEq, Eq)]
    event OutBoxTransactionExecuted(
        address indexed to,
        address indexed l2Sender,
        uint256 indexed zero,
        uint256 transactionIndex
    );

    /// @notice Executes a confirmed L2 to L1 message on L1.
    function executeTransaction(
        bytes32[] calldata proof,
        uint256 index,
        address l2Sender,
        address to,
        uint256 l2Block,
        uint256 l1Block,
        uint256 l2Timestamp,
        uint256 value,
        bytes calldata data
    ) external;

    /// @notice Manually redeems a retryable ticket on L2.
    function redeem(bytes32 ticketId) external returns (bytes32);

    /// @notice The outbox does not know the send root the proof was built against.
    #[derive(Debug, PartialEq, Eq)]
    error UnknownRoot(bytes32 root);

    /// @notice The outbox has already executed the message at this index.
    #[derive(Debug, PartialEq, Eq)]
    error AlreadySpent(uint256 index);
}

/// Returns `true` if `log` was emitted by `emitter` and carries the signature of `E`.
pub fn is_event<E: SolEvent>(log: &Log, emitter: Address) -> bool {
    log.address() == emitter && log.topics().first() == Some(&E::SIGNATURE_HASH)
}

/// Decodes `log` as `E`.
///
/// The caller is expected to have matched the emitter and signature already (see [`is_event`]),
/// so a failure here means the payload does not have the expected shape.
pub fn decode_event<E: SolEvent>(log: &Log) -> Result<E, DecodeError> {
    E::decode_log_data(log.data())
        .map_err(|err| DecodeError::Event { event: E::SIGNATURE, reason: err.to_string() })
}

/// Decodes every log of `logs` emitted by `emitter` with the signature of `E`, preserving order.
///
/// Logs from other emitters or with other signatures are skipped. A matching log that fails to
/// decode aborts the whole pass.
pub fn decode_events<'a, E: SolEvent>(
    logs: impl IntoIterator<Item = &'a Log>,
    emitter: Address,
) -> Result<Vec<(E, &'a Log)>, DecodeError> {
    logs.into_iter()
        .filter(|log| is_event::<E>(log, emitter))
        .map(|log| decode_event::<E>(log).map(|event| (event, log)))
        .collect()
}

/// Builds a [`LogQuery`] for `E` emitted by `emitter`, with no indexed topic filter and an empty
/// block range. The scanner fills in the block bounds per sub-range.
pub fn event_query<E: SolEvent>(emitter: Address) -> LogQuery {
    LogQuery::new(Some(emitter), E::SIGNATURE_HASH)
}

/// Left-pads an address into a 32 byte topic.
pub fn address_topic(address: Address) -> B256 {
    address.into_word()
}
