//! The L1 to L2 retryable message tracker.

use super::{L1ToL2MessageInputs, retryable_creation_id};
use crate::{
    ARB_RETRYABLE_TX, BlockRange, ChainReader, DecodeError, L1ToL2Status, LifetimeExtended,
    LogScanner, MessageConfig, MessageError, MessageIdentity, MessageResult,
    RETRYABLE_LIFETIME_SECONDS, ReceiptInfo, RedeemScheduled, RetryingReader, StatusWait,
    TransactionCall, TransactionSender, event_query, poll::poll_until, redeemCall, to_u64,
};
use alloy_eips::BlockId;
use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_sol_types::SolCall;
use core::time::Duration;
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Tracks a single retryable ticket from its L1 submission to its redemption on L2.
///
/// Inputs and the ticket id are decoded on first use and cached.
#[derive(Debug)]
pub struct L1ToL2Message<R> {
    identity: MessageIdentity,
    sender: Address,
    base_fee_l1: U256,
    inbox_data: Bytes,
    origin_succeeded: bool,
    l2_reader: Arc<R>,
    config: MessageConfig,
    inputs: OnceLock<L1ToL2MessageInputs>,
    ticket_id: OnceLock<B256>,
}

impl<R: ChainReader> L1ToL2Message<R> {
    /// Creates a tracker for the bridge message `identity`.
    ///
    /// `inbox_data` is the raw `InboxMessageDelivered` payload and `origin_succeeded` is the
    /// status of the L1 transaction that submitted it.
    pub const fn new(
        identity: MessageIdentity,
        sender: Address,
        base_fee_l1: U256,
        inbox_data: Bytes,
        origin_succeeded: bool,
        l2_reader: Arc<R>,
        config: MessageConfig,
    ) -> Self {
        Self {
            identity,
            sender,
            base_fee_l1,
            inbox_data,
            origin_succeeded,
            l2_reader,
            config,
            inputs: OnceLock::new(),
            ticket_id: OnceLock::new(),
        }
    }

    /// Returns the identity of the message.
    pub const fn identity(&self) -> &MessageIdentity {
        &self.identity
    }

    /// Returns the bridge message index.
    pub const fn message_index(&self) -> u64 {
        self.identity.sequence_number
    }

    /// Returns the (aliased) sender recorded by the bridge.
    pub const fn sender(&self) -> Address {
        self.sender
    }

    /// Returns the decoded ticket parameters.
    pub fn inputs(&self) -> Result<&L1ToL2MessageInputs, DecodeError> {
        if let Some(inputs) = self.inputs.get() {
            return Ok(inputs);
        }
        let inputs = L1ToL2MessageInputs::decode(&self.inbox_data)?;
        Ok(self.inputs.get_or_init(|| inputs))
    }

    /// Returns the id of the L2 transaction that creates the ticket.
    pub fn retryable_creation_id(&self) -> Result<B256, DecodeError> {
        if let Some(id) = self.ticket_id.get() {
            return Ok(*id);
        }
        let id = retryable_creation_id(
            self.identity.destination_chain_id,
            self.message_index(),
            self.sender,
            self.base_fee_l1,
            self.inputs()?,
        );
        Ok(*self.ticket_id.get_or_init(|| id))
    }

    /// Reads the current status of the ticket.
    ///
    /// `known_head` pins the L2 block the status is evaluated at. Without it the latest block is
    /// used.
    pub async fn status(&self, known_head: Option<u64>) -> MessageResult<L1ToL2Status> {
        let status = self.resolve_status(known_head).await?;
        debug!(
            target: "messages::retryable",
            message = %self.identity,
            %status,
            "Read retryable status"
        );
        #[cfg(feature = "metrics")]
        metrics::counter!(
            crate::Metrics::STATUS_READS,
            "direction" => "l1_to_l2",
            "status" => status.to_string()
        )
        .increment(1);
        Ok(status)
    }

    async fn resolve_status(&self, known_head: Option<u64>) -> MessageResult<L1ToL2Status> {
        let ticket_id = self.retryable_creation_id()?;
        let reader = RetryingReader::new(self.l2_reader.as_ref(), self.config.retry);

        let Some(creation) = reader.receipt(ticket_id).await? else {
            return Ok(if self.origin_succeeded {
                L1ToL2Status::NotYetCreated
            } else {
                L1ToL2Status::CreationFailed
            });
        };
        if !creation.status {
            return Ok(L1ToL2Status::CreationFailed);
        }

        let head = match known_head {
            Some(number) => reader.block(BlockId::number(number)).await?,
            None => reader.block(BlockId::latest()).await?,
        };
        if head.number < creation.block_number {
            return Ok(L1ToL2Status::NotYetCreated);
        }
        let range = BlockRange::between(creation.block_number, head.number);
        let scanner =
            LogScanner::new(self.l2_reader.as_ref(), self.config.scanner, self.config.retry);

        let redemption = self.successful_redemption(&scanner, &reader, range, head.number).await?;
        if let Some(redemption) = redemption {
            debug!(
                target: "messages::retryable",
                %ticket_id,
                retry_tx = %redemption.transaction_hash,
                "Found successful redemption"
            );
            return Ok(L1ToL2Status::Redeemed);
        }

        let created_at = reader.block(BlockId::hash(creation.block_hash)).await?;
        let mut timeout = created_at.timestamp.saturating_add(RETRYABLE_LIFETIME_SECONDS);
        let extensions = scanner
            .scan_events::<LifetimeExtended>(
                event_query::<LifetimeExtended>(ARB_RETRYABLE_TX).with_topic1(ticket_id),
                range,
            )
            .await?;
        for extension in &extensions {
            timeout = timeout.max(to_u64(extension.event.newTimeout)?);
        }

        if head.timestamp >= timeout {
            return Ok(L1ToL2Status::Expired);
        }
        Ok(L1ToL2Status::FundsDepositedOnL2)
    }

    /// Returns the receipt of the first successful redemption attempt mined at or before `head`.
    async fn successful_redemption(
        &self,
        scanner: &LogScanner<'_, R>,
        reader: &RetryingReader<'_, R>,
        range: BlockRange,
        head: u64,
    ) -> MessageResult<Option<ReceiptInfo>> {
        let ticket_id = self.retryable_creation_id()?;
        let attempts = scanner
            .scan_events::<RedeemScheduled>(
                event_query::<RedeemScheduled>(ARB_RETRYABLE_TX).with_topic1(ticket_id),
                range,
            )
            .await?;

        for attempt in attempts {
            let retry_tx = attempt.event.retryTxHash;
            match reader.receipt(retry_tx).await? {
                Some(receipt) if receipt.status && receipt.block_number <= head => {
                    return Ok(Some(receipt));
                }
                Some(_) => {
                    debug!(
                        target: "messages::retryable",
                        %ticket_id,
                        %retry_tx,
                        "Redemption attempt failed"
                    );
                }
                None => {
                    debug!(
                        target: "messages::retryable",
                        %ticket_id,
                        %retry_tx,
                        "Redemption attempt not mined"
                    );
                }
            }
        }
        Ok(None)
    }

    /// Polls the ticket status until it settles, `timeout` elapses or `cancel` fires.
    ///
    /// The wait settles at [`L1ToL2Status::FundsDepositedOnL2`], [`L1ToL2Status::Redeemed`],
    /// [`L1ToL2Status::Expired`] or [`L1ToL2Status::CreationFailed`]. A timeout or cancellation
    /// is not an error, it yields an incomplete result with the last observed status.
    pub async fn wait_for_status(
        &self,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> MessageResult<StatusWait<L1ToL2Status>> {
        poll_until(
            self.config.poll.interval(),
            timeout,
            cancel,
            || self.status(None),
            L1ToL2Status::is_settled,
        )
        .await
    }

    /// Manually redeems the ticket on L2 through `sender`.
    ///
    /// Only a ticket in [`L1ToL2Status::FundsDepositedOnL2`] is submitted. A redemption that is
    /// mined but fails yields [`MessageError::ExecutionReverted`].
    pub async fn redeem<S: TransactionSender + ?Sized>(
        &self,
        sender: &S,
    ) -> MessageResult<ReceiptInfo> {
        let expected = self.identity.destination_chain_id;
        if sender.chain_id() != expected {
            return Err(MessageError::WrongChain { expected, actual: sender.chain_id() });
        }

        let ticket_id = self.retryable_creation_id()?;
        match self.status(None).await? {
            L1ToL2Status::FundsDepositedOnL2 => {}
            L1ToL2Status::Expired => return Err(MessageError::TicketExpired { ticket_id }),
            L1ToL2Status::Redeemed => return Err(MessageError::AlreadyRedeemed { ticket_id }),
            status @ (L1ToL2Status::NotYetCreated | L1ToL2Status::CreationFailed) => {
                return Err(MessageError::NotRedeemable { status });
            }
        }

        let call = TransactionCall {
            to: ARB_RETRYABLE_TX,
            data: redeemCall { ticketId: ticket_id }.abi_encode().into(),
            value: U256::ZERO,
        };
        let receipt = sender.send_transaction(call).await?;
        if !receipt.status {
            return Err(MessageError::ExecutionReverted { tx_hash: receipt.transaction_hash });
        }

        info!(
            target: "messages::retryable",
            %ticket_id,
            tx_hash = %receipt.transaction_hash,
            "Redeemed retryable ticket"
        );
        #[cfg(feature = "metrics")]
        metrics::counter!(crate::Metrics::COMPLETIONS, "action" => "redeem").increment(1);
        Ok(receipt)
    }
}
