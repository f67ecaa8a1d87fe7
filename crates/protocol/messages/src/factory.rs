//! Discovery of bridge messages emitted by a transaction.

use crate::{
    ARB_SYS, BlockRange, ChainReader, ChildNetwork, DecodeError, InboxMessageDelivered,
    L1_MESSAGE_TYPE_SUBMIT_RETRYABLE, L1ToL2Message, L2ToL1Message, L2ToL1Tx, LogScanner,
    MessageConfig, MessageDelivered, MessageFilter, MessageIdentity, MessageResult, ReceiptInfo,
    decode_events, log_position, to_u64,
};
use alloy_primitives::{Bytes, TxHash, U256};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, trace};

/// Builds message trackers from source chain receipts.
#[derive(Debug, Clone, Copy)]
pub struct MessageFactory {
    network: ChildNetwork,
    config: MessageConfig,
}

impl MessageFactory {
    /// Creates a factory for the bridge of `network`.
    pub const fn new(network: ChildNetwork, config: MessageConfig) -> Self {
        Self { network, config }
    }

    /// Returns the child network the factory is bound to.
    pub const fn network(&self) -> &ChildNetwork {
        &self.network
    }

    /// Returns one tracker per retryable ticket submitted by the L1 `receipt`, in log order.
    ///
    /// Bridge messages of other kinds are skipped. A receipt without bridge messages yields an
    /// empty list.
    pub fn l1_to_l2_messages<R: ChainReader>(
        &self,
        receipt: &ReceiptInfo,
        l2_reader: Arc<R>,
    ) -> MessageResult<Vec<L1ToL2Message<R>>> {
        let delivered = decode_events::<MessageDelivered>(&receipt.logs, self.network.bridge)?;
        let inbox_data: HashMap<U256, Bytes> =
            decode_events::<InboxMessageDelivered>(&receipt.logs, self.network.inbox)?
                .into_iter()
                .map(|(event, _)| (event.messageNum, event.data))
                .collect();

        let mut messages = Vec::new();
        for (event, _) in delivered {
            let message_index = to_u64(event.messageIndex)?;
            if event.kind != L1_MESSAGE_TYPE_SUBMIT_RETRYABLE {
                trace!(
                    target: "messages::factory",
                    message_index,
                    kind = event.kind,
                    "Skipping non-retryable bridge message"
                );
                continue;
            }
            let data = inbox_data
                .get(&event.messageIndex)
                .cloned()
                .ok_or(DecodeError::MissingInboxData { message_index })?;
            messages.push(self.retryable(
                &event,
                data,
                receipt.transaction_hash,
                receipt.status,
                Arc::clone(&l2_reader),
            )?);
        }

        debug!(
            target: "messages::factory",
            tx_hash = %receipt.transaction_hash,
            count = messages.len(),
            "Found L1 to L2 messages"
        );
        Ok(messages)
    }

    /// Scans `range` on L1 for retryable tickets matching `filter` and returns one tracker per
    /// ticket, in log order.
    pub async fn l1_to_l2_messages_in_range<L1: ChainReader, L2: ChainReader>(
        &self,
        range: BlockRange,
        filter: MessageFilter,
        l1_reader: &L1,
        l2_reader: Arc<L2>,
    ) -> MessageResult<Vec<L1ToL2Message<L2>>> {
        let scanner = LogScanner::new(l1_reader, self.config.scanner, self.config.retry);
        let submissions = scanner
            .l1_to_l2_message_logs(self.network.bridge, self.network.inbox, range, filter)
            .await?;
        submissions
            .into_iter()
            .map(|submitted| {
                let (_, _, origin_tx_hash) = log_position(&submitted.delivered.log)?;
                // Reverted transactions emit no logs, so every scanned submission succeeded.
                self.retryable(
                    &submitted.delivered.event,
                    submitted.data,
                    origin_tx_hash,
                    true,
                    Arc::clone(&l2_reader),
                )
            })
            .collect()
    }

    fn retryable<R: ChainReader>(
        &self,
        event: &MessageDelivered,
        data: Bytes,
        origin_tx_hash: TxHash,
        origin_succeeded: bool,
        l2_reader: Arc<R>,
    ) -> MessageResult<L1ToL2Message<R>> {
        let identity = MessageIdentity {
            source_chain_id: self.network.parent_chain_id,
            destination_chain_id: self.network.chain_id,
            sequence_number: to_u64(event.messageIndex)?,
            origin_tx_hash,
        };
        Ok(L1ToL2Message::new(
            identity,
            event.sender,
            event.baseFeeL1,
            data,
            origin_succeeded,
            l2_reader,
            self.config,
        ))
    }

    /// Returns one tracker per L2 to L1 message sent by the L2 `receipt`, in log order.
    pub fn l2_to_l1_messages<L1: ChainReader, L2: ChainReader>(
        &self,
        receipt: &ReceiptInfo,
        l1_reader: Arc<L1>,
        l2_reader: Arc<L2>,
    ) -> MessageResult<Vec<L2ToL1Message<L1, L2>>> {
        let messages = decode_events::<L2ToL1Tx>(&receipt.logs, ARB_SYS)?
            .into_iter()
            .map(|(event, _)| {
                L2ToL1Message::new(
                    self.network,
                    event,
                    receipt.transaction_hash,
                    Arc::clone(&l1_reader),
                    Arc::clone(&l2_reader),
                    self.config,
                )
            })
            .collect::<MessageResult<Vec<_>>>()?;

        debug!(
            target: "messages::factory",
            tx_hash = %receipt.transaction_hash,
            count = messages.len(),
            "Found L2 to L1 messages"
        );
        Ok(messages)
    }

    /// Scans `range` on L2 for messages matching `filter` and returns one tracker per message.
    pub async fn l2_to_l1_messages_in_range<L1: ChainReader, L2: ChainReader>(
        &self,
        range: BlockRange,
        filter: MessageFilter,
        l1_reader: Arc<L1>,
        l2_reader: Arc<L2>,
    ) -> MessageResult<Vec<L2ToL1Message<L1, L2>>> {
        let scanner = LogScanner::new(l2_reader.as_ref(), self.config.scanner, self.config.retry);
        let sends = scanner.l2_to_l1_message_logs(range, filter).await?;
        sends
            .into_iter()
            .map(|sent| {
                L2ToL1Message::from_scanned(
                    self.network,
                    sent,
                    Arc::clone(&l1_reader),
                    Arc::clone(&l2_reader),
                    self.config,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        L1_MESSAGE_TYPE_ETH_DEPOSIT, L1ToL2Status,
        test_util::{
            MockChain, RetryableFixture, WithdrawalFixture, retryable_inputs, test_config,
            test_network,
        },
    };
    use alloy_primitives::{Address, LogData, TxHash};
    use alloy_rpc_types_eth::Log;
    use alloy_sol_types::SolEvent;

    fn factory() -> MessageFactory {
        MessageFactory::new(test_network(), test_config())
    }

    fn log(address: Address, data: LogData) -> Log {
        Log { inner: alloy_primitives::Log { address, data }, ..Default::default() }
    }

    #[test]
    fn test_receipt_without_bridge_logs_is_empty() {
        let l2 = Arc::new(MockChain::new(test_network().chain_id));
        let receipt = ReceiptInfo {
            status: true,
            logs: vec![log(Address::repeat_byte(0x77), LogData::default())],
            ..Default::default()
        };

        assert!(factory().l1_to_l2_messages(&receipt, Arc::clone(&l2)).unwrap().is_empty());
        assert!(factory().l2_to_l1_messages(&receipt, Arc::clone(&l2), l2).unwrap().is_empty());
    }

    #[test]
    fn test_batched_deposits_are_returned_in_order() {
        let l2 = Arc::new(MockChain::new(test_network().chain_id));
        let first = RetryableFixture::new(test_network().chain_id, 10);
        let second = RetryableFixture::new(test_network().chain_id, 11);
        let mut logs = first.l1_logs();
        logs.extend(second.l1_logs());
        let receipt = ReceiptInfo {
            transaction_hash: TxHash::repeat_byte(0xab),
            status: true,
            logs,
            ..Default::default()
        };

        let messages = factory().l1_to_l2_messages(&receipt, l2).unwrap();
        let indices: Vec<_> = messages.iter().map(|message| message.message_index()).collect();
        assert_eq!(indices, vec![10, 11]);
        assert_eq!(messages[0].identity().origin_tx_hash, receipt.transaction_hash);
        assert_eq!(messages[1].inputs().unwrap(), &second.inputs);
        assert_eq!(messages[1].retryable_creation_id().unwrap(), second.ticket_id());
    }

    #[test]
    fn test_non_retryable_kinds_are_skipped() {
        let l2 = Arc::new(MockChain::new(test_network().chain_id));
        let mut deposit = RetryableFixture::new(test_network().chain_id, 3).message_delivered();
        deposit.kind = L1_MESSAGE_TYPE_ETH_DEPOSIT;
        let receipt = ReceiptInfo {
            status: true,
            logs: vec![log(test_network().bridge, deposit.encode_log_data())],
            ..Default::default()
        };

        assert!(factory().l1_to_l2_messages(&receipt, l2).unwrap().is_empty());
    }

    #[test]
    fn test_missing_inbox_data_is_a_decode_error() {
        let l2 = Arc::new(MockChain::new(test_network().chain_id));
        let fixture = RetryableFixture::new(test_network().chain_id, 3);
        let receipt = ReceiptInfo {
            status: true,
            logs: vec![log(test_network().bridge, fixture.message_delivered().encode_log_data())],
            ..Default::default()
        };

        let err = factory().l1_to_l2_messages(&receipt, l2).unwrap_err();
        assert!(matches!(
            err,
            crate::MessageError::Decode(DecodeError::MissingInboxData { message_index: 3 })
        ));
    }

    #[tokio::test]
    async fn test_reverted_origin_reports_creation_failed() {
        let l2 = Arc::new(MockChain::new(test_network().chain_id));
        let fixture = RetryableFixture::new(test_network().chain_id, 8);
        let receipt = ReceiptInfo { status: false, logs: fixture.l1_logs(), ..Default::default() };

        let messages = factory().l1_to_l2_messages(&receipt, l2).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].status(None).await.unwrap(), L1ToL2Status::CreationFailed);
    }

    #[tokio::test]
    async fn test_retryables_from_range() {
        let l1 = MockChain::new(test_network().parent_chain_id);
        let l2 = Arc::new(MockChain::new(test_network().chain_id));
        l1.mine_to(40);
        l2.mine_to(10);
        let first = RetryableFixture::new(test_network().chain_id, 20);
        let mut second = RetryableFixture::new(test_network().chain_id, 21);
        second.inputs = retryable_inputs(Address::repeat_byte(0xe1));
        first.submit(&l1, 5, true);
        second.submit(&l1, 33, true);
        first.create_ticket(&l2, 3, true);

        let messages = factory()
            .l1_to_l2_messages_in_range(
                BlockRange::starting_at(0),
                MessageFilter::default(),
                &l1,
                Arc::clone(&l2),
            )
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].identity(), &first.identity());
        assert_eq!(messages[1].retryable_creation_id().unwrap(), second.ticket_id());
        assert_eq!(messages[0].status(None).await.unwrap(), L1ToL2Status::FundsDepositedOnL2);
        assert_eq!(messages[1].status(None).await.unwrap(), L1ToL2Status::NotYetCreated);

        let to_second = factory()
            .l1_to_l2_messages_in_range(
                BlockRange::starting_at(0),
                MessageFilter::destination(Address::repeat_byte(0xe1)),
                &l1,
                l2,
            )
            .await
            .unwrap();
        assert_eq!(to_second.len(), 1);
        assert_eq!(to_second[0].message_index(), 21);
    }

    #[tokio::test]
    async fn test_withdrawals_from_receipt_and_range() {
        let fixture = WithdrawalFixture::new(3);
        let receipts = fixture.send_all();

        let messages = factory()
            .l2_to_l1_messages(&receipts[1], Arc::clone(&fixture.l1), Arc::clone(&fixture.l2))
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].position(), 1);
        assert_eq!(messages[0].identity().destination_chain_id, test_network().parent_chain_id);

        let sender = fixture.sends[2].caller;
        let scanned = factory()
            .l2_to_l1_messages_in_range(
                BlockRange::starting_at(0),
                MessageFilter::sender(sender),
                Arc::clone(&fixture.l1),
                Arc::clone(&fixture.l2),
            )
            .await
            .unwrap();
        assert_eq!(scanned.len(), 3);
        assert_eq!(scanned[2].identity().origin_tx_hash, receipts[2].transaction_hash);
    }
}
