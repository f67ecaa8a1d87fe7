//! Paginated bridge log scanning.
//!
//! A [`LogScanner`] splits a block range into sub-ranges no larger than the provider's range limit,
//! queries them concurrently and yields their logs in ascending `(block number, log index)` order.
//! A failed sub-range fails the whole scan.

use crate::{
    ARB_SYS, BlockRange, ChainReader, DecodeError, InboxMessageDelivered,
    L1_MESSAGE_TYPE_SUBMIT_RETRYABLE, L1ToL2MessageInputs, L2ToL1Tx, LogQuery, MessageDelivered,
    MessageError, MessageFilter, MessageResult, RetryConfig, RetryingReader, ScannerConfig,
    address_topic, decode_event, event_query, to_u64,
};
use alloy_eips::{BlockId, BlockNumberOrTag};
use alloy_primitives::{Address, BlockNumber, Bytes, TxHash, U256};
use alloy_rpc_types_eth::Log;
use alloy_sol_types::SolEvent;
use futures::{Stream, StreamExt, TryStreamExt, stream};
use std::collections::HashMap;
use tracing::{debug, error};

/// A decoded event together with the log it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedEvent<E> {
    /// The decoded event.
    pub event: E,
    /// The raw log.
    pub log: Log,
}

impl<E: SolEvent> ScannedEvent<E> {
    /// Decodes `log` as `E`.
    pub fn decode(log: Log) -> Result<Self, DecodeError> {
        Ok(Self { event: decode_event::<E>(&log)?, log })
    }
}

impl<E> ScannedEvent<E> {
    /// The number of the block that contains the log.
    pub const fn block_number(&self) -> Option<BlockNumber> {
        self.log.block_number
    }

    /// The hash of the transaction that emitted the log.
    pub const fn transaction_hash(&self) -> Option<TxHash> {
        self.log.transaction_hash
    }
}

/// A retryable ticket submitted through the inbox: the bridge event and its inbox payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryableSubmission {
    /// The bridge event.
    pub delivered: ScannedEvent<MessageDelivered>,
    /// The packed ticket parameters carried by `InboxMessageDelivered`.
    pub data: Bytes,
}

/// Splits `from..=to` into consecutive inclusive sub-ranges spanning at most `max_span` blocks.
///
/// A `max_span` of zero is treated as one.
pub fn sub_ranges(
    from: BlockNumber,
    to: BlockNumber,
    max_span: u64,
) -> Vec<(BlockNumber, BlockNumber)> {
    let span = max_span.max(1);
    let mut ranges = Vec::new();
    let mut start = from;
    while start <= to {
        let end = start.saturating_add(span - 1).min(to);
        ranges.push((start, end));
        match end.checked_add(1) {
            Some(next) => start = next,
            None => break,
        }
    }
    ranges
}

/// Sorts logs by `(block number, log index)`, keeping the relative order of equal keys.
pub fn sort_logs(logs: &mut [Log]) {
    logs.sort_by_key(|log| {
        (log.block_number.unwrap_or_default(), log.log_index.unwrap_or_default())
    });
}

/// Scans a single chain for logs over arbitrary block ranges.
#[derive(Debug)]
pub struct LogScanner<'a, R: ?Sized> {
    reader: RetryingReader<'a, R>,
    config: ScannerConfig,
}

impl<'a, R: ChainReader + ?Sized> LogScanner<'a, R> {
    /// Creates a scanner over `reader`.
    pub const fn new(reader: &'a R, config: ScannerConfig, retry: RetryConfig) -> Self {
        Self { reader: RetryingReader::new(reader, retry), config }
    }

    /// Resolves `range` against the current chain head.
    ///
    /// Returns `None` if the range is empty.
    pub async fn resolve(
        &self,
        range: BlockRange,
    ) -> MessageResult<Option<(BlockNumber, BlockNumber)>> {
        let to_block = match range.to_block {
            BlockNumberOrTag::Number(number) => number,
            tag => self.reader.block(BlockId::Number(tag)).await?.number,
        };
        Ok((range.from_block <= to_block).then_some((range.from_block, to_block)))
    }

    /// Streams the logs matching `query` over `range`, one batch per sub-range, in block order.
    ///
    /// The block bounds of `query` are ignored. Sub-range queries run concurrently up to the
    /// configured limit but batches are yielded in order.
    pub async fn stream(
        &self,
        query: LogQuery,
        range: BlockRange,
    ) -> MessageResult<impl Stream<Item = MessageResult<Vec<Log>>> + '_> {
        let ranges = match self.resolve(range).await? {
            Some((from, to)) => sub_ranges(from, to, self.config.max_block_range),
            None => Vec::new(),
        };
        debug!(
            target: "messages::scanner",
            chain_id = self.reader.chain_id(),
            event = %query.event_signature,
            sub_ranges = ranges.len(),
            "Scanning logs"
        );

        let reader = &self.reader;
        let queries = stream::iter(ranges).map(move |(from_block, to_block)| {
            let query = query.clone().with_blocks(from_block, to_block);
            async move {
                #[cfg(feature = "metrics")]
                metrics::counter!(crate::Metrics::SCAN_QUERIES).increment(1);
                let mut logs = reader.logs(&query).await.map_err(|source| {
                    error!(
                        target: "messages::scanner",
                        from_block,
                        to_block,
                        %source,
                        "Sub-range log query failed"
                    );
                    MessageError::RangeQuery { from_block, to_block, source }
                })?;
                sort_logs(&mut logs);
                Ok(logs)
            }
        });
        Ok(queries.buffered(self.config.concurrency.max(1)))
    }

    /// Collects every log matching `query` over `range`, ordered by `(block number, log index)`.
    pub async fn scan(&self, query: LogQuery, range: BlockRange) -> MessageResult<Vec<Log>> {
        let batches: Vec<Vec<Log>> = match self.stream(query, range).await?.try_collect().await {
            Ok(batches) => batches,
            Err(err) => {
                #[cfg(feature = "metrics")]
                metrics::counter!(crate::Metrics::SCAN_FAILURES).increment(1);
                return Err(err);
            }
        };
        let mut logs: Vec<Log> = batches.into_iter().flatten().collect();
        sort_logs(&mut logs);

        #[cfg(feature = "metrics")]
        metrics::histogram!(crate::Metrics::SCAN_LOGS).record(logs.len() as f64);
        Ok(logs)
    }

    /// Collects and decodes every `E` log matching `query` over `range`.
    pub async fn scan_events<E: SolEvent>(
        &self,
        query: LogQuery,
        range: BlockRange,
    ) -> MessageResult<Vec<ScannedEvent<E>>> {
        self.scan(query, range)
            .await?
            .into_iter()
            .map(|log| ScannedEvent::<E>::decode(log).map_err(MessageError::from))
            .collect()
    }

    /// Collects the L2 to L1 messages sent through `ArbSys` over `range`.
    ///
    /// The destination filter is applied by the node. The sender filter matches the `caller`
    /// field, which is not indexed, and is applied locally.
    pub async fn l2_to_l1_message_logs(
        &self,
        range: BlockRange,
        filter: MessageFilter,
    ) -> MessageResult<Vec<ScannedEvent<L2ToL1Tx>>> {
        let mut query = event_query::<L2ToL1Tx>(ARB_SYS);
        if let Some(destination) = filter.destination {
            query = query.with_topic1(address_topic(destination));
        }
        let mut events = self.scan_events::<L2ToL1Tx>(query, range).await?;
        if let Some(sender) = filter.sender {
            events.retain(|sent| sent.event.caller == sender);
        }
        Ok(events)
    }

    /// Collects the retryable tickets submitted to the bridge at `bridge` over `range`.
    ///
    /// Bridge events are joined with the payloads the inbox at `inbox` emitted for them. The
    /// sender filter matches the sender recorded by the bridge, which is aliased for contracts.
    /// The destination filter matches the L2 call target decoded from the payload. Bridge
    /// messages of other kinds are skipped.
    pub async fn l1_to_l2_message_logs(
        &self,
        bridge: Address,
        inbox: Address,
        range: BlockRange,
        filter: MessageFilter,
    ) -> MessageResult<Vec<RetryableSubmission>> {
        // Both scans must see the same head, or a fresh bridge event could miss its payload.
        let Some((from_block, to_block)) = self.resolve(range).await? else {
            return Ok(Vec::new());
        };
        let range = BlockRange::between(from_block, to_block);
        let (delivered, payloads) = futures::try_join!(
            self.scan_events::<MessageDelivered>(event_query::<MessageDelivered>(bridge), range),
            self.scan_events::<InboxMessageDelivered>(
                event_query::<InboxMessageDelivered>(inbox),
                range
            ),
        )?;

        let mut payloads: HashMap<U256, Bytes> = payloads
            .into_iter()
            .map(|payload| (payload.event.messageNum, payload.event.data))
            .collect();
        let mut submissions = Vec::new();
        for delivered in delivered {
            if delivered.event.kind != L1_MESSAGE_TYPE_SUBMIT_RETRYABLE ||
                filter.sender.is_some_and(|sender| sender != delivered.event.sender)
            {
                continue;
            }
            let message_index = to_u64(delivered.event.messageIndex)?;
            let data = payloads
                .remove(&delivered.event.messageIndex)
                .ok_or(DecodeError::MissingInboxData { message_index })?;
            if let Some(destination) = filter.destination &&
                L1ToL2MessageInputs::decode(&data)?.destination_address != destination
            {
                continue;
            }
            submissions.push(RetryableSubmission { delivered, data });
        }
        Ok(submissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        L1_MESSAGE_TYPE_ETH_DEPOSIT,
        test_util::{
            L1_CHAIN_ID, L2_CHAIN_ID, MockChain, RetryableFixture, l2_to_l1_tx, retryable_inputs,
            test_network,
        },
    };
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case::single(0, 0, 10, vec![(0, 0)])]
    #[case::exact(0, 9, 5, vec![(0, 4), (5, 9)])]
    #[case::remainder(3, 12, 4, vec![(3, 6), (7, 10), (11, 12)])]
    #[case::zero_span(1, 3, 0, vec![(1, 1), (2, 2), (3, 3)])]
    #[case::empty(5, 4, 10, vec![])]
    #[case::chain_end(u64::MAX - 1, u64::MAX, 10, vec![(u64::MAX - 1, u64::MAX)])]
    fn test_sub_ranges(
        #[case] from: u64,
        #[case] to: u64,
        #[case] span: u64,
        #[case] expected: Vec<(u64, u64)>,
    ) {
        assert_eq!(sub_ranges(from, to, span), expected);
    }

    fn scanner(chain: &MockChain, max_block_range: u64) -> LogScanner<'_, MockChain> {
        LogScanner::new(
            chain,
            ScannerConfig { max_block_range, concurrency: 3 },
            RetryConfig { max_retries: 2, min_delay_ms: 1, max_delay_ms: 1 },
        )
    }

    fn chain_with_sends(blocks: &[u64]) -> MockChain {
        let chain = MockChain::new(42161);
        chain.mine_to(blocks.iter().copied().max().unwrap_or_default() + 5);
        for (position, block) in blocks.iter().enumerate() {
            chain.add_log_at(*block, ARB_SYS, l2_to_l1_tx(position as u64).encode_log_data());
        }
        chain
    }

    #[tokio::test]
    async fn test_scan_resolves_latest_and_orders_logs() {
        let chain = chain_with_sends(&[9, 2, 2, 30, 17]);
        let logs = scanner(&chain, 4)
            .scan(event_query::<L2ToL1Tx>(ARB_SYS), BlockRange::starting_at(0))
            .await
            .unwrap();

        let blocks: Vec<_> = logs.iter().map(|log| log.block_number.unwrap()).collect();
        assert_eq!(blocks, vec![2, 2, 9, 17, 30]);
        let first_two: Vec<_> = logs[..2].iter().map(|log| log.log_index.unwrap()).collect();
        assert!(first_two[0] < first_two[1]);
    }

    #[tokio::test]
    async fn test_scan_respects_provider_range_limit() {
        let chain = chain_with_sends(&[1, 50, 99]);
        chain.set_max_log_range(Some(10));

        let err = scanner(&chain, 100)
            .scan(event_query::<L2ToL1Tx>(ARB_SYS), BlockRange::between(0, 99))
            .await
            .unwrap_err();
        assert!(matches!(err, MessageError::RangeQuery { from_block: 0, to_block: 99, .. }));

        let logs = scanner(&chain, 10)
            .scan(event_query::<L2ToL1Tx>(ARB_SYS), BlockRange::between(0, 99))
            .await
            .unwrap();
        assert_eq!(logs.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_retries_transient_failures() {
        let chain = chain_with_sends(&[1, 5]);
        chain.fail_next_log_queries(2);

        let logs = scanner(&chain, 100)
            .scan(event_query::<L2ToL1Tx>(ARB_SYS), BlockRange::between(0, 10))
            .await
            .unwrap();
        assert_eq!(logs.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_is_all_or_nothing() {
        let chain = chain_with_sends(&[1, 5, 25]);
        // More failures than one sub-range can absorb with two retries.
        chain.fail_next_log_queries(10);

        let err = scanner(&chain, 10)
            .scan(event_query::<L2ToL1Tx>(ARB_SYS), BlockRange::between(0, 29))
            .await
            .unwrap_err();
        assert!(matches!(err, MessageError::RangeQuery { .. }));
    }

    #[tokio::test]
    async fn test_l2_to_l1_message_logs_filters() {
        let chain = MockChain::new(42161);
        chain.mine_to(10);
        let mut mine = l2_to_l1_tx(0);
        mine.caller = Address::repeat_byte(0xaa);
        mine.destination = Address::repeat_byte(0xbb);
        let mut theirs = l2_to_l1_tx(1);
        theirs.caller = Address::repeat_byte(0xcc);
        theirs.destination = Address::repeat_byte(0xbb);
        let mut elsewhere = l2_to_l1_tx(2);
        elsewhere.caller = Address::repeat_byte(0xaa);
        elsewhere.destination = Address::repeat_byte(0xdd);
        for (block, event) in [(2, &mine), (3, &theirs), (4, &elsewhere)] {
            chain.add_log_at(block, ARB_SYS, event.encode_log_data());
        }

        let scanner = scanner(&chain, 3);
        let by_sender = scanner
            .l2_to_l1_message_logs(BlockRange::starting_at(0), MessageFilter::sender(mine.caller))
            .await
            .unwrap();
        let positions: Vec<_> = by_sender.iter().map(|sent| sent.event.position).collect();
        assert_eq!(positions, vec![U256::ZERO, U256::from(2)]);

        let both = scanner
            .l2_to_l1_message_logs(
                BlockRange::starting_at(0),
                MessageFilter { sender: Some(mine.caller), destination: Some(mine.destination) },
            )
            .await
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].event, mine);

        let any = scanner
            .l2_to_l1_message_logs(BlockRange::starting_at(0), MessageFilter::default())
            .await
            .unwrap();
        assert_eq!(any.len(), 3);
    }

    fn submission(message_index: u64, sender: Address, destination: Address) -> RetryableFixture {
        let mut fixture = RetryableFixture::new(L2_CHAIN_ID, message_index);
        fixture.sender = sender;
        fixture.inputs = retryable_inputs(destination);
        fixture
    }

    fn submitted_indices(submissions: &[RetryableSubmission]) -> Vec<U256> {
        submissions.iter().map(|submitted| submitted.delivered.event.messageIndex).collect()
    }

    #[rstest]
    #[case::any(MessageFilter::default(), vec![0, 1, 2])]
    #[case::sender(MessageFilter::sender(Address::repeat_byte(0xaa)), vec![0, 2])]
    #[case::destination(MessageFilter::destination(Address::repeat_byte(0xbb)), vec![0, 1])]
    #[case::both(
        MessageFilter {
            sender: Some(Address::repeat_byte(0xaa)),
            destination: Some(Address::repeat_byte(0xbb)),
        },
        vec![0]
    )]
    #[tokio::test]
    async fn test_l1_to_l2_message_logs_filters(
        #[case] filter: MessageFilter,
        #[case] expected: Vec<u64>,
    ) {
        let network = test_network();
        let chain = MockChain::new(L1_CHAIN_ID);
        chain.mine_to(20);
        let (mine, theirs) = (Address::repeat_byte(0xaa), Address::repeat_byte(0xcc));
        let (target, other) = (Address::repeat_byte(0xbb), Address::repeat_byte(0xdd));
        submission(0, mine, target).submit(&chain, 2, true);
        submission(1, theirs, target).submit(&chain, 7, true);
        submission(2, mine, other).submit(&chain, 15, true);
        let mut deposit = submission(3, mine, target).message_delivered();
        deposit.kind = L1_MESSAGE_TYPE_ETH_DEPOSIT;
        chain.add_log_at(16, network.bridge, deposit.encode_log_data());

        let submissions = scanner(&chain, 4)
            .l1_to_l2_message_logs(
                network.bridge,
                network.inbox,
                BlockRange::starting_at(0),
                filter,
            )
            .await
            .unwrap();
        let expected: Vec<_> = expected.into_iter().map(U256::from).collect();
        assert_eq!(submitted_indices(&submissions), expected);
        for submitted in &submissions {
            let index = submitted.delivered.event.messageIndex;
            let fixture = RetryableFixture::new(L2_CHAIN_ID, index.to());
            assert_eq!(submitted.delivered.transaction_hash(), Some(fixture.origin_tx_hash));
        }
    }

    #[tokio::test]
    async fn test_l1_to_l2_message_logs_require_inbox_payload() {
        let network = test_network();
        let chain = MockChain::new(L1_CHAIN_ID);
        chain.mine_to(10);
        let fixture = submission(4, Address::repeat_byte(0xaa), Address::repeat_byte(0xbb));
        chain.add_log_at(3, network.bridge, fixture.message_delivered().encode_log_data());

        let err = scanner(&chain, 4)
            .l1_to_l2_message_logs(
                network.bridge,
                network.inbox,
                BlockRange::starting_at(0),
                MessageFilter::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MessageError::Decode(DecodeError::MissingInboxData { message_index: 4 })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_split_scan_matches_unsplit(
            blocks in proptest::collection::vec(0u64..200, 0..40),
            max_block_range in 1u64..64,
        ) {
            let runtime =
                tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let chain = MockChain::new(42161);
            chain.mine_to(200);
            for (position, block) in blocks.iter().enumerate() {
                chain.add_log_at(*block, ARB_SYS, l2_to_l1_tx(position as u64).encode_log_data());
            }
            let query = event_query::<L2ToL1Tx>(ARB_SYS);

            let (split, unsplit) = runtime.block_on(async {
                let split = scanner(&chain, max_block_range)
                    .scan(query.clone(), BlockRange::between(0, 200))
                    .await
                    .unwrap();
                let unsplit = scanner(&chain, 1_000)
                    .scan(query.clone(), BlockRange::between(0, 200))
                    .await
                    .unwrap();
                (split, unsplit)
            });

            prop_assert_eq!(split.len(), blocks.len());
            prop_assert_eq!(split, unsplit);
        }
    }
}
