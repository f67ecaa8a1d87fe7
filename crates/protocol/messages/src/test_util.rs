//! Test utilities for `ferry-messages`.

#![allow(missing_docs, unreachable_pub, unused)]

use crate::{
    ARB_RETRYABLE_TX, ARB_SYS, BlockInfo, ChainReader, ChainReaderError, ChildNetwork,
    InboxMessageDelivered, L1_MESSAGE_TYPE_SUBMIT_RETRYABLE, L1ToL2Message, L1ToL2MessageInputs,
    L2ToL1Message, L2ToL1Tx, LifetimeExtended, LogQuery, MessageConfig, MessageDelivered,
    MessageIdentity, ReceiptInfo, RedeemScheduled, RetryConfig, ScannerConfig, SendTree,
    TicketCreated, TransactionCall, TransactionSender, retryable_creation_id, send_leaf,
};
use alloy_eips::{BlockId, BlockNumberOrTag};
use alloy_primitives::{Address, B256, Bytes, LogData, TxHash, U256, address, keccak256};
use alloy_rpc_types_eth::Log;
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
};

pub const L1_CHAIN_ID: u64 = 1;
pub const L2_CHAIN_ID: u64 = 42161;
pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;
pub const BLOCK_TIME: u64 = 12;

pub const fn test_network() -> ChildNetwork {
    ChildNetwork {
        chain_id: L2_CHAIN_ID,
        parent_chain_id: L1_CHAIN_ID,
        bridge: address!("0x8315177ab297ba92a06054ce80a67ed4dbd7ed3a"),
        inbox: address!("0x4dbd4fc535ac27206064b68ffcf827b0a60bab3f"),
        outbox: address!("0x0b9857ae2d4a3dbe74ffe1d7df045bb7f96e4840"),
    }
}

pub fn test_config() -> MessageConfig {
    MessageConfig {
        scanner: ScannerConfig { max_block_range: 16, concurrency: 2 },
        retry: RetryConfig { max_retries: 2, min_delay_ms: 1, max_delay_ms: 5 },
        ..Default::default()
    }
}

#[derive(Debug, Default)]
struct ChainState {
    blocks: Vec<BlockInfo>,
    logs: Vec<Log>,
    receipts: HashMap<TxHash, ReceiptInfo>,
    next_log_index: HashMap<u64, u64>,
}

/// An in-memory chain.
#[derive(Debug)]
pub struct MockChain {
    chain_id: u64,
    state: RwLock<ChainState>,
    failing_log_queries: AtomicUsize,
    max_log_range: RwLock<Option<u64>>,
    log_queries: AtomicUsize,
    tx_nonce: AtomicU64,
}

impl MockChain {
    pub fn new(chain_id: u64) -> Self {
        let chain = Self {
            chain_id,
            state: RwLock::new(ChainState::default()),
            failing_log_queries: AtomicUsize::new(0),
            max_log_range: RwLock::new(None),
            log_queries: AtomicUsize::new(0),
            tx_nonce: AtomicU64::new(0),
        };
        chain.push_block(GENESIS_TIMESTAMP);
        chain
    }

    fn push_block(&self, timestamp: u64) -> BlockInfo {
        let mut state = self.state.write().unwrap();
        let number = state.blocks.len() as u64;
        let mut preimage = Vec::with_capacity(24);
        preimage.extend_from_slice(&self.chain_id.to_be_bytes());
        preimage.extend_from_slice(&number.to_be_bytes());
        preimage.extend_from_slice(&timestamp.to_be_bytes());
        let block =
            BlockInfo { hash: keccak256(preimage), number, timestamp, ..Default::default() };
        state.blocks.push(block.clone());
        block
    }

    pub fn head(&self) -> u64 {
        self.state.read().unwrap().blocks.len() as u64 - 1
    }

    pub fn block(&self, number: u64) -> BlockInfo {
        self.state.read().unwrap().blocks[number as usize].clone()
    }

    /// Mines empty blocks until the head is `number`.
    pub fn mine_to(&self, number: u64) {
        while self.head() < number {
            let timestamp = self.block(self.head()).timestamp + BLOCK_TIME;
            self.push_block(timestamp);
        }
    }

    /// Mines one block `seconds` after the head.
    pub fn warp(&self, seconds: u64) -> BlockInfo {
        let timestamp = self.block(self.head()).timestamp + seconds;
        self.push_block(timestamp)
    }

    /// Writes the send count and send root into the header of block `number`.
    pub fn set_send_info(&self, number: u64, send_count: u64, send_root: B256) {
        let mut state = self.state.write().unwrap();
        let block = &mut state.blocks[number as usize];
        block.mix_hash = B256::ZERO;
        block.mix_hash[..8].copy_from_slice(&send_count.to_be_bytes());
        block.extra_data = Bytes::copy_from_slice(send_root.as_slice());
    }

    pub fn next_tx_hash(&self) -> TxHash {
        let nonce = self.tx_nonce.fetch_add(1, Ordering::SeqCst);
        let mut preimage = Vec::with_capacity(16);
        preimage.extend_from_slice(&self.chain_id.to_be_bytes());
        preimage.extend_from_slice(&nonce.to_be_bytes());
        keccak256(preimage)
    }

    fn index_log(
        &self,
        state: &mut ChainState,
        block: u64,
        tx_hash: TxHash,
        address: Address,
        data: LogData,
    ) -> Log {
        let log_index = state.next_log_index.entry(block).or_default();
        let log = Log {
            inner: alloy_primitives::Log { address, data },
            block_hash: Some(state.blocks[block as usize].hash),
            block_number: Some(block),
            transaction_hash: Some(tx_hash),
            log_index: Some(*log_index),
            ..Default::default()
        };
        *log_index += 1;
        state.logs.push(log.clone());
        log
    }

    /// Adds a log in a fresh transaction without a receipt.
    pub fn add_log_at(&self, block: u64, address: Address, data: LogData) -> Log {
        let tx_hash = self.next_tx_hash();
        let mut state = self.state.write().unwrap();
        self.index_log(&mut state, block, tx_hash, address, data)
    }

    /// Adds a mined transaction with the given logs.
    pub fn add_receipt(
        &self,
        tx_hash: TxHash,
        block: u64,
        status: bool,
        logs: Vec<(Address, LogData)>,
    ) -> ReceiptInfo {
        let mut state = self.state.write().unwrap();
        let logs = logs
            .into_iter()
            .map(|(address, data)| self.index_log(&mut state, block, tx_hash, address, data))
            .collect();
        let receipt = ReceiptInfo {
            transaction_hash: tx_hash,
            block_hash: state.blocks[block as usize].hash,
            block_number: block,
            status,
            logs,
            ..Default::default()
        };
        state.receipts.insert(tx_hash, receipt.clone());
        receipt
    }

    /// Makes the next `count` log queries fail with a transient error.
    pub fn fail_next_log_queries(&self, count: usize) {
        self.failing_log_queries.store(count, Ordering::SeqCst);
    }

    /// Rejects log queries spanning more than `max` blocks, like a public RPC provider.
    pub fn set_max_log_range(&self, max: Option<u64>) {
        *self.max_log_range.write().unwrap() = max;
    }

    pub fn log_queries(&self) -> usize {
        self.log_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainReader for MockChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<Log>, ChainReaderError> {
        self.log_queries.fetch_add(1, Ordering::SeqCst);
        if self
            .failing_log_queries
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ChainReaderError::Transport("injected failure".into()));
        }
        if let Some(max) = *self.max_log_range.read().unwrap() &&
            query.to_block.saturating_sub(query.from_block) + 1 > max
        {
            return Err(ChainReaderError::Rpc {
                code: -32602,
                message: format!("block range exceeds {max}"),
            });
        }

        let state = self.state.read().unwrap();
        let mut logs: Vec<Log> =
            state.logs.iter().filter(|log| query.matches(log)).cloned().collect();
        logs.sort_by_key(|log| (log.block_number, log.log_index));
        Ok(logs)
    }

    async fn get_transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<ReceiptInfo>, ChainReaderError> {
        Ok(self.state.read().unwrap().receipts.get(&hash).cloned())
    }

    async fn get_block(&self, id: BlockId) -> Result<Option<BlockInfo>, ChainReaderError> {
        let state = self.state.read().unwrap();
        Ok(match id {
            BlockId::Hash(hash) => {
                state.blocks.iter().find(|block| block.hash == hash.block_hash).cloned()
            }
            BlockId::Number(BlockNumberOrTag::Number(number)) => {
                state.blocks.get(number as usize).cloned()
            }
            BlockId::Number(BlockNumberOrTag::Earliest) => state.blocks.first().cloned(),
            BlockId::Number(_) => state.blocks.last().cloned(),
        })
    }
}

type SendHandler = dyn Fn(&TransactionCall) -> Result<ReceiptInfo, ChainReaderError> + Send + Sync;

/// A [`TransactionSender`] that records every call and answers through a handler.
pub struct MockSender {
    chain_id: u64,
    calls: Mutex<Vec<TransactionCall>>,
    handler: Box<SendHandler>,
}

impl fmt::Debug for MockSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockSender").field("chain_id", &self.chain_id).finish_non_exhaustive()
    }
}

impl MockSender {
    pub fn new(
        chain_id: u64,
        handler: impl Fn(&TransactionCall) -> Result<ReceiptInfo, ChainReaderError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self { chain_id, calls: Mutex::new(Vec::new()), handler: Box::new(handler) }
    }

    pub fn calls(&self) -> Vec<TransactionCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionSender for MockSender {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn send_transaction(
        &self,
        call: TransactionCall,
    ) -> Result<ReceiptInfo, ChainReaderError> {
        let result = (self.handler)(&call);
        self.calls.lock().unwrap().push(call);
        result
    }
}

pub fn l2_to_l1_tx(position: u64) -> L2ToL1Tx {
    L2ToL1Tx {
        caller: Address::repeat_byte(0x11),
        destination: Address::repeat_byte(0x22),
        hash: U256::from_be_bytes(keccak256(position.to_be_bytes()).0),
        position: U256::from(position),
        arbBlockNum: U256::from(position + 1),
        ethBlockNum: U256::ZERO,
        timestamp: U256::from(GENESIS_TIMESTAMP),
        callvalue: U256::from(1_000),
        data: Bytes::new(),
    }
}

pub fn retryable_inputs(destination: Address) -> L1ToL2MessageInputs {
    let call_data = Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]);
    L1ToL2MessageInputs {
        destination_address: destination,
        l2_call_value: U256::from(1_000_000u64),
        l1_value: U256::from(2_000_000u64),
        max_submission_fee: U256::from(50_000u64),
        excess_fee_refund_address: Address::repeat_byte(0xe1),
        call_value_refund_address: Address::repeat_byte(0xe2),
        max_gas: U256::from(100_000u64),
        gas_price_bid: U256::from(100_000_000u64),
        call_data_length: call_data.len(),
        call_data,
    }
}

fn rpc_log(address: Address, data: LogData) -> Log {
    Log { inner: alloy_primitives::Log { address, data }, ..Default::default() }
}

/// A retryable ticket submitted on L1.
#[derive(Debug, Clone)]
pub struct RetryableFixture {
    pub l2_chain_id: u64,
    pub message_index: u64,
    pub sender: Address,
    pub base_fee_l1: U256,
    pub inputs: L1ToL2MessageInputs,
    pub origin_tx_hash: TxHash,
}

impl RetryableFixture {
    pub fn new(l2_chain_id: u64, message_index: u64) -> Self {
        Self {
            l2_chain_id,
            message_index,
            sender: Address::repeat_byte(0x5e),
            base_fee_l1: U256::from(30_000_000_000u64),
            inputs: retryable_inputs(Address::repeat_byte(0xd0)),
            origin_tx_hash: keccak256(message_index.to_be_bytes()),
        }
    }

    pub fn identity(&self) -> MessageIdentity {
        MessageIdentity {
            source_chain_id: L1_CHAIN_ID,
            destination_chain_id: self.l2_chain_id,
            sequence_number: self.message_index,
            origin_tx_hash: self.origin_tx_hash,
        }
    }

    pub fn ticket_id(&self) -> B256 {
        retryable_creation_id(
            self.l2_chain_id,
            self.message_index,
            self.sender,
            self.base_fee_l1,
            &self.inputs,
        )
    }

    pub fn tracker(&self, l2: Arc<MockChain>, origin_succeeded: bool) -> L1ToL2Message<MockChain> {
        L1ToL2Message::new(
            self.identity(),
            self.sender,
            self.base_fee_l1,
            self.inputs.encode(),
            origin_succeeded,
            l2,
            test_config(),
        )
    }

    pub fn message_delivered(&self) -> MessageDelivered {
        MessageDelivered {
            messageIndex: U256::from(self.message_index),
            beforeInboxAcc: B256::repeat_byte(0xac),
            inbox: test_network().inbox,
            kind: L1_MESSAGE_TYPE_SUBMIT_RETRYABLE,
            sender: self.sender,
            messageDataHash: keccak256(self.inputs.encode()),
            baseFeeL1: self.base_fee_l1,
            timestamp: GENESIS_TIMESTAMP,
        }
    }

    pub fn inbox_message_delivered(&self) -> InboxMessageDelivered {
        InboxMessageDelivered {
            messageNum: U256::from(self.message_index),
            data: self.inputs.encode(),
        }
    }

    /// The bridge and inbox logs of the submission, in emission order.
    pub fn l1_logs(&self) -> Vec<Log> {
        vec![
            rpc_log(test_network().bridge, self.message_delivered().encode_log_data()),
            rpc_log(test_network().inbox, self.inbox_message_delivered().encode_log_data()),
        ]
    }

    /// Mines the submission into `l1` at `block`.
    pub fn submit(&self, l1: &MockChain, block: u64, status: bool) -> ReceiptInfo {
        l1.add_receipt(
            self.origin_tx_hash,
            block,
            status,
            vec![
                (test_network().bridge, self.message_delivered().encode_log_data()),
                (test_network().inbox, self.inbox_message_delivered().encode_log_data()),
            ],
        )
    }

    /// Mines the ticket creation into `l2` at `block`.
    pub fn create_ticket(&self, l2: &MockChain, block: u64, status: bool) -> ReceiptInfo {
        let logs = if status {
            vec![(ARB_RETRYABLE_TX, TicketCreated { ticketId: self.ticket_id() }.encode_log_data())]
        } else {
            Vec::new()
        };
        l2.add_receipt(self.ticket_id(), block, status, logs)
    }

    pub fn retry_tx_hash(&self, sequence: u64) -> TxHash {
        let mut preimage = self.ticket_id().to_vec();
        preimage.extend_from_slice(&sequence.to_be_bytes());
        keccak256(preimage)
    }

    /// Mines a redemption attempt and its retry transaction into `l2` at `block`.
    pub fn schedule_redeem(&self, l2: &MockChain, block: u64, sequence: u64, success: bool) {
        let scheduled = RedeemScheduled {
            ticketId: self.ticket_id(),
            retryTxHash: self.retry_tx_hash(sequence),
            sequenceNum: sequence,
            donatedGas: 100_000,
            gasDonor: self.sender,
            maxRefund: U256::ZERO,
            submissionFeeRefund: U256::ZERO,
        };
        l2.add_receipt(
            l2.next_tx_hash(),
            block,
            true,
            vec![(ARB_RETRYABLE_TX, scheduled.encode_log_data())],
        );
        l2.add_receipt(self.retry_tx_hash(sequence), block, success, Vec::new());
    }

    pub fn extend_lifetime(&self, l2: &MockChain, block: u64, new_timeout: u64) {
        let extended =
            LifetimeExtended { ticketId: self.ticket_id(), newTimeout: U256::from(new_timeout) };
        l2.add_receipt(
            l2.next_tx_hash(),
            block,
            true,
            vec![(ARB_RETRYABLE_TX, extended.encode_log_data())],
        );
    }
}

/// A set of L2 to L1 sends and the two chains they live on.
#[derive(Debug)]
pub struct WithdrawalFixture {
    pub l1: Arc<MockChain>,
    pub l2: Arc<MockChain>,
    pub sends: Vec<L2ToL1Tx>,
}

impl WithdrawalFixture {
    /// The first L1 block the sends reference.
    pub const SEND_L1_BLOCK: u64 = 10;

    pub fn new(count: u64) -> Self {
        let l1 = Arc::new(MockChain::new(L1_CHAIN_ID));
        l1.mine_to(Self::SEND_L1_BLOCK);
        let l2 = Arc::new(MockChain::new(L2_CHAIN_ID));
        let sends = (0..count)
            .map(|position| {
                let mut send = l2_to_l1_tx(position);
                send.ethBlockNum = U256::from(Self::SEND_L1_BLOCK);
                send
            })
            .collect();
        Self { l1, l2, sends }
    }

    pub fn send_tx_hash(&self, position: u64) -> TxHash {
        keccak256([b"send".as_slice(), &position.to_be_bytes()].concat())
    }

    pub fn send_hash(&self, position: u64) -> B256 {
        B256::from(self.sends[position as usize].hash)
    }

    /// Mines every send into its own L2 block.
    pub fn send_all(&self) -> Vec<ReceiptInfo> {
        self.sends
            .iter()
            .enumerate()
            .map(|(position, send)| {
                let block = self.l2.head() + 1;
                self.l2.mine_to(block);
                self.l2.add_receipt(
                    self.send_tx_hash(position as u64),
                    block,
                    true,
                    vec![(ARB_SYS, send.encode_log_data())],
                )
            })
            .collect()
    }

    pub fn tracker(&self, position: u64) -> L2ToL1Message<MockChain, MockChain> {
        L2ToL1Message::new(
            test_network(),
            self.sends[position as usize].clone(),
            self.send_tx_hash(position),
            Arc::clone(&self.l1),
            Arc::clone(&self.l2),
            test_config(),
        )
        .unwrap()
    }

    /// The send root over the first `count` sends.
    pub fn root_of(&self, count: u64) -> B256 {
        let leaves = (0..count).map(|position| send_leaf(self.send_hash(position))).collect();
        SendTree::from_leaves(leaves).unwrap().root()
    }

    /// Posts the root over the first `count` sends to the L1 outbox.
    pub fn post_root(&self, count: u64) -> B256 {
        let root = self.root_of(count);
        self.post_root_with(count, root);
        root
    }

    /// Commits `send_root` with `send_count` in a new L2 block and posts it to the L1 outbox.
    /// Returns the L2 block hash.
    pub fn post_root_with(&self, send_count: u64, send_root: B256) -> B256 {
        let l2_block = self.l2.head() + 1;
        self.l2.mine_to(l2_block);
        self.l2.set_send_info(l2_block, send_count, send_root);
        let l2_block_hash = self.l2.block(l2_block).hash;

        let l1_block = self.l1.head() + 1;
        self.l1.mine_to(l1_block);
        self.l1.add_log_at(
            l1_block,
            test_network().outbox,
            crate::SendRootUpdated { outputRoot: send_root, l2BlockHash: l2_block_hash }
                .encode_log_data(),
        );
        l2_block_hash
    }

    /// Mines an outbox execution of `position` into L1.
    pub fn record_execution(l1: &MockChain, position: u64) -> ReceiptInfo {
        let executed = crate::OutBoxTransactionExecuted {
            to: Address::repeat_byte(0x22),
            l2Sender: Address::repeat_byte(0x11),
            zero: U256::ZERO,
            transactionIndex: U256::from(position),
        };
        let block = l1.head() + 1;
        l1.mine_to(block);
        l1.add_receipt(
            l1.next_tx_hash(),
            block,
            true,
            vec![(test_network().outbox, executed.encode_log_data())],
        )
    }
}
