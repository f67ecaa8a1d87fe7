//! The L2 to L1 withdrawal tracker.

use super::{SendTree, send_leaf};
use crate::{
    ARB_SYS, AlreadySpent, BlockInfo, BlockRange, ChainReader, ChainReaderError, ChildNetwork,
    L2ToL1Status, L2ToL1Tx, LogScanner, MessageConfig, MessageError, MessageIdentity,
    MessageResult, OutBoxTransactionExecuted, ReceiptInfo, RetryingReader, ScannedEvent,
    SendRootUpdated, StatusWait, TransactionCall, TransactionSender, UnknownRoot, decode_events,
    event_query, executeTransactionCall, log_position, poll::poll_until, to_u64,
};
use alloy_eips::{BlockId, BlockNumberOrTag};
use alloy_primitives::{B256, U256};
use alloy_sol_types::{SolCall, SolError};
use core::time::Duration;
use std::{
    collections::BTreeMap,
    sync::{Arc, OnceLock},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The Merkle inclusion proof of a withdrawal in a posted send root.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct WithdrawalProof {
    /// The send root the proof is built against.
    pub send_root: B256,
    /// The number of sends committed by the root.
    pub send_count: u64,
    /// The position of the withdrawal in the send tree.
    pub leaf_index: u64,
    /// Sibling hashes from the leaf up to the root.
    pub proof: Vec<B256>,
}

/// A send root posted on L1 that covers the tracked withdrawal.
#[derive(Debug, Clone)]
struct ConfirmedRoot {
    send_root: B256,
    l2_block: BlockInfo,
}

/// Tracks a single L2 to L1 message from its send on L2 to its execution on L1.
#[derive(Debug)]
pub struct L2ToL1Message<L1, L2> {
    identity: MessageIdentity,
    event: L2ToL1Tx,
    network: ChildNetwork,
    l1_reader: Arc<L1>,
    l2_reader: Arc<L2>,
    config: MessageConfig,
    proof: OnceLock<WithdrawalProof>,
}

impl<L1: ChainReader, L2: ChainReader> L2ToL1Message<L1, L2> {
    /// Creates a tracker for a decoded `L2ToL1Tx` sent by `origin_tx_hash`.
    pub fn new(
        network: ChildNetwork,
        event: L2ToL1Tx,
        origin_tx_hash: B256,
        l1_reader: Arc<L1>,
        l2_reader: Arc<L2>,
        config: MessageConfig,
    ) -> MessageResult<Self> {
        let identity = MessageIdentity {
            source_chain_id: network.chain_id,
            destination_chain_id: network.parent_chain_id,
            sequence_number: to_u64(event.position)?,
            origin_tx_hash,
        };
        Ok(Self {
            identity,
            event,
            network,
            l1_reader,
            l2_reader,
            config,
            proof: OnceLock::new(),
        })
    }

    /// Creates a tracker from a scanned `L2ToL1Tx` log.
    pub fn from_scanned(
        network: ChildNetwork,
        sent: ScannedEvent<L2ToL1Tx>,
        l1_reader: Arc<L1>,
        l2_reader: Arc<L2>,
        config: MessageConfig,
    ) -> MessageResult<Self> {
        let (_, _, origin_tx_hash) = log_position(&sent.log)?;
        Self::new(network, sent.event, origin_tx_hash, l1_reader, l2_reader, config)
    }

    /// Returns the identity of the message.
    pub const fn identity(&self) -> &MessageIdentity {
        &self.identity
    }

    /// Returns the position of the message in the send tree.
    pub const fn position(&self) -> u64 {
        self.identity.sequence_number
    }

    /// Returns the decoded send event.
    pub const fn event(&self) -> &L2ToL1Tx {
        &self.event
    }

    fn l1_range(&self, known_head: Option<u64>) -> MessageResult<BlockRange> {
        Ok(BlockRange {
            from_block: to_u64(self.event.ethBlockNum)?,
            to_block: known_head.map_or(BlockNumberOrTag::Latest, BlockNumberOrTag::Number),
        })
    }

    /// Reads the current status of the withdrawal.
    ///
    /// `known_head` pins the L1 block the outbox is read at. Without it the latest block is used.
    pub async fn status(&self, known_head: Option<u64>) -> MessageResult<L2ToL1Status> {
        let (status, _) = self.resolve(known_head).await?;
        debug!(
            target: "messages::withdrawal",
            message = %self.identity,
            %status,
            "Read withdrawal status"
        );
        #[cfg(feature = "metrics")]
        metrics::counter!(
            crate::Metrics::STATUS_READS,
            "direction" => "l2_to_l1",
            "status" => status.to_string()
        )
        .increment(1);
        Ok(status)
    }

    async fn resolve(
        &self,
        known_head: Option<u64>,
    ) -> MessageResult<(L2ToL1Status, Option<ConfirmedRoot>)> {
        if !self.send_log_exists().await? {
            return Ok((L2ToL1Status::NotFound, None));
        }
        let Some(root) = self.confirming_root(known_head).await? else {
            return Ok((L2ToL1Status::Unconfirmed, None));
        };
        let status = if self.is_executed(known_head).await? {
            L2ToL1Status::Executed
        } else {
            L2ToL1Status::Confirmed
        };
        Ok((status, Some(root)))
    }

    async fn send_log_exists(&self) -> MessageResult<bool> {
        let reader = RetryingReader::new(self.l2_reader.as_ref(), self.config.retry);
        let Some(receipt) = reader.receipt(self.identity.origin_tx_hash).await? else {
            return Ok(false);
        };
        let sends = decode_events::<L2ToL1Tx>(&receipt.logs, ARB_SYS)?;
        Ok(sends.iter().any(|(sent, _)| sent.position == self.event.position))
    }

    /// Finds the newest send root on L1 whose L2 block is known, and returns it if it covers the
    /// message.
    async fn confirming_root(
        &self,
        known_head: Option<u64>,
    ) -> MessageResult<Option<ConfirmedRoot>> {
        let scanner =
            LogScanner::new(self.l1_reader.as_ref(), self.config.scanner, self.config.retry);
        let updates = scanner
            .scan_events::<SendRootUpdated>(
                event_query::<SendRootUpdated>(self.network.outbox),
                self.l1_range(known_head)?,
            )
            .await?;

        let l2 = RetryingReader::new(self.l2_reader.as_ref(), self.config.retry);
        for update in updates.iter().rev() {
            let l2_block_hash = update.event.l2BlockHash;
            let Some(l2_block) = l2.maybe_block(BlockId::hash(l2_block_hash)).await? else {
                debug!(
                    target: "messages::withdrawal",
                    %l2_block_hash,
                    "Send root references an unknown L2 block, trying an older one"
                );
                continue;
            };
            let covered = l2_block.send_count() > self.position();
            debug!(
                target: "messages::withdrawal",
                send_root = %update.event.outputRoot,
                send_count = l2_block.send_count(),
                position = self.position(),
                covered,
                "Found latest send root"
            );
            return Ok(covered
                .then(|| ConfirmedRoot { send_root: update.event.outputRoot, l2_block }));
        }
        Ok(None)
    }

    async fn is_executed(&self, known_head: Option<u64>) -> MessageResult<bool> {
        let scanner =
            LogScanner::new(self.l1_reader.as_ref(), self.config.scanner, self.config.retry);
        let executions = scanner
            .scan_events::<OutBoxTransactionExecuted>(
                event_query::<OutBoxTransactionExecuted>(self.network.outbox),
                self.l1_range(known_head)?,
            )
            .await?;
        Ok(executions
            .iter()
            .any(|executed| executed.event.transactionIndex == self.event.position))
    }

    /// Returns the Merkle proof of the withdrawal, building it on first use.
    ///
    /// Fails with [`MessageError::ProofNotAvailable`] before the message is confirmed. Building
    /// the proof replays every send up to the confirming root and is expensive, so the result is
    /// cached until [`Self::clear_proof`] is called.
    pub async fn get_withdrawal_proof(&self) -> MessageResult<&WithdrawalProof> {
        if let Some(proof) = self.proof.get() {
            return Ok(proof);
        }

        let (status, root) = self.resolve(None).await?;
        let root = match (status, root) {
            (L2ToL1Status::Confirmed | L2ToL1Status::Executed, Some(root)) => root,
            _ => return Err(MessageError::ProofNotAvailable { status }),
        };
        let proof = self.build_proof(root).await?;
        Ok(self.proof.get_or_init(|| proof))
    }

    async fn build_proof(&self, root: ConfirmedRoot) -> MessageResult<WithdrawalProof> {
        let send_count = root.l2_block.send_count();
        let scanner =
            LogScanner::new(self.l2_reader.as_ref(), self.config.scanner, self.config.retry);
        let sends = scanner
            .scan_events::<L2ToL1Tx>(
                event_query::<L2ToL1Tx>(ARB_SYS),
                BlockRange::between(0, root.l2_block.number),
            )
            .await?;

        // Only sends committed by the root count. Positions are unique, so the map is dense
        // exactly when every committed send was found.
        let mut hashes = BTreeMap::new();
        for sent in &sends {
            let position = to_u64(sent.event.position)?;
            if position < send_count {
                hashes.insert(position, B256::from(sent.event.hash));
            }
        }
        let found = hashes.len() as u64;
        if found != send_count {
            return Err(MessageError::IncompleteSendHistory { expected: send_count, found });
        }
        let leaves: Vec<B256> = hashes.into_values().map(send_leaf).collect();

        let tree = SendTree::from_leaves(leaves).ok_or(MessageError::IncompleteSendHistory {
            expected: send_count,
            found: 0,
        })?;
        if tree.root() != root.send_root {
            return Err(MessageError::RootMismatch {
                expected: root.send_root,
                computed: tree.root(),
            });
        }
        let proof = tree.proof(self.position() as usize).ok_or(
            MessageError::IncompleteSendHistory {
                expected: self.position() + 1,
                found: send_count,
            },
        )?;

        debug!(
            target: "messages::withdrawal",
            send_root = %root.send_root,
            send_count,
            depth = proof.len(),
            "Built withdrawal proof"
        );
        Ok(WithdrawalProof {
            send_root: root.send_root,
            send_count,
            leaf_index: self.position(),
            proof,
        })
    }

    /// Drops the cached proof so the next request rebuilds it.
    pub fn clear_proof(&mut self) {
        self.proof.take();
    }

    /// Executes the withdrawal on L1 through `sender`.
    ///
    /// The status is checked before anything is submitted. An outbox that no longer knows the
    /// proof's send root yields [`MessageError::ProofStale`] and clears the cached proof.
    pub async fn execute<S: TransactionSender + ?Sized>(
        &mut self,
        sender: &S,
    ) -> MessageResult<ReceiptInfo> {
        let expected = self.network.parent_chain_id;
        if sender.chain_id() != expected {
            return Err(MessageError::WrongChain { expected, actual: sender.chain_id() });
        }

        let position = self.position();
        match self.status(None).await? {
            L2ToL1Status::Confirmed => {}
            L2ToL1Status::Executed => return Err(MessageError::AlreadyExecuted { position }),
            status @ (L2ToL1Status::NotFound | L2ToL1Status::Unconfirmed) => {
                return Err(MessageError::ProofNotAvailable { status });
            }
        }

        let proof = self.get_withdrawal_proof().await?.clone();
        let call = TransactionCall {
            to: self.network.outbox,
            data: executeTransactionCall {
                proof: proof.proof.clone(),
                index: U256::from(position),
                l2Sender: self.event.caller,
                to: self.event.destination,
                l2Block: self.event.arbBlockNum,
                l1Block: self.event.ethBlockNum,
                l2Timestamp: self.event.timestamp,
                value: self.event.callvalue,
                data: self.event.data.clone(),
            }
            .abi_encode()
            .into(),
            value: U256::ZERO,
        };

        let receipt = match sender.send_transaction(call).await {
            Ok(receipt) => receipt,
            Err(err) => return Err(self.classify_revert(err, proof.send_root)),
        };
        if !receipt.status {
            return Err(MessageError::ExecutionReverted { tx_hash: receipt.transaction_hash });
        }

        info!(
            target: "messages::withdrawal",
            position,
            tx_hash = %receipt.transaction_hash,
            "Executed withdrawal"
        );
        #[cfg(feature = "metrics")]
        metrics::counter!(crate::Metrics::COMPLETIONS, "action" => "execute").increment(1);
        Ok(receipt)
    }

    /// Maps a rejected execution onto the outbox's custom errors.
    fn classify_revert(&mut self, err: ChainReaderError, send_root: B256) -> MessageError {
        if let Some(revert) = err.revert_data() {
            if revert.starts_with(&UnknownRoot::SELECTOR) {
                warn!(
                    target: "messages::withdrawal",
                    %send_root,
                    "Outbox rejected the send root, clearing proof"
                );
                self.clear_proof();
                return MessageError::ProofStale { root: send_root };
            }
            if revert.starts_with(&AlreadySpent::SELECTOR) {
                return MessageError::AlreadyExecuted { position: self.position() };
            }
        }
        err.into()
    }

    /// Polls the withdrawal status until it can be executed, `timeout` elapses or `cancel`
    /// fires.
    ///
    /// The wait settles at [`L2ToL1Status::Confirmed`] or [`L2ToL1Status::Executed`].
    pub async fn wait_until_ready_to_execute(
        &self,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> MessageResult<StatusWait<L2ToL1Status>> {
        poll_until(
            self.config.poll.interval(),
            timeout,
            cancel,
            || self.status(None),
            L2ToL1Status::is_confirmed,
        )
        .await
    }
}
