#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod constants;
pub use constants::{
    ARB_RETRYABLE_TX, ARB_SYS, L1_MESSAGE_TYPE_ETH_DEPOSIT, L1_MESSAGE_TYPE_SUBMIT_RETRYABLE,
    RETRYABLE_HEADER_WORDS, RETRYABLE_LIFETIME_SECONDS, SUBMIT_RETRYABLE_TX_TYPE,
};

mod errors;
pub use errors::{ChainReaderError, DecodeError, MessageError, MessageResult};

mod events;
pub use events::{
    AlreadySpent, InboxMessageDelivered, L2ToL1Tx, LifetimeExtended, MessageDelivered,
    OutBoxTransactionExecuted, RedeemScheduled, SendRootUpdated, TicketCreated, UnknownRoot,
    address_topic, decode_event, decode_events, event_query, executeTransactionCall, is_event,
    redeemCall,
};

mod types;
pub use types::{
    BlockInfo, BlockRange, ChildNetwork, LogQuery, MessageFilter, MessageIdentity, ReceiptInfo,
    TransactionCall, log_position, to_u64,
};

mod traits;
pub use traits::{ChainReader, TransactionSender};
#[cfg(any(test, feature = "test-utils"))]
pub use traits::MockTransactionSender;

mod config;
pub use config::{MessageConfig, PollConfig, RetryConfig, ScannerConfig};

mod metrics;
pub use metrics::Metrics;

mod retry;
pub use retry::{RetryingReader, retry_read};

mod status;
pub use status::{L1ToL2Status, L2ToL1Status};

mod poll;
pub use poll::StatusWait;

mod scanner;
pub use scanner::{LogScanner, RetryableSubmission, ScannedEvent, sort_logs, sub_ranges};

mod retryable;
pub use retryable::{L1ToL2Message, L1ToL2MessageInputs, retryable_creation_id};

mod withdrawal;
pub use withdrawal::{L2ToL1Message, SendTree, WithdrawalProof, send_leaf, verify_proof};

mod factory;
pub use factory::MessageFactory;

#[cfg(any(test, feature = "test-utils"))]
mod test_util;
#[cfg(any(test, feature = "test-utils"))]
pub use test_util::{
    L1_CHAIN_ID, L2_CHAIN_ID, MockChain, MockSender, RetryableFixture, WithdrawalFixture,
    l2_to_l1_tx, retryable_inputs, test_config, test_network,
};
