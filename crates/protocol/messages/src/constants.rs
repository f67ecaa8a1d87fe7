//! Constants for the two-layer bridge protocol.

use alloy_primitives::{Address, address};

/// The `ArbSys` precompile on L2, emitter of [`L2ToL1Tx`](crate::L2ToL1Tx).
pub const ARB_SYS: Address = address!("0x0000000000000000000000000000000000000064");

/// The `ArbRetryableTx` precompile on L2, which owns retryable tickets.
pub const ARB_RETRYABLE_TX: Address = address!("0x000000000000000000000000000000000000006e");

/// The default lifetime of a retryable ticket before it expires (in seconds).
pub const RETRYABLE_LIFETIME_SECONDS: u64 = 7 * 24 * 60 * 60;

/// The L1 message kind for a retryable ticket submission.
pub const L1_MESSAGE_TYPE_SUBMIT_RETRYABLE: u8 = 9;

/// The L1 message kind for a plain ether deposit.
pub const L1_MESSAGE_TYPE_ETH_DEPOSIT: u8 = 12;

/// The EIP-2718 type byte of the L2 transaction that creates a retryable ticket.
pub const SUBMIT_RETRYABLE_TX_TYPE: u8 = 0x69;

/// Number of 32 byte words preceding the call data in a retryable submission payload.
pub const RETRYABLE_HEADER_WORDS: usize = 9;
