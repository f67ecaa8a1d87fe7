//! Retryable submission payload decoding and the ticket id derivation.

use crate::{DecodeError, RETRYABLE_HEADER_WORDS, SUBMIT_RETRYABLE_TX_TYPE};
use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use alloy_rlp::{Encodable, Header};

const WORD: usize = 32;
const HEADER_LEN: usize = RETRYABLE_HEADER_WORDS * WORD;

/// The parameters of a retryable ticket, as packed into `InboxMessageDelivered.data`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct L1ToL2MessageInputs {
    /// The L2 call target.
    pub destination_address: Address,
    /// The value passed to the L2 call.
    pub l2_call_value: U256,
    /// The value deposited on L1 to fund the ticket.
    pub l1_value: U256,
    /// The maximum submission fee paid for the ticket.
    pub max_submission_fee: U256,
    /// Receives the unused submission fee and gas.
    pub excess_fee_refund_address: Address,
    /// Receives the call value if the ticket expires or is cancelled.
    pub call_value_refund_address: Address,
    /// The gas limit of the L2 call.
    pub max_gas: U256,
    /// The maximum fee per gas of the L2 call.
    pub gas_price_bid: U256,
    /// The length of [`Self::call_data`].
    pub call_data_length: usize,
    /// The L2 call data.
    pub call_data: Bytes,
}

impl L1ToL2MessageInputs {
    /// Decodes the packed submission payload.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < HEADER_LEN {
            return Err(DecodeError::RetryableData { expected: HEADER_LEN, actual: data.len() });
        }

        let word = |index: usize| B256::from_slice(&data[index * WORD..(index + 1) * WORD]);
        let uint = |index: usize| U256::from_be_bytes(word(index).0);
        let address = |index: usize| {
            let word = word(index);
            if word[..12].iter().any(|byte| *byte != 0) {
                return Err(DecodeError::DirtyAddressWord(word));
            }
            Ok(Address::from_word(word))
        };

        let call_data_length = usize::try_from(uint(8)).map_err(|_| DecodeError::Overflow)?;
        let call_data = &data[HEADER_LEN..];
        if call_data.len() != call_data_length {
            return Err(DecodeError::RetryableData {
                expected: HEADER_LEN.saturating_add(call_data_length),
                actual: data.len(),
            });
        }

        Ok(Self {
            destination_address: address(0)?,
            l2_call_value: uint(1),
            l1_value: uint(2),
            max_submission_fee: uint(3),
            excess_fee_refund_address: address(4)?,
            call_value_refund_address: address(5)?,
            max_gas: uint(6),
            gas_price_bid: uint(7),
            call_data_length,
            call_data: Bytes::copy_from_slice(call_data),
        })
    }

    /// Packs the inputs into the submission payload layout.
    pub fn encode(&self) -> Bytes {
        let mut out = Vec::with_capacity(HEADER_LEN + self.call_data.len());
        out.extend_from_slice(self.destination_address.into_word().as_slice());
        out.extend_from_slice(&self.l2_call_value.to_be_bytes::<32>());
        out.extend_from_slice(&self.l1_value.to_be_bytes::<32>());
        out.extend_from_slice(&self.max_submission_fee.to_be_bytes::<32>());
        out.extend_from_slice(self.excess_fee_refund_address.into_word().as_slice());
        out.extend_from_slice(self.call_value_refund_address.into_word().as_slice());
        out.extend_from_slice(&self.max_gas.to_be_bytes::<32>());
        out.extend_from_slice(&self.gas_price_bid.to_be_bytes::<32>());
        out.extend_from_slice(&U256::from(self.call_data.len()).to_be_bytes::<32>());
        out.extend_from_slice(&self.call_data);
        out.into()
    }
}

/// Derives the id of the L2 transaction that creates a retryable ticket.
///
/// `sender` is the sender recorded by the bridge, which is already aliased for contracts.
pub fn retryable_creation_id(
    l2_chain_id: u64,
    message_index: u64,
    sender: Address,
    base_fee_l1: U256,
    inputs: &L1ToL2MessageInputs,
) -> B256 {
    let chain_id = U256::from(l2_chain_id);
    let request_id = B256::from(U256::from(message_index));
    let destination = if inputs.destination_address.is_zero() {
        Bytes::new()
    } else {
        Bytes::copy_from_slice(inputs.destination_address.as_slice())
    };

    let fields: [&dyn Encodable; 13] = [
        &chain_id,
        &request_id,
        &sender,
        &base_fee_l1,
        &inputs.l1_value,
        &inputs.gas_price_bid,
        &inputs.max_gas,
        &destination,
        &inputs.l2_call_value,
        &inputs.call_value_refund_address,
        &inputs.max_submission_fee,
        &inputs.excess_fee_refund_address,
        &inputs.call_data,
    ];
    let payload_length = fields.iter().map(|field| field.length()).sum();

    let mut out =
        Vec::with_capacity(1 + alloy_rlp::length_of_length(payload_length) + payload_length);
    out.push(SUBMIT_RETRYABLE_TX_TYPE);
    Header { list: true, payload_length }.encode(&mut out);
    for field in fields {
        field.encode(&mut out);
    }
    keccak256(out)
}
