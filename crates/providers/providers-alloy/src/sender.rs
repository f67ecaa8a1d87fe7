//! Contains the [`AlloyTransactionSender`].

use crate::{pending_error, transport_error};
use alloy_primitives::TxKind;
use alloy_provider::Provider;
use alloy_rpc_types_eth::{TransactionInput, TransactionRequest};
use async_trait::async_trait;
use ferry_messages::{ChainReaderError, ReceiptInfo, TransactionCall, TransactionSender};
use tracing::debug;

/// Submits transactions through an alloy [`Provider`] that signs and fills them.
#[derive(Debug, Clone)]
pub struct AlloyTransactionSender<P> {
    provider: P,
    chain_id: u64,
}

impl<P: Provider> AlloyTransactionSender<P> {
    /// Creates a sender over `provider`, bound to `chain_id`.
    pub const fn new(provider: P, chain_id: u64) -> Self {
        Self { provider, chain_id }
    }

    /// Creates a sender bound to the chain id `provider` reports.
    pub async fn connect(provider: P) -> Result<Self, ChainReaderError> {
        let chain_id = provider.get_chain_id().await.map_err(transport_error)?;
        Ok(Self::new(provider, chain_id))
    }

    /// Returns the inner provider.
    pub const fn provider(&self) -> &P {
        &self.provider
    }
}

/// Builds the request submitted for `call`.
pub fn transaction_request(call: TransactionCall) -> TransactionRequest {
    TransactionRequest {
        to: Some(TxKind::Call(call.to)),
        input: TransactionInput::new(call.data),
        value: Some(call.value),
        ..Default::default()
    }
}

#[async_trait]
impl<P: Provider> TransactionSender for AlloyTransactionSender<P> {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn send_transaction(
        &self,
        call: TransactionCall,
    ) -> Result<ReceiptInfo, ChainReaderError> {
        let to = call.to;
        let pending = self
            .provider
            .send_transaction(transaction_request(call))
            .await
            .map_err(transport_error)?;
        let tx_hash = *pending.tx_hash();
        debug!(target: "providers::alloy", %to, %tx_hash, "Submitted transaction");

        let receipt = pending.get_receipt().await.map_err(pending_error)?;
        Ok(receipt.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, U256};

    #[test]
    fn test_transaction_request_targets_the_call() {
        let call = TransactionCall {
            to: Address::repeat_byte(0x6e),
            data: Bytes::from_static(&[1, 2, 3, 4]),
            value: U256::from(5),
        };

        let request = transaction_request(call.clone());
        assert_eq!(request.to, Some(TxKind::Call(call.to)));
        assert_eq!(request.input.input(), Some(&call.data));
        assert_eq!(request.value, Some(U256::from(5)));
        assert_eq!(request.from, None);
    }
}
