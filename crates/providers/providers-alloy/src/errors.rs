//! Conversion of alloy transport errors into [`ChainReaderError`]s.

use alloy_json_rpc::RpcError;
use alloy_provider::PendingTransactionError;
use alloy_transport::TransportError;
use ferry_messages::ChainReaderError;

/// Maps a [`TransportError`] onto a [`ChainReaderError`].
///
/// JSON-RPC error responses keep their code and message, or become
/// [`ChainReaderError::Reverted`] when they carry revert data. Everything else is a transport
/// failure.
pub fn transport_error(err: TransportError) -> ChainReaderError {
    match err {
        RpcError::ErrorResp(payload) => match payload.as_revert_data() {
            Some(data) => ChainReaderError::Reverted(data),
            None => {
                ChainReaderError::Rpc { code: payload.code, message: payload.message.into_owned() }
            }
        },
        other => ChainReaderError::Transport(other.to_string()),
    }
}

/// Maps a failure while waiting for a transaction receipt.
pub fn pending_error(err: PendingTransactionError) -> ChainReaderError {
    match err {
        PendingTransactionError::TransportError(err) => transport_error(err),
        other => ChainReaderError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_json_rpc::ErrorPayload;
    use alloy_primitives::Bytes;
    use alloy_transport::TransportErrorKind;
    use rstest::rstest;
    use serde_json::value::RawValue;

    fn error_resp(code: i64, message: &'static str, data: Option<&str>) -> TransportError {
        RpcError::ErrorResp(ErrorPayload {
            code,
            message: message.into(),
            data: data.map(|data| RawValue::from_string(data.to_string()).unwrap()),
        })
    }

    #[test]
    fn test_revert_data_is_extracted() {
        let err = error_resp(3, "execution reverted", Some("\"0xdeadbeef\""));
        assert_eq!(
            transport_error(err),
            ChainReaderError::Reverted(Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]))
        );
    }

    #[rstest]
    #[case::rate_limited(429, true)]
    #[case::limit_exceeded(-32005, true)]
    #[case::internal(-32603, true)]
    #[case::invalid_params(-32602, false)]
    fn test_rpc_errors_keep_their_code(#[case] code: i64, #[case] retryable: bool) {
        let mapped = transport_error(error_resp(code, "nope", None));
        assert_eq!(mapped, ChainReaderError::Rpc { code, message: "nope".to_string() });
        assert_eq!(mapped.is_retryable(), retryable);
    }

    #[test]
    fn test_transport_failures_are_retryable() {
        let mapped = transport_error(TransportErrorKind::custom_str("connection reset"));
        assert!(matches!(mapped, ChainReaderError::Transport(_)));
        assert!(mapped.is_retryable());
    }
}
