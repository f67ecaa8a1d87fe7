//! Error types for CLI utilities.

use ferry_messages::ChainReaderError;
use thiserror::Error;
use tracing_subscriber::util::TryInitError;

/// Errors that can occur in CLI operations.
#[derive(Debug, Error)]
pub enum CliError {
    /// A numeric flag that must be positive was zero.
    #[error("--{flag} must be greater than zero")]
    ZeroValue {
        /// The offending flag.
        flag: &'static str,
    },
    /// The retry delay bounds are inverted.
    #[error("Minimum retry delay ({min_ms}ms) exceeds maximum retry delay ({max_ms}ms)")]
    InvertedRetryDelays {
        /// The minimum delay.
        min_ms: u64,
        /// The maximum delay.
        max_ms: u64,
    },
    /// A chain did not report the expected chain id.
    #[error("{endpoint} reports chain {actual}, expected {expected}")]
    UnexpectedChain {
        /// The RPC flag of the endpoint.
        endpoint: &'static str,
        /// The configured chain id.
        expected: u64,
        /// The chain id the node reported.
        actual: u64,
    },
    /// Connecting to an RPC endpoint failed.
    #[error("Failed to connect: {0}")]
    Connect(#[from] ChainReaderError),
    /// The global tracing subscriber could not be installed.
    #[error("Failed to initialize tracing: {0}")]
    Tracing(#[from] TryInitError),
    /// The log file appender could not be created.
    #[error("Failed to open log file: {0}")]
    LogFile(#[from] tracing_appender::rolling::InitError),
    /// Error initializing metrics.
    #[cfg(feature = "metrics")]
    #[error("Failed to initialize metrics: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
    /// Failed to bind the metrics listener.
    #[error("Failed to bind metrics listener: {0}")]
    Bind(#[from] std::io::Error),
}

/// Type alias for CLI results.
pub type CliResult<T> = Result<T, CliError>;
