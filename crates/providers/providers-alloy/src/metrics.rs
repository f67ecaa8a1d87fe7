//! Metrics for the alloy backed providers.

/// Container for metrics.
#[derive(Debug, Clone)]
pub struct Metrics;

impl Metrics {
    /// Identifier for the counter of RPC calls, labelled by method.
    pub const RPC_CALLS: &str = "ferry_providers_rpc_calls";

    /// Identifier for the counter of failed RPC calls, labelled by method.
    pub const RPC_ERRORS: &str = "ferry_providers_rpc_errors";

    /// Initializes metrics for the alloy providers.
    #[cfg(feature = "metrics")]
    pub fn init() {
        Self::describe();
    }

    /// Describes metrics used in [`ferry_providers_alloy`][crate].
    #[cfg(feature = "metrics")]
    pub fn describe() {
        metrics::describe_counter!(Self::RPC_CALLS, "Number of RPC calls");
        metrics::describe_counter!(Self::RPC_ERRORS, "Number of failed RPC calls");
    }
}
