//! Metrics for message tracking.

/// Container for metrics.
#[derive(Debug, Clone)]
pub struct Metrics;

impl Metrics {
    /// Identifier for the counter of log scanner sub-range queries.
    pub const SCAN_QUERIES: &str = "ferry_messages_scan_queries";

    /// Identifier for the counter of log scanner sub-range failures.
    pub const SCAN_FAILURES: &str = "ferry_messages_scan_failures";

    /// Identifier for the histogram of logs returned per scan.
    pub const SCAN_LOGS: &str = "ferry_messages_scan_logs";

    /// Identifier for the counter of retried chain reads.
    pub const CHAIN_READ_RETRIES: &str = "ferry_messages_chain_read_retries";

    /// Identifier for the counter of status reads, labelled by direction and result.
    pub const STATUS_READS: &str = "ferry_messages_status_reads";

    /// Identifier for the counter of submitted completion transactions.
    pub const COMPLETIONS: &str = "ferry_messages_completions";

    /// Initializes metrics for message tracking.
    ///
    /// This does two things:
    /// * Describes various metrics.
    /// * Initializes metrics to 0 so they can be queried immediately.
    #[cfg(feature = "metrics")]
    pub fn init() {
        Self::describe();
        Self::zero();
    }

    /// Describes metrics used in [`ferry_messages`][crate].
    #[cfg(feature = "metrics")]
    pub fn describe() {
        metrics::describe_counter!(Self::SCAN_QUERIES, "Number of log scanner sub-range queries");
        metrics::describe_counter!(Self::SCAN_FAILURES, "Number of failed log scans");
        metrics::describe_histogram!(Self::SCAN_LOGS, "Number of logs returned by a scan");
        metrics::describe_counter!(Self::CHAIN_READ_RETRIES, "Number of retried chain reads");
        metrics::describe_counter!(Self::STATUS_READS, "Number of message status reads");
        metrics::describe_counter!(Self::COMPLETIONS, "Number of redeem and execute submissions");
    }

    /// Initializes metrics to `0` so they can be queried immediately.
    #[cfg(feature = "metrics")]
    pub fn zero() {
        metrics::counter!(Self::SCAN_QUERIES).absolute(0);
        metrics::counter!(Self::SCAN_FAILURES).absolute(0);
        metrics::counter!(Self::CHAIN_READ_RETRIES).absolute(0);
        metrics::counter!(Self::COMPLETIONS, "action" => "redeem").absolute(0);
        metrics::counter!(Self::COMPLETIONS, "action" => "execute").absolute(0);
    }
}
