//! Configuration for scanning, retrying and polling.

use core::time::Duration;

/// Configuration for all message operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct MessageConfig {
    /// Log scanner configuration.
    pub scanner: ScannerConfig,
    /// Chain read retry configuration.
    pub retry: RetryConfig,
    /// Status polling configuration.
    pub poll: PollConfig,
}

/// Configuration for the log scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct ScannerConfig {
    /// The largest block span a single `eth_getLogs` query may cover.
    pub max_block_range: u64,
    /// How many sub-range queries may be in flight at once.
    pub concurrency: usize,
}

impl ScannerConfig {
    /// The default maximum block span of a query.
    pub const DEFAULT_MAX_BLOCK_RANGE: u64 = 10_000;
    /// The default number of concurrent sub-range queries.
    pub const DEFAULT_CONCURRENCY: usize = 4;
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_block_range: Self::DEFAULT_MAX_BLOCK_RANGE,
            concurrency: Self::DEFAULT_CONCURRENCY,
        }
    }
}

/// Exponential backoff for transient chain read failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct RetryConfig {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: usize,
    /// Delay before the first retry, in milliseconds.
    pub min_delay_ms: u64,
    /// Upper bound of the delay between retries, in milliseconds.
    pub max_delay_ms: u64,
}

impl RetryConfig {
    /// Returns the delay before the first retry.
    pub const fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    /// Returns the upper bound of the delay between retries.
    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 3, min_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

/// Configuration of the status poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct PollConfig {
    /// Delay between status reads, in milliseconds.
    pub interval_ms: u64,
}

impl PollConfig {
    /// Returns the delay between status reads.
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_ms: 1_000 }
    }
}
