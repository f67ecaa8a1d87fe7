//! Flags that configure message tracking.

use crate::{CliError, CliResult};
use alloy_primitives::Address;
use clap::Args;
use ferry_messages::{
    ChainReader, ChildNetwork, MessageConfig, PollConfig, RetryConfig, ScannerConfig,
};
use ferry_providers_alloy::AlloyChainReader;
use tracing::info;
use url::Url;

/// Log scanning, retry and polling flags.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct MessageArgs {
    /// The largest block span of a single log query.
    #[arg(
        long = "scan.max-block-range",
        default_value_t = ScannerConfig::DEFAULT_MAX_BLOCK_RANGE,
        env = "FERRY_SCAN_MAX_BLOCK_RANGE"
    )]
    pub max_block_range: u64,
    /// How many log queries may be in flight at once.
    #[arg(
        long = "scan.concurrency",
        default_value_t = ScannerConfig::DEFAULT_CONCURRENCY,
        env = "FERRY_SCAN_CONCURRENCY"
    )]
    pub scan_concurrency: usize,
    /// Retries of a failed chain read.
    #[arg(
        long = "retry.max-retries",
        default_value_t = RetryConfig::default().max_retries,
        env = "FERRY_RETRY_MAX_RETRIES"
    )]
    pub max_retries: usize,
    /// Delay before the first retry, in milliseconds.
    #[arg(
        long = "retry.min-delay-ms",
        default_value_t = RetryConfig::default().min_delay_ms,
        env = "FERRY_RETRY_MIN_DELAY_MS"
    )]
    pub retry_min_delay_ms: u64,
    /// Upper bound of the delay between retries, in milliseconds.
    #[arg(
        long = "retry.max-delay-ms",
        default_value_t = RetryConfig::default().max_delay_ms,
        env = "FERRY_RETRY_MAX_DELAY_MS"
    )]
    pub retry_max_delay_ms: u64,
    /// Delay between status reads while waiting, in milliseconds.
    #[arg(
        long = "poll.interval-ms",
        default_value_t = PollConfig::default().interval_ms,
        env = "FERRY_POLL_INTERVAL_MS"
    )]
    pub poll_interval_ms: u64,
}

impl Default for MessageArgs {
    fn default() -> Self {
        let config = MessageConfig::default();
        Self {
            max_block_range: config.scanner.max_block_range,
            scan_concurrency: config.scanner.concurrency,
            max_retries: config.retry.max_retries,
            retry_min_delay_ms: config.retry.min_delay_ms,
            retry_max_delay_ms: config.retry.max_delay_ms,
            poll_interval_ms: config.poll.interval_ms,
        }
    }
}

impl MessageArgs {
    /// Validates the flags and builds the [`MessageConfig`].
    pub fn config(&self) -> CliResult<MessageConfig> {
        if self.max_block_range == 0 {
            return Err(CliError::ZeroValue { flag: "scan.max-block-range" });
        }
        if self.scan_concurrency == 0 {
            return Err(CliError::ZeroValue { flag: "scan.concurrency" });
        }
        if self.poll_interval_ms == 0 {
            return Err(CliError::ZeroValue { flag: "poll.interval-ms" });
        }
        if self.retry_min_delay_ms > self.retry_max_delay_ms {
            return Err(CliError::InvertedRetryDelays {
                min_ms: self.retry_min_delay_ms,
                max_ms: self.retry_max_delay_ms,
            });
        }

        Ok(MessageConfig {
            scanner: ScannerConfig {
                max_block_range: self.max_block_range,
                concurrency: self.scan_concurrency,
            },
            retry: RetryConfig {
                max_retries: self.max_retries,
                min_delay_ms: self.retry_min_delay_ms,
                max_delay_ms: self.retry_max_delay_ms,
            },
            poll: PollConfig { interval_ms: self.poll_interval_ms },
        })
    }
}

/// RPC endpoints and bridge contracts of a parent and child chain pair.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct NetworkArgs {
    /// The parent chain (L1) RPC endpoint.
    #[arg(long = "l1.rpc", env = "FERRY_L1_RPC")]
    pub l1_rpc: Url,
    /// The child chain (L2) RPC endpoint.
    #[arg(long = "l2.rpc", env = "FERRY_L2_RPC")]
    pub l2_rpc: Url,
    /// The expected child chain id. Checked against the L2 endpoint when set.
    #[arg(long = "l2.chain-id", env = "FERRY_L2_CHAIN_ID")]
    pub l2_chain_id: Option<u64>,
    /// The `Bridge` contract on L1.
    #[arg(long = "bridge", env = "FERRY_BRIDGE")]
    pub bridge: Address,
    /// The `Inbox` contract on L1.
    #[arg(long = "inbox", env = "FERRY_INBOX")]
    pub inbox: Address,
    /// The `Outbox` contract on L1.
    #[arg(long = "outbox", env = "FERRY_OUTBOX")]
    pub outbox: Address,
    /// Number of block headers cached per endpoint.
    #[arg(long = "rpc.cache-size", default_value_t = 1024, env = "FERRY_RPC_CACHE_SIZE")]
    pub cache_size: usize,
}

/// Chain readers for both sides of a bridge and the addresses tying them together.
#[derive(Debug, Clone)]
pub struct ConnectedNetwork {
    /// The bridge description.
    pub network: ChildNetwork,
    /// The L1 reader.
    pub l1: AlloyChainReader,
    /// The L2 reader.
    pub l2: AlloyChainReader,
}

impl NetworkArgs {
    /// Builds the [`ChildNetwork`] for the given chain ids.
    pub const fn network(&self, chain_id: u64, parent_chain_id: u64) -> ChildNetwork {
        ChildNetwork {
            chain_id,
            parent_chain_id,
            bridge: self.bridge,
            inbox: self.inbox,
            outbox: self.outbox,
        }
    }

    /// Connects to both endpoints and reads their chain ids.
    pub async fn connect(&self) -> CliResult<ConnectedNetwork> {
        let l1 = AlloyChainReader::connect(self.l1_rpc.clone(), self.cache_size).await?;
        let l2 = AlloyChainReader::connect(self.l2_rpc.clone(), self.cache_size).await?;
        if let Some(expected) = self.l2_chain_id &&
            expected != l2.chain_id()
        {
            return Err(CliError::UnexpectedChain {
                endpoint: "l2.rpc",
                expected,
                actual: l2.chain_id(),
            });
        }

        let network = self.network(l2.chain_id(), l1.chain_id());
        info!(
            target: "cli",
            l1_chain_id = network.parent_chain_id,
            l2_chain_id = network.chain_id,
            "Connected to bridge endpoints"
        );
        Ok(ConnectedNetwork { network, l1, l2 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rstest::rstest;

    #[derive(Parser, Debug, Clone)]
    #[command(about = "Mock command")]
    struct MockCommand {
        #[clap(flatten)]
        pub messages: MessageArgs,
    }

    #[derive(Parser, Debug, Clone)]
    #[command(about = "Mock command")]
    struct MockNetworkCommand {
        #[clap(flatten)]
        pub network: NetworkArgs,
    }

    #[test]
    fn test_defaults_match_message_config() {
        let args = MockCommand::parse_from(["test"]).messages;
        assert_eq!(args, MessageArgs::default());
        assert_eq!(args.config().unwrap(), MessageConfig::default());
    }

    #[test]
    fn test_flags_build_config() {
        let args = MockCommand::parse_from([
            "test",
            "--scan.max-block-range",
            "500",
            "--scan.concurrency",
            "8",
            "--retry.max-retries",
            "0",
            "--poll.interval-ms",
            "250",
        ])
        .messages;

        let config = args.config().unwrap();
        assert_eq!(config.scanner, ScannerConfig { max_block_range: 500, concurrency: 8 });
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.poll.interval_ms, 250);
    }

    #[rstest]
    #[case::block_range("--scan.max-block-range", "scan.max-block-range")]
    #[case::concurrency("--scan.concurrency", "scan.concurrency")]
    #[case::poll("--poll.interval-ms", "poll.interval-ms")]
    fn test_zero_values_are_rejected(#[case] flag: &str, #[case] name: &str) {
        let args = MockCommand::parse_from(["test", flag, "0"]).messages;
        assert!(matches!(args.config(), Err(CliError::ZeroValue { flag }) if flag == name));
    }

    #[test]
    fn test_inverted_retry_delays_are_rejected() {
        let args = MockCommand::parse_from([
            "test",
            "--retry.min-delay-ms",
            "10",
            "--retry.max-delay-ms",
            "5",
        ])
        .messages;
        assert!(matches!(
            args.config(),
            Err(CliError::InvertedRetryDelays { min_ms: 10, max_ms: 5 })
        ));
    }

    #[test]
    fn test_network_args() {
        let args = MockNetworkCommand::parse_from([
            "test",
            "--l1.rpc",
            "http://localhost:8545",
            "--l2.rpc",
            "http://localhost:8547",
            "--bridge",
            "0x8315177ab297ba92a06054ce80a67ed4dbd7ed3a",
            "--inbox",
            "0x4dbd4fc535ac27206064b68ffcf827b0a60bab3f",
            "--outbox",
            "0x0b9857ae2d4a3dbe74ffe1d7df045bb7f96e4840",
        ])
        .network;

        assert_eq!(args.l2_chain_id, None);
        assert_eq!(args.cache_size, 1024);
        let network = args.network(42161, 1);
        assert_eq!(network.chain_id, 42161);
        assert_eq!(network.parent_chain_id, 1);
        assert_eq!(network.outbox, args.outbox);
    }

    #[test]
    fn test_network_args_require_contracts() {
        let result = MockNetworkCommand::try_parse_from([
            "test",
            "--l1.rpc",
            "http://localhost:8545",
            "--l2.rpc",
            "http://localhost:8547",
        ]);
        assert!(result.is_err());
    }
}
