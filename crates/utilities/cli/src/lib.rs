#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod error;
pub use error::{CliError, CliResult};

mod log;
pub use log::{FileLogConfig, LogArgs, LogConfig, LogRotation, StdoutLogConfig};

mod messages;
pub use messages::{ConnectedNetwork, MessageArgs, NetworkArgs};

mod metrics;
#[cfg(feature = "metrics")]
pub use metrics::init_prometheus_server;
pub use metrics::MetricsArgs;

mod tracing;
pub use self::tracing::{LogFormat, init_test_tracing};
