#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod errors;
pub use errors::{pending_error, transport_error};

mod metrics;
pub use metrics::Metrics;

mod reader;
pub use reader::{AlloyChainReader, log_filter};

mod sender;
pub use sender::{AlloyTransactionSender, transaction_request};
