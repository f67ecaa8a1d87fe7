//! L1 to L2 retryable messages.

mod inputs;
pub use inputs::{L1ToL2MessageInputs, retryable_creation_id};

mod tracker;
pub use tracker::L1ToL2Message;
