//! L2 to L1 withdrawal messages.

mod merkle;
pub use merkle::{SendTree, send_leaf, verify_proof};

mod tracker;
pub use tracker::{L2ToL1Message, WithdrawalProof};
