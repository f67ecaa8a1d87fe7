//! Message status state machines.

use derive_more::Display;

/// Status of an L1 to L2 retryable message.
///
/// `Redeemed`, `Expired` and `CreationFailed` are terminal. `FundsDepositedOnL2` is the only
/// state from which the ticket can still be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum L1ToL2Status {
    /// The ticket has not been created on L2 yet.
    #[display("NOT_YET_CREATED")]
    NotYetCreated,
    /// The ticket creation failed or the origin transaction reverted.
    #[display("CREATION_FAILED")]
    CreationFailed,
    /// The ticket exists on L2 and has not been redeemed.
    #[display("FUNDS_DEPOSITED_ON_L2")]
    FundsDepositedOnL2,
    /// A redemption attempt succeeded.
    #[display("REDEEMED")]
    Redeemed,
    /// The ticket outlived its lifetime without a successful redemption.
    #[display("EXPIRED")]
    Expired,
}

impl L1ToL2Status {
    /// Returns `true` if no further transition is possible.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::CreationFailed | Self::Redeemed | Self::Expired)
    }

    /// Returns `true` if `wait_for_status` stops at this status.
    ///
    /// A created but unredeemed ticket stops the wait as well, since redemption may need a
    /// manual action.
    pub const fn is_settled(&self) -> bool {
        match self {
            Self::NotYetCreated => false,
            Self::CreationFailed |
            Self::FundsDepositedOnL2 |
            Self::Redeemed |
            Self::Expired => true,
        }
    }
}

/// Status of an L2 to L1 withdrawal message. The order of the variants is the order of
/// progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum L2ToL1Status {
    /// The send log could not be found on L2.
    #[display("NOT_FOUND")]
    NotFound,
    /// No send root covering the message has been posted on L1.
    #[display("UNCONFIRMED")]
    Unconfirmed,
    /// A send root covers the message and it can be executed.
    #[display("CONFIRMED")]
    Confirmed,
    /// The message was executed on L1.
    #[display("EXECUTED")]
    Executed,
}

impl L2ToL1Status {
    /// Returns `true` if no further transition is possible.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed)
    }

    /// Returns `true` once a withdrawal proof can be built.
    pub const fn is_confirmed(&self) -> bool {
        match self {
            Self::NotFound | Self::Unconfirmed => false,
            Self::Confirmed | Self::Executed => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(L1ToL2Status::FundsDepositedOnL2.to_string(), "FUNDS_DEPOSITED_ON_L2");
        assert_eq!(L2ToL1Status::Unconfirmed.to_string(), "UNCONFIRMED");
    }

    #[test]
    fn test_withdrawal_progress_order() {
        assert!(L2ToL1Status::NotFound < L2ToL1Status::Unconfirmed);
        assert!(L2ToL1Status::Unconfirmed < L2ToL1Status::Confirmed);
        assert!(L2ToL1Status::Confirmed < L2ToL1Status::Executed);
    }

    #[test]
    fn test_retryable_settled_states() {
        assert!(!L1ToL2Status::NotYetCreated.is_settled());
        assert!(L1ToL2Status::FundsDepositedOnL2.is_settled());
        assert!(!L1ToL2Status::FundsDepositedOnL2.is_terminal());
        assert!(L1ToL2Status::Expired.is_terminal());
    }
}
