//! Error types for the token ledger and distribution engine.

use alloy::primitives::Address;
use std::fmt;
use thiserror::Error;

/// Privileged role a call may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The single identity allowed to issue tokens on the ledger.
    Minter,
    /// The ledger deployer, allowed to reassign the minter.
    LedgerOwner,
    /// The faucet deployer, allowed to pause and unpause distribution.
    Administrator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Minter => write!(f, "minter"),
            Role::LedgerOwner => write!(f, "ledger owner"),
            Role::Administrator => write!(f, "administrator"),
        }
    }
}

/// Rejection reasons for a state transition.
///
/// Every variant aborts the whole call: no balance, claim record, pause flag
/// or log entry is changed when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Caller lacks the privilege the operation requires
    #[error("Unauthorized: {caller} is not the {required}")]
    Unauthorized { caller: Address, required: Role },

    /// Distribution is paused by the administrator
    #[error("Faucet is paused")]
    Paused,

    /// The account claimed too recently
    #[error("Cooldown period not elapsed: {remaining_secs}s remaining")]
    CooldownActive { remaining_secs: u64 },

    /// The claim would push the account above its lifetime cap
    #[error("Lifetime claim limit reached")]
    LifetimeLimitReached,

    /// An amount addition would wrap
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    /// Engine or token parameters are inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A persisted snapshot could not be encoded or decoded
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Snapshot(err.to_string())
    }
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
