//! # Faucet Core
//!
//! Rate-limited token distribution policy. A faucet grants a fixed amount of
//! a token to any requesting account, subject to a per-account cooldown and a
//! per-account lifetime cap, and an administrator can pause distribution.
//!
//! ## Components
//!
//! ### Token Ledger ([`ledger`])
//!
//! Account balances that only grow through issuance, and issuance is only
//! accepted from the single registered minter.
//!
//! ### Distribution Engine ([`engine`])
//!
//! Holds the ledger's issuance right and per-account claim records:
//! - Pause flag checked first
//! - Cooldown between claims (an elapsed time equal to the cooldown is enough)
//! - Lifetime cap (a claim that lands exactly on the cap is allowed)
//!
//! ### Deployment ([`deployment`])
//!
//! Owns both contracts and the [`event`] log, sequences calls at
//! non-decreasing timestamps, and commits a call's effects only if the whole
//! call succeeds. The state serializes to a JSON snapshot.
//!
//! ## Usage
//!
//! ```rust
//! use faucet_core::{Address, Clock, Deployment, EngineConfig, ManualClock, TokenMetadata};
//!
//! let deployer = Address::repeat_byte(0x01);
//! let user = Address::repeat_byte(0x02);
//! let clock = ManualClock::new(1_700_000_000);
//!
//! let mut deployment = Deployment::bootstrap(deployer, TokenMetadata::default(), EngineConfig::default())?;
//! deployment.request_tokens(user, clock.now())?;
//! assert!(!deployment.can_claim(user, clock.now()));
//!
//! clock.advance(86_400);
//! assert!(deployment.can_claim(user, clock.now()));
//! # Ok::<(), faucet_core::Error>(())
//! ```

pub mod clock;
pub mod config;
pub mod deployment;
pub mod engine;
pub mod error;
pub mod event;
pub mod ledger;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, TokenMetadata};
pub use deployment::{AccountView, ContractAddresses, Deployment};
pub use engine::{ClaimRecord, ClaimStatus, DistributionEngine};
pub use error::{Error, Result, Role};
pub use event::{EventLog, FaucetEvent, LogEntry};
pub use ledger::{Issuer, TokenLedger};

// Re-export commonly used types
pub use alloy::primitives::{Address, U256};
