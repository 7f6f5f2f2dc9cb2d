//! Token Faucet Server - HTTP front end for the rate-limited token faucet
//!
//! This crate serves one [`faucet_core::Deployment`] over HTTP:
//! 1. Clients look up the token and faucet addresses and an account's status
//! 2. A claim request issues the configured amount if the account is eligible
//! 3. The administrator pauses or unpauses distribution
//! 4. Every committed change is appended to an event log and pushed to subscribers
//!
//! State is persisted as a JSON snapshot after every committed call.

pub mod config;
pub mod error;
pub mod http;
pub mod state;

pub use config::FaucetConfig;
pub use error::{FaucetError, FaucetResult};
