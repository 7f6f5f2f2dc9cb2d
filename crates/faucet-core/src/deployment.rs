//! The deployed pair of contracts and the serial call sequence over them.
//!
//! A [`Deployment`] plays the part of the execution substrate: it owns the
//! ledger, the engine and the event log, evaluates every call at a
//! non-decreasing timestamp, and commits a call's effects only when the whole
//! call succeeds.

use crate::config::{EngineConfig, TokenMetadata};
use crate::engine::{ClaimStatus, DistributionEngine};
use crate::error::{Error, Result};
use crate::event::{EventLog, LogEntry};
use crate::ledger::TokenLedger;
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Deployment nonce of the token contract.
pub const TOKEN_NONCE: u64 = 0;

/// Deployment nonce of the faucet contract.
pub const FAUCET_NONCE: u64 = 1;

/// Addresses of the two deployed contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub token: Address,
    pub faucet: Address,
}

/// Everything a client wants to know about one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    pub address: Address,
    pub balance: U256,
    #[serde(flatten)]
    pub status: ClaimStatus,
}

/// Token ledger, faucet engine and event log under one serial call discipline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    deployer: Address,
    ledger: TokenLedger,
    engine: DistributionEngine,
    log: EventLog,
    last_timestamp: u64,
}

impl Deployment {
    /// Deploy the token with `deployer` as temporary minter, then the faucet.
    ///
    /// Minting rights are not handed to the faucet; claims fail with
    /// `Unauthorized` until [`Deployment::set_minter`] is called.
    pub fn deploy(deployer: Address, metadata: TokenMetadata, config: EngineConfig) -> Result<Self> {
        let token = deployer.create(TOKEN_NONCE);
        let faucet = deployer.create(FAUCET_NONCE);

        let ledger = TokenLedger::new(token, deployer, deployer, metadata);
        let engine = DistributionEngine::new(faucet, deployer, token, config)?;

        Ok(Self {
            deployer,
            ledger,
            engine,
            log: EventLog::new(),
            last_timestamp: 0,
        })
    }

    /// Full bootstrap: deploy both contracts and hand minting to the faucet.
    pub fn bootstrap(deployer: Address, metadata: TokenMetadata, config: EngineConfig) -> Result<Self> {
        let mut deployment = Self::deploy(deployer, metadata, config)?;
        let faucet = deployment.engine.address();
        deployment.set_minter(deployer, faucet)?;

        info!(
            "Bootstrap complete: token {} faucet {}",
            deployment.ledger.address(),
            faucet
        );
        Ok(deployment)
    }

    /// Time a call is evaluated at; never earlier than the last committed call.
    fn effective_time(&self, now: u64) -> u64 {
        now.max(self.last_timestamp)
    }

    /// Claim one faucet amount for `caller`.
    pub fn request_tokens(&mut self, caller: Address, now: u64) -> Result<LogEntry> {
        let now = self.effective_time(now);
        let event = self.engine.request_tokens(&mut self.ledger, caller, now)?;
        self.last_timestamp = now;
        Ok(self.log.append(event, now))
    }

    /// Pause or unpause distribution.
    pub fn set_paused(&mut self, caller: Address, paused: bool, now: u64) -> Result<LogEntry> {
        let now = self.effective_time(now);
        let event = self.engine.set_paused(caller, paused)?;
        self.last_timestamp = now;
        Ok(self.log.append(event, now))
    }

    /// Reassign the ledger's minter.
    pub fn set_minter(&mut self, caller: Address, new_minter: Address) -> Result<()> {
        self.ledger.set_minter(caller, new_minter)
    }

    pub fn can_claim(&self, account: Address, now: u64) -> bool {
        self.engine.can_claim(account, self.effective_time(now))
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.ledger.balance_of(account)
    }

    pub fn remaining_allowance(&self, account: Address) -> U256 {
        self.engine.remaining_allowance(account)
    }

    pub fn total_claimed(&self, account: Address) -> U256 {
        self.engine.total_claimed(account)
    }

    pub fn account(&self, account: Address, now: u64) -> AccountView {
        AccountView {
            address: account,
            balance: self.ledger.balance_of(account),
            status: self.engine.claim_status(account, self.effective_time(now)),
        }
    }

    pub fn addresses(&self) -> ContractAddresses {
        ContractAddresses {
            token: self.ledger.address(),
            faucet: self.engine.address(),
        }
    }

    pub fn events_since(&self, sequence: u64) -> &[LogEntry] {
        self.log.since(sequence)
    }

    pub fn deployer(&self) -> Address {
        self.deployer
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    pub fn engine(&self) -> &DistributionEngine {
        &self.engine
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn last_timestamp(&self) -> u64 {
        self.last_timestamp
    }

    /// Encode the full state as JSON.
    pub fn to_snapshot(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Restore a deployment from [`Deployment::to_snapshot`] output.
    pub fn from_snapshot(json: &str) -> Result<Self> {
        let deployment: Self = serde_json::from_str(json)?;
        deployment
            .engine
            .config()
            .validate()
            .map_err(|e| Error::Snapshot(format!("stored policy is invalid: {}", e)))?;
        deployment.check_invariants()?;
        Ok(deployment)
    }

    /// Reject state that no sequence of calls could have produced.
    fn check_invariants(&self) -> Result<()> {
        let limit = self.engine.config().lifetime_limit;
        for (account, record) in self.engine.claims() {
            if record.total_claimed > limit {
                return Err(Error::Snapshot(format!(
                    "{} claimed {} above the lifetime limit {}",
                    account, record.total_claimed, limit
                )));
            }
            if let Some(last) = record.last_claim_at {
                if last > self.last_timestamp {
                    return Err(Error::Snapshot(format!(
                        "{} last claimed at {} after the last call at {}",
                        account, last, self.last_timestamp
                    )));
                }
            }
        }

        let supply = self.ledger.total_supply();
        match self.ledger.balance_sum() {
            Some(sum) if sum == supply => Ok(()),
            Some(sum) => Err(Error::Snapshot(format!(
                "balances sum to {} but total supply is {}",
                sum, supply
            ))),
            None => Err(Error::Snapshot("balances overflow".to_string())),
        }
    }
}
