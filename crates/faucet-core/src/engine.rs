//! Faucet distribution engine.
//!
//! The per-account state machine is implicit in two orthogonal fields of
//! [`ClaimRecord`] (last claim time and cumulative total) plus one global
//! pause flag. A claim is evaluated against all three, and nothing is
//! committed unless the ledger accepts the issuance.

use crate::config::EngineConfig;
use crate::error::{Error, Result, Role};
use crate::event::FaucetEvent;
use crate::ledger::Issuer;
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Claim history of one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// Timestamp of the most recent successful claim
    pub last_claim_at: Option<u64>,
    /// Cumulative amount issued to the account through the faucet
    pub total_claimed: U256,
}

/// Read-only view of an account's eligibility at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimStatus {
    pub total_claimed: U256,
    pub remaining_allowance: U256,
    pub last_claim_at: Option<u64>,
    pub next_claim_at: Option<u64>,
    pub can_claim: bool,
}

/// Rate-limited distribution policy holding the ledger's issuance right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionEngine {
    address: Address,
    admin: Address,
    token: Address,
    config: EngineConfig,
    paused: bool,
    claims: HashMap<Address, ClaimRecord>,
}

impl DistributionEngine {
    /// Create an engine at `address`, administered by its deployer `admin`,
    /// issuing tokens on the ledger at `token`.
    pub fn new(address: Address, admin: Address, token: Address, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        info!(
            "Faucet created at {} for token {} (admin {}, claim {}, cap {}, cooldown {}s)",
            address, token, admin, config.claim_amount, config.lifetime_limit, config.cooldown_secs
        );

        Ok(Self {
            address,
            admin,
            token,
            config,
            paused: false,
            claims: HashMap::new(),
        })
    }

    /// Evaluate a claim by `account` at `now` and return the record it would produce.
    fn evaluate_claim(&self, account: Address, now: u64) -> Result<ClaimRecord> {
        if self.paused {
            return Err(Error::Paused);
        }

        let record = self.claims.get(&account).cloned().unwrap_or_default();

        if let Some(last) = record.last_claim_at {
            let ready_at = last.saturating_add(self.config.cooldown_secs);
            if now < ready_at {
                return Err(Error::CooldownActive {
                    remaining_secs: ready_at - now,
                });
            }
        }

        // A sum that would wrap is necessarily above the cap
        let total_claimed = match record.total_claimed.checked_add(self.config.claim_amount) {
            Some(total) if total <= self.config.lifetime_limit => total,
            _ => return Err(Error::LifetimeLimitReached),
        };

        Ok(ClaimRecord {
            last_claim_at: Some(now),
            total_claimed,
        })
    }

    /// Issue one claim amount to `caller` through `ledger`.
    ///
    /// The claim record is only written after the ledger accepts the
    /// issuance, so a rejected issuance leaves the engine untouched.
    pub fn request_tokens<I: Issuer>(
        &mut self,
        ledger: &mut I,
        caller: Address,
        now: u64,
    ) -> Result<FaucetEvent> {
        let updated = self.evaluate_claim(caller, now).map_err(|e| {
            warn!("Claim by {} rejected: {}", caller, e);
            e
        })?;

        ledger.issue(self.address, caller, self.config.claim_amount)?;
        self.claims.insert(caller, updated);

        info!("{} claimed {} tokens", caller, self.config.claim_amount);
        Ok(FaucetEvent::TokensClaimed {
            account: caller,
            amount: self.config.claim_amount,
        })
    }

    /// Whether a claim by `account` at `now` would pass the faucet's checks.
    pub fn can_claim(&self, account: Address, now: u64) -> bool {
        self.evaluate_claim(account, now).is_ok()
    }

    /// Amount `account` may still receive over its lifetime.
    pub fn remaining_allowance(&self, account: Address) -> U256 {
        self.config
            .lifetime_limit
            .saturating_sub(self.total_claimed(account))
    }

    pub fn total_claimed(&self, account: Address) -> U256 {
        self.claims
            .get(&account)
            .map(|record| record.total_claimed)
            .unwrap_or(U256::ZERO)
    }

    pub fn last_claim_at(&self, account: Address) -> Option<u64> {
        self.claims.get(&account).and_then(|record| record.last_claim_at)
    }

    /// Earliest timestamp at which the cooldown no longer blocks `account`.
    pub fn next_claim_at(&self, account: Address) -> Option<u64> {
        self.last_claim_at(account)
            .map(|last| last.saturating_add(self.config.cooldown_secs))
    }

    pub fn claim_status(&self, account: Address, now: u64) -> ClaimStatus {
        debug!("Status query for {} at {}", account, now);
        ClaimStatus {
            total_claimed: self.total_claimed(account),
            remaining_allowance: self.remaining_allowance(account),
            last_claim_at: self.last_claim_at(account),
            next_claim_at: self.next_claim_at(account),
            can_claim: self.can_claim(account, now),
        }
    }

    /// Set the pause flag. Only the administrator may call this.
    pub fn set_paused(&mut self, caller: Address, paused: bool) -> Result<FaucetEvent> {
        if caller != self.admin {
            warn!("Rejected pause change from non-admin {}", caller);
            return Err(Error::Unauthorized {
                caller,
                required: Role::Administrator,
            });
        }

        self.paused = paused;
        info!("Faucet paused flag set to {}", paused);
        Ok(FaucetEvent::FaucetPaused { paused })
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of accounts that have claimed at least once.
    pub fn claimant_count(&self) -> usize {
        self.claims.len()
    }

    pub fn claims(&self) -> impl Iterator<Item = (&Address, &ClaimRecord)> {
        self.claims.iter()
    }
}
