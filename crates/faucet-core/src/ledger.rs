//! Mint-restricted token ledger.
//!
//! Balances only grow through [`TokenLedger::issue`], and only the single
//! registered minter may call it. The faucet engine reaches the ledger through
//! the [`Issuer`] capability rather than through the concrete type.

use crate::config::TokenMetadata;
use crate::error::{Error, Result, Role};
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Capability to issue new tokens on behalf of a caller.
#[cfg_attr(test, mockall::automock)]
pub trait Issuer {
    /// Credit `amount` to `to`, provided `caller` is the registered minter.
    fn issue(&mut self, caller: Address, to: Address, amount: U256) -> Result<()>;
}

/// Account-balance ledger with a single authorized issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedger {
    address: Address,
    owner: Address,
    minter: Address,
    metadata: TokenMetadata,
    total_supply: U256,
    balances: HashMap<Address, U256>,
}

impl TokenLedger {
    /// Create a ledger owned by `owner` with `minter` as the initial issuer.
    pub fn new(address: Address, owner: Address, minter: Address, metadata: TokenMetadata) -> Self {
        info!(
            "Token {} ({}) created at {} with minter {}",
            metadata.name, metadata.symbol, address, minter
        );
        Self {
            address,
            owner,
            minter,
            metadata,
            total_supply: U256::ZERO,
            balances: HashMap::new(),
        }
    }

    /// Reassign the minter role. Only the ledger owner may do this.
    pub fn set_minter(&mut self, caller: Address, new_minter: Address) -> Result<()> {
        if caller != self.owner {
            warn!("Rejected minter change from non-owner {}", caller);
            return Err(Error::Unauthorized {
                caller,
                required: Role::LedgerOwner,
            });
        }

        info!("Minter changed from {} to {}", self.minter, new_minter);
        self.minter = new_minter;
        Ok(())
    }

    /// Balance of `account`, zero if never credited.
    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or(U256::ZERO)
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn minter(&self) -> Address {
        self.minter
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    /// Number of accounts holding a balance entry.
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Sum of all balances, `None` if it does not fit in a `U256`.
    pub fn balance_sum(&self) -> Option<U256> {
        self.balances
            .values()
            .try_fold(U256::ZERO, |sum, balance| sum.checked_add(*balance))
    }
}

impl Issuer for TokenLedger {
    fn issue(&mut self, caller: Address, to: Address, amount: U256) -> Result<()> {
        if caller != self.minter {
            warn!("Rejected issuance from {} (minter is {})", caller, self.minter);
            return Err(Error::Unauthorized {
                caller,
                required: Role::Minter,
            });
        }

        // Both sums are computed before either is stored
        let new_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(Error::ArithmeticOverflow)?;
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(Error::ArithmeticOverflow)?;

        self.balances.insert(to, new_balance);
        self.total_supply = new_supply;

        debug!("Issued {} to {} (balance {})", amount, to, new_balance);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Address {
        Address::repeat_byte(0x01)
    }

    fn test_ledger() -> TokenLedger {
        TokenLedger::new(
            Address::repeat_byte(0xaa),
            owner(),
            owner(),
            TokenMetadata::default(),
        )
    }

    #[test]
    fn test_issue_by_minter() {
        let mut ledger = test_ledger();
        let user = Address::repeat_byte(0x02);

        ledger.issue(owner(), user, U256::from(100u64)).unwrap();
        ledger.issue(owner(), user, U256::from(50u64)).unwrap();

        assert_eq!(ledger.balance_of(user), U256::from(150u64));
        assert_eq!(ledger.total_supply(), U256::from(150u64));
    }

    #[test]
    fn test_issue_unauthorized() {
        let mut ledger = test_ledger();
        let intruder = Address::repeat_byte(0x03);

        let result = ledger.issue(intruder, intruder, U256::from(1u64));
        assert_eq!(
            result,
            Err(Error::Unauthorized {
                caller: intruder,
                required: Role::Minter
            })
        );
        assert_eq!(ledger.balance_of(intruder), U256::ZERO);
        assert_eq!(ledger.total_supply(), U256::ZERO);
    }

    #[test]
    fn test_unseen_account_has_zero_balance() {
        let ledger = test_ledger();
        assert_eq!(ledger.balance_of(Address::repeat_byte(0x42)), U256::ZERO);
        assert_eq!(ledger.holder_count(), 0);
        assert_eq!(ledger.balance_sum(), Some(U256::ZERO));
    }

    #[test]
    fn test_balance_sum_tracks_supply() {
        let mut ledger = test_ledger();
        ledger.issue(owner(), Address::repeat_byte(0x02), U256::from(70u64)).unwrap();
        ledger.issue(owner(), Address::repeat_byte(0x03), U256::from(30u64)).unwrap();

        assert_eq!(ledger.balance_sum(), Some(ledger.total_supply()));
    }

    #[test]
    fn test_set_minter_hands_off_issuance() {
        let mut ledger = test_ledger();
        let faucet = Address::repeat_byte(0xfa);
        let user = Address::repeat_byte(0x02);

        ledger.set_minter(owner(), faucet).unwrap();
        assert_eq!(ledger.minter(), faucet);

        // The previous minter lost its right
        assert!(ledger.issue(owner(), user, U256::from(1u64)).is_err());
        assert!(ledger.issue(faucet, user, U256::from(1u64)).is_ok());
    }

    #[test]
    fn test_set_minter_requires_owner() {
        let mut ledger = test_ledger();
        let intruder = Address::repeat_byte(0x03);

        let result = ledger.set_minter(intruder, intruder);
        assert!(matches!(
            result,
            Err(Error::Unauthorized {
                required: Role::LedgerOwner,
                ..
            })
        ));
        assert_eq!(ledger.minter(), owner());
    }

    #[test]
    fn test_issue_overflow_is_rejected_without_changes() {
        let mut ledger = test_ledger();
        let user = Address::repeat_byte(0x02);

        ledger.issue(owner(), user, U256::MAX).unwrap();
        let result = ledger.issue(owner(), Address::repeat_byte(0x04), U256::from(1u64));

        // Supply would wrap even though the new holder's balance would not
        assert_eq!(result, Err(Error::ArithmeticOverflow));
        assert_eq!(ledger.total_supply(), U256::MAX);
        assert_eq!(ledger.balance_of(Address::repeat_byte(0x04)), U256::ZERO);
    }
}
