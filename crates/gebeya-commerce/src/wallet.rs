//! Seller wallets.
//!
//! A wallet has two columns: `escrow_held` for buyer money waiting on
//! completion, and `balance` for money released to the seller. Both are
//! private and only move through `hold`, `release` and `reverse_hold`, so
//! neither column can go negative and a release moves exactly the same
//! amount out of escrow and into the balance.

use crate::error::CommerceError;
use crate::ids::{UserId, WalletId};
use crate::money::{Currency, Money};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A seller wallet, keyed by the seller's user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Wallet {
    id: WalletId,
    user_id: UserId,
    balance: Money,
    escrow_held: Money,
    updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Open an empty wallet for a seller.
    pub fn open(user_id: UserId, currency: Currency) -> Self {
        Self {
            id: WalletId::generate(),
            user_id,
            balance: Money::zero(currency),
            escrow_held: Money::zero(currency),
            updated_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &WalletId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Funds released to the seller.
    pub fn balance(&self) -> Money {
        self.balance
    }

    /// Funds held in escrow.
    pub fn escrow_held(&self) -> Money {
        self.escrow_held
    }

    pub fn currency(&self) -> Currency {
        self.balance.currency
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Place `amount` in escrow.
    pub fn hold(&mut self, amount: Money) -> Result<(), CommerceError> {
        self.check_amount(&amount)?;
        self.escrow_held = self
            .escrow_held
            .try_add(&amount)
            .ok_or(CommerceError::Overflow)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Move `amount` from escrow into the balance.
    pub fn release(&mut self, amount: Money) -> Result<(), CommerceError> {
        self.check_amount(&amount)?;
        let escrow_held = self.take_from_escrow(&amount)?;
        let balance = self
            .balance
            .try_add(&amount)
            .ok_or(CommerceError::Overflow)?;
        self.escrow_held = escrow_held;
        self.balance = balance;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Drop `amount` from escrow without crediting the balance.
    pub fn reverse_hold(&mut self, amount: Money) -> Result<(), CommerceError> {
        self.check_amount(&amount)?;
        self.escrow_held = self.take_from_escrow(&amount)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn take_from_escrow(&self, amount: &Money) -> Result<Money, CommerceError> {
        let remaining = self
            .escrow_held
            .try_subtract(amount)
            .ok_or(CommerceError::Overflow)?;
        if remaining.is_negative() {
            return Err(CommerceError::LedgerInvariant(format!(
                "wallet {} holds {} in escrow, cannot take {}",
                self.user_id,
                self.escrow_held.display(),
                amount.display()
            )));
        }
        Ok(remaining)
    }

    fn check_amount(&self, amount: &Money) -> Result<(), CommerceError> {
        if amount.currency != self.currency() {
            return Err(CommerceError::CurrencyMismatch {
                expected: self.currency().code().to_string(),
                got: amount.currency.code().to_string(),
            });
        }
        if amount.is_negative() {
            return Err(CommerceError::LedgerInvariant(format!(
                "negative amount {}",
                amount.display()
            )));
        }
        Ok(())
    }
}
