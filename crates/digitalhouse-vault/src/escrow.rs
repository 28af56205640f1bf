//! Escrow ledger: tracks every unit a vault holds.
//!
//! Each entry is keyed by what it backs: the stake of a reservation or the
//! amount of a bid. Invariants checked by [`EscrowLedger::verify`]:
//!
//! ```text
//! held == Σ(entries)
//! held == Σ(deposited) - Σ(released)
//! held == stake(active reservation) + Σ(active bids)    (supplied by the vault)
//! ```
//!
//! Any mismatch is a [`DigitalHouseError::LedgerInconsistency`]: a defect,
//! never something to correct silently.

use std::collections::BTreeMap;

use digitalhouse_types::{AccountId, Amount, BidId, DigitalHouseError, ReservationId, Result};
use serde::{Deserialize, Serialize};

/// What an escrow entry backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum EscrowKey {
    Stake(ReservationId),
    Bid(BidId),
}

impl std::fmt::Display for EscrowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stake(id) => write!(f, "stake[{id}]"),
            Self::Bid(id) => write!(f, "bid[{id}]"),
        }
    }
}

/// Value held on behalf of `owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowEntry {
    pub owner: AccountId,
    pub amount: Amount,
}

/// Per-vault escrow accounting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EscrowLedger {
    entries: BTreeMap<EscrowKey, EscrowEntry>,
    /// Value actually held by the vault.
    held: Amount,
    total_deposited: Amount,
    total_released: Amount,
}

impl EscrowLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take `amount` from `owner` into escrow under `key`.
    ///
    /// # Errors
    /// `LedgerInconsistency` if the key is already escrowed, the amount is
    /// zero, or the totals would overflow.
    pub fn lock(&mut self, key: EscrowKey, owner: AccountId, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Err(inconsistency(format!("refusing to escrow zero for {key}")));
        }
        if self.entries.contains_key(&key) {
            return Err(inconsistency(format!("{key} is already escrowed")));
        }
        let held = self
            .held
            .checked_add(amount)
            .ok_or_else(|| inconsistency(format!("held value overflows locking {key}")))?;
        let deposited = self
            .total_deposited
            .checked_add(amount)
            .ok_or_else(|| inconsistency(format!("deposit total overflows locking {key}")))?;

        self.entries.insert(key, EscrowEntry { owner, amount });
        self.held = held;
        self.total_deposited = deposited;
        Ok(())
    }

    /// Remove the entry under `key`; its value leaves the vault.
    ///
    /// # Errors
    /// `LedgerInconsistency` if nothing is escrowed under `key` (double
    /// refund) or held value would go negative.
    pub fn release(&mut self, key: EscrowKey) -> Result<EscrowEntry> {
        let entry = *self
            .entries
            .get(&key)
            .ok_or_else(|| inconsistency(format!("{key} is not escrowed")))?;
        let held = self.held.checked_sub(entry.amount).ok_or_else(|| {
            inconsistency(format!(
                "releasing {key} ({}) exceeds held value {}",
                entry.amount, self.held
            ))
        })?;
        let released = self
            .total_released
            .checked_add(entry.amount)
            .ok_or_else(|| inconsistency(format!("release total overflows releasing {key}")))?;

        self.entries.remove(&key);
        self.held = held;
        self.total_released = released;
        Ok(entry)
    }

    /// Move an entry to a new key and owner without moving value.
    ///
    /// # Errors
    /// `LedgerInconsistency` if `from` is missing or `to` is taken.
    pub fn reassign(&mut self, from: EscrowKey, to: EscrowKey, new_owner: AccountId) -> Result<()> {
        if self.entries.contains_key(&to) {
            return Err(inconsistency(format!("{to} is already escrowed")));
        }
        let entry = self
            .entries
            .remove(&from)
            .ok_or_else(|| inconsistency(format!("{from} is not escrowed")))?;
        self.entries.insert(
            to,
            EscrowEntry {
                owner: new_owner,
                amount: entry.amount,
            },
        );
        Ok(())
    }

    #[must_use]
    pub fn entry(&self, key: &EscrowKey) -> Option<&EscrowEntry> {
        self.entries.get(key)
    }

    /// Value actually held.
    #[must_use]
    pub fn held(&self) -> Amount {
        self.held
    }

    /// Sum of all tracked entries.
    #[must_use]
    pub fn total_tracked(&self) -> u128 {
        self.entries.values().map(|e| u128::from(e.amount)).sum()
    }

    /// Value escrowed on behalf of `owner`.
    #[must_use]
    pub fn held_for(&self, owner: &AccountId) -> u128 {
        self.entries
            .values()
            .filter(|e| e.owner == *owner)
            .map(|e| u128::from(e.amount))
            .sum()
    }

    #[must_use]
    pub fn total_deposited(&self) -> Amount {
        self.total_deposited
    }

    #[must_use]
    pub fn total_released(&self) -> Amount {
        self.total_released
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check internal consistency and that held value equals `expected`.
    ///
    /// # Errors
    /// Returns [`DigitalHouseError::LedgerInconsistency`] describing the first
    /// mismatch.
    pub fn verify(&self, expected: Amount) -> Result<()> {
        let tracked = self.total_tracked();
        if tracked != u128::from(self.held) {
            return Err(inconsistency(format!(
                "tracked entries {tracked} != held {}",
                self.held
            )));
        }
        let net = self.total_deposited.checked_sub(self.total_released);
        if net != Some(self.held) {
            return Err(inconsistency(format!(
                "held {} != deposited {} - released {}",
                self.held, self.total_deposited, self.total_released
            )));
        }
        if self.held != expected {
            return Err(inconsistency(format!(
                "held {} != expected {expected} (active stake + active bids)",
                self.held
            )));
        }
        Ok(())
    }
}

fn inconsistency(reason: String) -> DigitalHouseError {
    DigitalHouseError::LedgerInconsistency { reason }
}
