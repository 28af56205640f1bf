//! Mutable access to a registry-owned vault.

use std::ops::Deref;

use chrono::{DateTime, Utc};
use digitalhouse_types::{
    AccessCredential, Amount, BidId, CallContext, ReservationId, Result, Transfer, VaultEvent,
};
use digitalhouse_vault::{Decision, Vault};

/// Booking-side handle to a vault held by a [`VaultRegistry`].
///
/// Exposes the reservation, auction and stay operations and, through
/// `Deref`, every read on [`Vault`]. The activation flag is not reachable
/// here; it changes only through [`VaultRegistry::activate_vault`] and
/// [`VaultRegistry::deactivate_vault`].
///
/// ```compile_fail
/// # use digitalhouse_registry::VaultRegistry;
/// # use digitalhouse_types::{AccountId, CallContext, RegistryConfig};
/// let owner = AccountId::from_bytes([1; 20]);
/// let config = RegistryConfig::new(owner, AccountId::from_bytes([2; 20]), [0; 32]);
/// let mut registry = VaultRegistry::new(config).unwrap();
/// let ctx = CallContext::new(owner, chrono::Utc::now());
/// registry.create_vault(&ctx, "V1", "", 1).unwrap();
/// registry.vault_mut("V1").unwrap().activate();
/// ```
///
/// [`VaultRegistry`]: crate::VaultRegistry
/// [`VaultRegistry::activate_vault`]: crate::VaultRegistry::activate_vault
/// [`VaultRegistry::deactivate_vault`]: crate::VaultRegistry::deactivate_vault
#[derive(Debug)]
pub struct VaultHandle<'a> {
    vault: &'a mut Vault,
}

impl<'a> VaultHandle<'a> {
    pub(crate) fn new(vault: &'a mut Vault) -> Self {
        Self { vault }
    }

    /// See [`Vault::reserve`].
    pub fn reserve(
        &mut self,
        ctx: &CallContext,
        stake_amount: Amount,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    ) -> Result<ReservationId> {
        self.vault.reserve(ctx, stake_amount, check_in, check_out)
    }

    /// See [`Vault::place_bid`].
    pub fn place_bid(&mut self, ctx: &CallContext, amount: Amount) -> Result<BidId> {
        self.vault.place_bid(ctx, amount)
    }

    /// See [`Vault::decide`].
    pub fn decide(&mut self, ctx: &CallContext, expected_nonce: u64, keep: bool) -> Result<Decision> {
        self.vault.decide(ctx, expected_nonce, keep)
    }

    /// See [`Vault::check_in`].
    pub fn check_in(&mut self, ctx: &CallContext, expected_nonce: u64) -> Result<AccessCredential> {
        self.vault.check_in(ctx, expected_nonce)
    }

    /// See [`Vault::check_out`].
    pub fn check_out(&mut self, ctx: &CallContext, expected_nonce: u64) -> Result<Vec<Transfer>> {
        self.vault.check_out(ctx, expected_nonce)
    }

    /// See [`Vault::expire`].
    pub fn expire(&mut self, ctx: &CallContext) -> Result<Vec<Transfer>> {
        self.vault.expire(ctx)
    }

    pub fn drain_events(&mut self) -> Vec<VaultEvent> {
        self.vault.drain_events()
    }
}

impl Deref for VaultHandle<'_> {
    type Target = Vault;

    fn deref(&self) -> &Vault {
        self.vault
    }
}
