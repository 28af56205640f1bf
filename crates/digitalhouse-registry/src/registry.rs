//! Vault registry: creation, lookup and administration of vaults.

use std::collections::HashMap;

use digitalhouse_types::{
    AccountId, Amount, CallContext, CredentialIssuer, CurrencyConfig, DigitalHouseError,
    RegistryConfig, RegistryEvent, Result, UserStats, VaultAddress, VaultInfo,
};
use digitalhouse_vault::{SettlementPolicy, Vault, VaultSetup};
use ed25519_dalek::VerifyingKey;

use crate::VaultHandle;

/// Creates and indexes vaults.
///
/// Vaults are stored in creation order; `by_id` and `by_address` index into
/// that list. Ids are never removed, so indices stay valid.
#[derive(Debug)]
pub struct VaultRegistry {
    config: RegistryConfig,
    policy: SettlementPolicy,
    issuer: CredentialIssuer,
    vaults: Vec<Vault>,
    by_id: HashMap<String, usize>,
    by_address: HashMap<VaultAddress, usize>,
    events: Vec<RegistryEvent>,
}

impl VaultRegistry {
    /// Build a registry from a validated config.
    ///
    /// # Errors
    /// `Configuration` if the config fails validation.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        let seed = config.credential_seed_bytes()?;
        let policy = SettlementPolicy::new(config.protocol_fee_bps)?;
        let issuer = CredentialIssuer::from_seed(&seed);

        tracing::info!(
            owner = %config.owner,
            treasury = %config.treasury,
            currency = %config.currency.symbol,
            protocol_fee_bps = config.protocol_fee_bps,
            "vault registry initialized"
        );

        Ok(Self {
            config,
            policy,
            issuer,
            vaults: Vec::new(),
            by_id: HashMap::new(),
            by_address: HashMap::new(),
            events: Vec::new(),
        })
    }

    fn require_owner(&self, ctx: &CallContext, operation: &str) -> Result<()> {
        if ctx.caller != self.config.owner {
            tracing::warn!(caller = %ctx.caller, operation, "non-owner admin call rejected");
            return Err(DigitalHouseError::Unauthorized {
                reason: format!("{operation} is reserved to the registry owner"),
            });
        }
        Ok(())
    }

    fn index_of(&self, vault_id: &str) -> Result<usize> {
        self.by_id
            .get(vault_id)
            .copied()
            .ok_or_else(|| DigitalHouseError::NotFound(format!("vault {vault_id}")))
    }

    // =================================================================
    // Administration
    // =================================================================

    /// Open a new vault in `FREE`.
    ///
    /// # Errors
    /// - `Unauthorized` if the caller is not the owner
    /// - `InvalidArgument` for an empty id or a zero base price
    /// - `DuplicateId` if the id was ever registered
    pub fn create_vault(
        &mut self,
        ctx: &CallContext,
        vault_id: &str,
        property_details: &str,
        base_price: Amount,
    ) -> Result<VaultAddress> {
        self.require_owner(ctx, "create_vault")?;
        if vault_id.is_empty() {
            return Err(DigitalHouseError::InvalidArgument {
                reason: "Vault ID required".into(),
            });
        }
        if base_price == 0 {
            return Err(DigitalHouseError::InvalidArgument {
                reason: "Base price must be > 0".into(),
            });
        }
        if self.by_id.contains_key(vault_id) {
            return Err(DigitalHouseError::DuplicateId(vault_id.to_string()));
        }

        let sequence = self.vaults.len() as u64;
        let address = VaultAddress::derive(&self.config.owner, sequence, vault_id);
        if self.by_address.contains_key(&address) {
            return Err(DigitalHouseError::DuplicateId(address.to_string()));
        }

        let vault = Vault::new(VaultSetup {
            id: vault_id.to_string(),
            address,
            property_details: property_details.to_string(),
            base_price,
            created_at: ctx.now,
            treasury: self.config.treasury,
            policy: self.policy,
            issuer: self.issuer.clone(),
        })?;

        let index = self.vaults.len();
        self.vaults.push(vault);
        self.by_id.insert(vault_id.to_string(), index);
        self.by_address.insert(address, index);
        self.events.push(RegistryEvent::VaultCreated {
            vault_id: vault_id.to_string(),
            vault_address: address,
            base_price,
        });

        tracing::info!(vault_id, vault_address = %address, base_price, "vault created");
        Ok(address)
    }

    /// Block new reservations on a vault. Idempotent: deactivating an
    /// inactive vault succeeds without emitting a second event.
    ///
    /// # Errors
    /// `Unauthorized` for non-owners, `NotFound` for unknown ids.
    pub fn deactivate_vault(&mut self, ctx: &CallContext, vault_id: &str) -> Result<()> {
        self.require_owner(ctx, "deactivate_vault")?;
        let index = self.index_of(vault_id)?;
        if self.vaults[index].deactivate() {
            self.events.push(RegistryEvent::VaultDeactivated {
                vault_id: vault_id.to_string(),
            });
            tracing::info!(vault_id, "vault deactivated");
        } else {
            tracing::debug!(vault_id, "vault already inactive");
        }
        Ok(())
    }

    /// Re-allow reservations on a deactivated vault. Idempotent.
    ///
    /// # Errors
    /// `Unauthorized` for non-owners, `NotFound` for unknown ids.
    pub fn activate_vault(&mut self, ctx: &CallContext, vault_id: &str) -> Result<()> {
        self.require_owner(ctx, "activate_vault")?;
        let index = self.index_of(vault_id)?;
        if self.vaults[index].activate() {
            self.events.push(RegistryEvent::VaultActivated {
                vault_id: vault_id.to_string(),
            });
            tracing::info!(vault_id, "vault activated");
        }
        Ok(())
    }

    // =================================================================
    // Lookup
    // =================================================================

    /// # Errors
    /// `NotFound` for unknown ids.
    pub fn vault_info(&self, vault_id: &str) -> Result<VaultInfo> {
        let vault = &self.vaults[self.index_of(vault_id)?];
        Ok(VaultInfo {
            vault_address: vault.address(),
            vault_id: vault.id().to_string(),
            property_details: vault.property_details().to_string(),
            base_price: vault.base_price(),
            created_at: vault.created_at(),
            is_active: vault.is_active(),
        })
    }

    /// # Errors
    /// `NotFound` for unknown ids.
    pub fn vault_address(&self, vault_id: &str) -> Result<VaultAddress> {
        Ok(self.vaults[self.index_of(vault_id)?].address())
    }

    /// Every id ever registered, in creation order.
    #[must_use]
    pub fn all_vault_ids(&self) -> Vec<String> {
        self.vaults.iter().map(|v| v.id().to_string()).collect()
    }

    /// # Errors
    /// `NotFound` for unknown ids.
    pub fn vault(&self, vault_id: &str) -> Result<&Vault> {
        Ok(&self.vaults[self.index_of(vault_id)?])
    }

    /// Handle for driving booking operations. The activation flag stays
    /// with the registry.
    ///
    /// # Errors
    /// `NotFound` for unknown ids.
    pub fn vault_mut(&mut self, vault_id: &str) -> Result<VaultHandle<'_>> {
        let index = self.index_of(vault_id)?;
        Ok(VaultHandle::new(&mut self.vaults[index]))
    }

    /// # Errors
    /// `NotFound` if no vault has this address.
    pub fn vault_by_address(&self, address: &VaultAddress) -> Result<&Vault> {
        self.by_address
            .get(address)
            .map(|&i| &self.vaults[i])
            .ok_or_else(|| DigitalHouseError::NotFound(format!("vault at {address}")))
    }

    pub fn vaults(&self) -> impl Iterator<Item = &Vault> {
        self.vaults.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vaults.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vaults.is_empty()
    }

    /// Dashboard counters for `account` across every vault.
    #[must_use]
    pub fn user_stats(&self, account: &AccountId) -> UserStats {
        let owned_vaults = if *account == self.config.owner {
            self.vaults.len()
        } else {
            0
        };
        let active_reservations = self
            .vaults
            .iter()
            .filter(|v| v.active_reservation().is_some_and(|r| r.booker == *account))
            .count();
        let active_bids = self
            .vaults
            .iter()
            .flat_map(Vault::bids)
            .filter(|b| b.is_active && b.bidder == *account)
            .count();
        let total_earnings = self
            .vaults
            .iter()
            .fold(0, |acc: Amount, v| acc.saturating_add(v.earnings_of(account)));

        UserStats {
            owned_vaults,
            active_reservations,
            active_bids,
            total_earnings,
        }
    }

    /// Take the registry events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.events)
    }

    // =================================================================
    // Deployment parameters
    // =================================================================

    #[must_use]
    pub fn owner(&self) -> AccountId {
        self.config.owner
    }

    #[must_use]
    pub fn treasury(&self) -> AccountId {
        self.config.treasury
    }

    #[must_use]
    pub fn currency(&self) -> &CurrencyConfig {
        &self.config.currency
    }

    #[must_use]
    pub fn policy(&self) -> SettlementPolicy {
        self.policy
    }

    #[must_use]
    pub fn real_estate_address(&self) -> AccountId {
        self.config.real_estate_address
    }

    #[must_use]
    pub fn digital_house_address(&self) -> AccountId {
        self.config.digital_house_address
    }

    #[must_use]
    pub fn convexo_address(&self) -> AccountId {
        self.config.convexo_address
    }

    /// Public key that verifies access credentials issued by this
    /// registry's vaults.
    #[must_use]
    pub fn credential_verifying_key(&self) -> VerifyingKey {
        self.issuer.verifying_key()
    }
}
