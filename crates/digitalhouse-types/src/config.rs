//! Configuration types for a Digital House registry deployment.

use serde::{Deserialize, Serialize};

use crate::{AccountId, DigitalHouseError, Result, constants};

/// Settlement currency configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrencyConfig {
    /// Display symbol (e.g., "PYUSD").
    pub symbol: String,
    /// Decimal places of the token. The engine only supports 6.
    pub decimals: u32,
    /// Token contract / issuer address.
    pub token_address: AccountId,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            symbol: constants::DEFAULT_CURRENCY_SYMBOL.to_string(),
            decimals: constants::CURRENCY_DECIMALS,
            token_address: AccountId::from_hex(constants::DEFAULT_PYUSD_ADDRESS)
                .unwrap_or(AccountId::ZERO),
        }
    }
}

/// Configuration for a registry (vault factory) deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Administrative identity: the only account allowed to create and
    /// deactivate vaults.
    pub owner: AccountId,
    /// Receives the protocol share of every cede.
    pub treasury: AccountId,
    /// Settlement currency.
    #[serde(default)]
    pub currency: CurrencyConfig,
    /// Protocol share of the incremental value on a cede, in basis points.
    #[serde(default = "default_protocol_fee_bps")]
    pub protocol_fee_bps: u16,
    /// Real-estate partner address recorded at deployment.
    pub real_estate_address: AccountId,
    /// Digital House platform address recorded at deployment.
    pub digital_house_address: AccountId,
    /// Convexo partner address recorded at deployment.
    pub convexo_address: AccountId,
    /// Hex-encoded 32-byte seed of the key that signs access credentials.
    pub credential_seed: String,
}

fn default_protocol_fee_bps() -> u16 {
    constants::DEFAULT_PROTOCOL_FEE_BPS
}

impl RegistryConfig {
    /// Minimal config: partner addresses default to the treasury, fee and
    /// currency to their defaults.
    #[must_use]
    pub fn new(owner: AccountId, treasury: AccountId, credential_seed: [u8; 32]) -> Self {
        Self {
            owner,
            treasury,
            currency: CurrencyConfig::default(),
            protocol_fee_bps: constants::DEFAULT_PROTOCOL_FEE_BPS,
            real_estate_address: treasury,
            digital_house_address: treasury,
            convexo_address: treasury,
            credential_seed: hex::encode(credential_seed),
        }
    }

    /// Parse and validate a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DigitalHouseError::Configuration(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field the engine relies on.
    pub fn validate(&self) -> Result<()> {
        if self.owner.is_zero() {
            return Err(DigitalHouseError::Configuration(
                "owner must not be the zero address".into(),
            ));
        }
        if self.treasury.is_zero() {
            return Err(DigitalHouseError::Configuration(
                "treasury must not be the zero address".into(),
            ));
        }
        if self.currency.decimals != constants::CURRENCY_DECIMALS {
            return Err(DigitalHouseError::Configuration(format!(
                "currency {} has {} decimals, only {} are supported",
                self.currency.symbol,
                self.currency.decimals,
                constants::CURRENCY_DECIMALS
            )));
        }
        if u64::from(self.protocol_fee_bps) > constants::BPS_DENOMINATOR {
            return Err(DigitalHouseError::Configuration(format!(
                "protocol_fee_bps {} exceeds {}",
                self.protocol_fee_bps,
                constants::BPS_DENOMINATOR
            )));
        }
        self.credential_seed_bytes()?;
        Ok(())
    }

    /// Decode the credential signing seed.
    pub fn credential_seed_bytes(&self) -> Result<[u8; 32]> {
        let bytes = hex::decode(self.credential_seed.trim()).map_err(|e| {
            DigitalHouseError::Configuration(format!("credential_seed is not hex: {e}"))
        })?;
        bytes.try_into().map_err(|v: Vec<u8>| {
            DigitalHouseError::Configuration(format!(
                "credential_seed must be 32 bytes, got {}",
                v.len()
            ))
        })
    }
}
