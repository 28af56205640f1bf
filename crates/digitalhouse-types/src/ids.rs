//! Identifiers used throughout Digital House.
//!
//! Accounts and vault addresses are 20-byte, `0x`-prefixed hex handles
//! (wallet-style). Reservations and bids use UUIDv7 for time-ordered sorting.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{DigitalHouseError, Result, constants};

/// Implements hex parsing, display and string serde for a 20-byte handle.
macro_rules! address_type {
    ($name:ident, $what:literal) => {
        impl $name {
            /// The all-zero handle.
            pub const ZERO: Self = Self([0u8; constants::ADDRESS_LEN]);

            #[must_use]
            pub fn from_bytes(bytes: [u8; constants::ADDRESS_LEN]) -> Self {
                Self(bytes)
            }

            #[must_use]
            pub fn as_bytes(&self) -> &[u8; constants::ADDRESS_LEN] {
                &self.0
            }

            /// Parse from hex, with or without a `0x` prefix.
            pub fn from_hex(s: &str) -> Result<Self> {
                let digits = s
                    .strip_prefix("0x")
                    .or_else(|| s.strip_prefix("0X"))
                    .unwrap_or(s);
                let bytes = hex::decode(digits).map_err(|e| DigitalHouseError::InvalidArgument {
                    reason: format!(concat!("invalid ", $what, " {}: {}"), s, e),
                })?;
                let bytes: [u8; constants::ADDRESS_LEN] =
                    bytes
                        .try_into()
                        .map_err(|v: Vec<u8>| DigitalHouseError::InvalidArgument {
                            reason: format!(
                                concat!("invalid ", $what, " {}: expected {} bytes, got {}"),
                                s,
                                constants::ADDRESS_LEN,
                                v.len()
                            ),
                        })?;
                Ok(Self(bytes))
            }

            /// Abbreviated form for display, e.g. `0x1a2b...9f0e`.
            #[must_use]
            pub fn short(&self) -> String {
                let full = hex::encode(self.0);
                format!("0x{}...{}", &full[..4], &full[full.len() - 4..])
            }

            #[must_use]
            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; constants::ADDRESS_LEN]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl std::str::FromStr for $name {
            type Err = DigitalHouseError;

            fn from_str(s: &str) -> Result<Self> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// Authenticated identity of a caller (wallet address).
///
/// The wallet/auth layer is responsible for proving the caller controls this
/// account; the engine only compares identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct AccountId(pub [u8; constants::ADDRESS_LEN]);

address_type!(AccountId, "account");

/// Random account for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl AccountId {
    pub fn random() -> Self {
        Self(rand::random::<[u8; constants::ADDRESS_LEN]>())
    }
}

// ---------------------------------------------------------------------------
// VaultAddress
// ---------------------------------------------------------------------------

/// Opaque handle to a vault instance, assigned by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct VaultAddress(pub [u8; constants::ADDRESS_LEN]);

address_type!(VaultAddress, "vault address");

impl VaultAddress {
    /// Deterministic address for the `sequence`-th vault created by `owner`.
    ///
    /// `SHA-256("digitalhouse:vault:v1:" || owner || sequence || vault_id)[..20]`
    #[must_use]
    pub fn derive(owner: &AccountId, sequence: u64, vault_id: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(constants::VAULT_ADDRESS_DOMAIN);
        hasher.update(owner.as_bytes());
        hasher.update(sequence.to_le_bytes());
        hasher.update(vault_id.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; constants::ADDRESS_LEN];
        bytes.copy_from_slice(&hash[..constants::ADDRESS_LEN]);
        Self(bytes)
    }
}

// ---------------------------------------------------------------------------
// ReservationId
// ---------------------------------------------------------------------------

/// Unique identifier for a reservation. A cede closes one reservation and
/// opens a new one, so ids are never shared between holders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ReservationId(pub Uuid);

impl ReservationId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rsv:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// BidId
// ---------------------------------------------------------------------------

/// Unique identifier for an auction bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BidId(pub Uuid);

impl BidId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for BidId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bid:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_hex_roundtrip() {
        let s = "0xcac524bca292aaade2df8a05cc58f0a65b1b3bb9";
        let account = AccountId::from_hex(s).unwrap();
        assert_eq!(account.to_string(), s);
        assert_eq!(
            AccountId::from_hex("CaC524BcA292aaade2DF8A05cC58F0a65B1B3bB9").unwrap(),
            account
        );
    }

    #[test]
    fn account_rejects_bad_hex() {
        assert!(matches!(
            AccountId::from_hex("0x1234"),
            Err(DigitalHouseError::InvalidArgument { .. })
        ));
        assert!(matches!(
            AccountId::from_hex("0xzz"),
            Err(DigitalHouseError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn short_form() {
        let account = AccountId::from_hex("0x1a2b000000000000000000000000000000009f0e").unwrap();
        assert_eq!(account.short(), "0x1a2b...9f0e");
    }

    #[test]
    fn vault_address_derivation_is_deterministic() {
        let owner = AccountId::random();
        let a = VaultAddress::derive(&owner, 0, "VAULT-001");
        let b = VaultAddress::derive(&owner, 0, "VAULT-001");
        assert_eq!(a, b);
        assert!(!a.is_zero());
        assert_ne!(a, VaultAddress::derive(&owner, 1, "VAULT-001"));
        assert_ne!(a, VaultAddress::derive(&owner, 0, "VAULT-002"));
    }

    #[test]
    fn reservation_ids_are_v7() {
        let a = ReservationId::new();
        let b = ReservationId::new();
        assert_ne!(a, b);
        assert_eq!(a.0.get_version_num(), 7);
        assert!(b.to_string().starts_with("rsv:"));
    }

    #[test]
    fn address_serializes_as_hex_string() {
        let account = AccountId::random();
        let json = serde_json::to_string(&account).unwrap();
        assert_eq!(json, format!("\"{account}\""));
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(account, back);
    }
}
