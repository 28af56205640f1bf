//! Access credentials issued at check-in.
//!
//! A credential is scoped to one vault and one reservation. It carries a
//! SHA-256 digest of its canonical payload and an ed25519 signature over that
//! digest from the registry's credential key, so a property's lock or host
//! can verify it offline with only the registry's public key.

use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{AccountId, DigitalHouseError, Reservation, ReservationId, Result, VaultAddress, constants};

/// Signed proof that `holder` may access the property during the stay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCredential {
    pub vault_address: VaultAddress,
    pub reservation_id: ReservationId,
    pub holder: AccountId,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
    /// SHA-256 of the canonical signing payload.
    pub digest: [u8; 32],
    /// Ed25519 signature over `digest`.
    pub signature: Vec<u8>,
}

impl AccessCredential {
    /// Canonical payload.
    ///
    /// Format: `"digitalhouse:access:v1:" || vault || reservation || holder || valid_from || valid_until`
    #[must_use]
    pub fn signing_payload(
        vault_address: &VaultAddress,
        reservation_id: &ReservationId,
        holder: &AccountId,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> Vec<u8> {
        let mut payload = Vec::with_capacity(128);
        payload.extend_from_slice(constants::CREDENTIAL_DOMAIN);
        payload.extend_from_slice(vault_address.as_bytes());
        payload.extend_from_slice(reservation_id.0.as_bytes());
        payload.extend_from_slice(holder.as_bytes());
        payload.extend_from_slice(&valid_from.timestamp().to_le_bytes());
        payload.extend_from_slice(&valid_until.timestamp().to_le_bytes());
        payload
    }

    fn compute_digest(&self) -> [u8; 32] {
        Sha256::digest(Self::signing_payload(
            &self.vault_address,
            &self.reservation_id,
            &self.holder,
            self.valid_from,
            self.valid_until,
        ))
        .into()
    }

    /// Opaque token form (hex digest) for display or QR encoding.
    #[must_use]
    pub fn token(&self) -> String {
        hex::encode(self.digest)
    }

    /// Verify integrity and signature against the issuer's public key.
    ///
    /// # Errors
    /// Returns `Credential` if any field was altered or the signature is not
    /// from `issuer`.
    pub fn verify(&self, issuer: &VerifyingKey) -> Result<()> {
        if self.compute_digest() != self.digest {
            return Err(DigitalHouseError::Credential(format!(
                "digest mismatch for reservation {}",
                self.reservation_id
            )));
        }
        let signature = Signature::from_slice(&self.signature)
            .map_err(|e| DigitalHouseError::Credential(format!("malformed signature: {e}")))?;
        issuer
            .verify(&self.digest, &signature)
            .map_err(|e| DigitalHouseError::Credential(format!("bad signature: {e}")))
    }

    /// Whether the stay window covers `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.valid_from && now < self.valid_until
    }
}

/// Holds the key that signs access credentials.
#[derive(Clone)]
pub struct CredentialIssuer {
    signing_key: SigningKey,
}

impl CredentialIssuer {
    #[must_use]
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Issue a credential for the reservation's stay window.
    #[must_use]
    pub fn issue(
        &self,
        vault_address: VaultAddress,
        reservation: &Reservation,
        issued_at: DateTime<Utc>,
    ) -> AccessCredential {
        let mut credential = AccessCredential {
            vault_address,
            reservation_id: reservation.id,
            holder: reservation.booker,
            valid_from: reservation.check_in_date,
            valid_until: reservation.check_out_date,
            issued_at,
            digest: [0u8; 32],
            signature: Vec::new(),
        };
        credential.digest = credential.compute_digest();
        credential.signature = self.signing_key.sign(&credential.digest).to_bytes().to_vec();
        credential
    }
}

impl std::fmt::Debug for CredentialIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialIssuer")
            .field("verifying_key", &hex::encode(self.verifying_key().as_bytes()))
            .finish_non_exhaustive()
    }
}
