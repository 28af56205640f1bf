//! # digitalhouse-registry
//!
//! **Admin Plane**: the vault factory. Creates one [`Vault`] per unique
//! identifier, indexes them by id and address, and owns their activation
//! flag.
//!
//! ## Architecture
//!
//! ```text
//! owner ──create_vault / deactivate / activate──▶ VaultRegistry
//!                                                   │ owns
//!                                                   ▼
//! booker, bidders ──reserve / bid / decide / ...──▶ Vault (one per id)
//! ```
//!
//! Identifiers are never reused, even after deactivation.
//!
//! [`Vault`]: digitalhouse_vault::Vault

pub mod handle;
pub mod registry;

pub use handle::VaultHandle;
pub use registry::VaultRegistry;
