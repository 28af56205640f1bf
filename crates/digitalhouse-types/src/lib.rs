//! # digitalhouse-types
//!
//! Shared types, errors, and configuration for the **Digital House** vault
//! engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`VaultAddress`], [`ReservationId`], [`BidId`]
//! - **Amounts**: [`Amount`] plus PYUSD formatting/parsing helpers
//! - **Booking model**: [`Reservation`], [`AuctionBid`], [`BidClosure`]
//! - **Vault model**: [`VaultState`], [`VaultPhase`], [`VaultInfo`], [`VaultSnapshot`], [`UserStats`]
//! - **Events & journal**: [`RegistryEvent`], [`VaultEvent`], [`Transfer`], [`CessionRecord`]
//! - **Access**: [`AccessCredential`], [`CredentialIssuer`], [`CallContext`]
//! - **Configuration**: [`RegistryConfig`], [`CurrencyConfig`]
//! - **Errors**: [`DigitalHouseError`] with `DH_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod amount;
pub mod config;
pub mod constants;
pub mod context;
pub mod credential;
pub mod error;
pub mod event;
pub mod ids;
pub mod reservation;
pub mod vault_state;

// Re-export all primary types at crate root for ergonomic imports:
//   use digitalhouse_types::{AccountId, Reservation, VaultState, ...};

pub use amount::*;
pub use config::*;
pub use context::*;
pub use credential::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use reservation::*;
pub use vault_state::*;

// Constants are accessed via `digitalhouse_types::constants::FOO`
// (not re-exported to avoid name collisions).
