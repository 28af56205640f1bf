//! # digitalhouse-vault
//!
//! **Booking Plane**: one property's reservation, secondary-market auction,
//! and settlement, with every unit of value tracked in escrow.
//!
//! ## Architecture
//!
//! A [`Vault`] owns:
//! 1. **Reservation**: the stake-backed booking and its nonce
//! 2. **Bids**: the auction for taking the booking over
//! 3. **EscrowLedger**: one entry per escrowed stake or bid
//! 4. **SettlementPolicy**: how a cede splits the incremental value
//!
//! ## Operation Flow
//!
//! ```text
//! reserve → place_bid* → decide(keep | cede) → check_in → check_out
//!                                                   └──── expire ────┘
//! ```
//!
//! Every operation is staged, verified against the escrow invariant, and
//! only then committed. A rejected operation changes nothing.

pub mod escrow;
pub mod settlement;
pub mod vault;

pub use escrow::{EscrowEntry, EscrowKey, EscrowLedger};
pub use settlement::{CessionSplit, SettlementPolicy, split};
pub use vault::{Decision, Vault, VaultSetup};
