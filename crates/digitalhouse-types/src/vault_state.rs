//! Vault lifecycle and read models.
//!
//! ## State Machine
//!
//! ```text
//!            reserve            keep
//!   ┌──────┐ ─────▶ ┌─────────┐ ────▶ ┌──────┐
//!   │ FREE │        │ BIDDING │       │ KEPT │
//!   └──────┘        └┬──┬───┬─┘       └┬──┬──┘
//!              cede ─┘  │   │ check-in │  │
//!            (self-loop)│   ▼          ▼  │
//!                       │  ┌──────────┐   │
//!                       │  │ OCCUPIED │   │
//!                       │  └────┬─────┘   │
//!                       │       │ check-out / expire
//!                       ▼       ▼         ▼
//!                      ┌──────────────────┐
//!                      │     SETTLED      │
//!                      └──────────────────┘
//! ```
//!
//! `BIDDING`, `KEPT` and `OCCUPIED` all report the public phase `AUCTION`:
//! a reservation is held. `SETTLED` is terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, AuctionBid, Reservation, VaultAddress};

/// Internal vault state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VaultState {
    /// No reservation. Open for `reserve`.
    Free,
    /// Reservation held, secondary market open.
    Bidding,
    /// Booker chose to keep the reservation. Bidding permanently closed.
    Kept,
    /// Booker checked in. Bidding closed.
    Occupied,
    /// Booking finished. Terminal.
    Settled,
}

impl VaultState {
    /// Public three-valued phase.
    #[must_use]
    pub fn phase(self) -> VaultPhase {
        match self {
            Self::Free => VaultPhase::Free,
            Self::Bidding | Self::Kept | Self::Occupied => VaultPhase::Auction,
            Self::Settled => VaultPhase::Settled,
        }
    }

    /// Whether a reservation is held in this state.
    #[must_use]
    pub fn holds_reservation(self) -> bool {
        matches!(self, Self::Bidding | Self::Kept | Self::Occupied)
    }

    #[must_use]
    pub fn accepts_bids(self) -> bool {
        self == Self::Bidding
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Settled
    }

    /// Can the vault move from this state to `target`?
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Free, Self::Bidding)
                | (
                    Self::Bidding,
                    Self::Bidding | Self::Kept | Self::Occupied | Self::Settled
                )
                | (Self::Kept, Self::Occupied | Self::Settled)
                | (Self::Occupied, Self::Settled)
        )
    }
}

impl std::fmt::Display for VaultState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "FREE"),
            Self::Bidding => write!(f, "BIDDING"),
            Self::Kept => write!(f, "KEPT"),
            Self::Occupied => write!(f, "OCCUPIED"),
            Self::Settled => write!(f, "SETTLED"),
        }
    }
}

/// Public vault phase, numbered as the frontend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VaultPhase {
    Free = 0,
    Auction = 1,
    Settled = 2,
}

impl VaultPhase {
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for VaultPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "FREE"),
            Self::Auction => write!(f, "AUCTION"),
            Self::Settled => write!(f, "SETTLED"),
        }
    }
}

/// Registry entry for one vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultInfo {
    pub vault_address: VaultAddress,
    pub vault_id: String,
    pub property_details: String,
    pub base_price: Amount,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Point-in-time view of a vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub id: String,
    pub address: VaultAddress,
    pub property_details: String,
    pub base_price: Amount,
    pub state: VaultState,
    pub phase: VaultPhase,
    pub current_nonce: u64,
    pub is_active: bool,
    pub reservation: Option<Reservation>,
    pub bids: Vec<AuctionBid>,
    /// Value currently held in escrow.
    pub escrowed: Amount,
}

/// Per-account dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub owned_vaults: usize,
    pub active_reservations: usize,
    pub active_bids: usize,
    /// Premiums earned by ceding reservations.
    pub total_earnings: Amount,
}

impl UserStats {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
