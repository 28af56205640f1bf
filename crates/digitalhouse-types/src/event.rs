//! Events and value-movement journal entries.
//!
//! Registries and vaults append events as they commit state changes; hosts
//! drain them to publish notifications. [`Transfer`]s are the outbound value
//! movements the host's payment layer must execute.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, BidClosure, BidId, ReservationId, VaultAddress};

/// Registry-level lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    VaultCreated {
        vault_id: String,
        vault_address: VaultAddress,
        base_price: Amount,
    },
    VaultDeactivated {
        vault_id: String,
    },
    VaultActivated {
        vault_id: String,
    },
}

/// Vault-level lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
    Reserved {
        reservation_id: ReservationId,
        booker: AccountId,
        stake_amount: Amount,
        check_in_date: DateTime<Utc>,
        check_out_date: DateTime<Utc>,
    },
    BidPlaced {
        bid_id: BidId,
        bidder: AccountId,
        amount: Amount,
    },
    BidRefunded {
        bid_id: BidId,
        bidder: AccountId,
        amount: Amount,
        closure: BidClosure,
    },
    ReservationKept {
        reservation_id: ReservationId,
    },
    ReservationCeded {
        from: AccountId,
        to: AccountId,
        lead: Amount,
        booker_payout: Amount,
        protocol_fee: Amount,
    },
    CheckedIn {
        reservation_id: ReservationId,
        booker: AccountId,
    },
    Settled {
        reservation_id: ReservationId,
        booker: AccountId,
        released: Amount,
        expired: bool,
    },
}

/// Why value left the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferReason {
    /// A bid amount returned to its bidder.
    BidRefund,
    /// The stake returned to the booker at the end of the booking.
    StakeRelease,
    /// Stake plus premium paid to a booker who ceded.
    CedeProceeds,
    /// Protocol share of a cede.
    ProtocolFee,
}

impl std::fmt::Display for TransferReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BidRefund => write!(f, "BID_REFUND"),
            Self::StakeRelease => write!(f, "STAKE_RELEASE"),
            Self::CedeProceeds => write!(f, "CEDE_PROCEEDS"),
            Self::ProtocolFee => write!(f, "PROTOCOL_FEE"),
        }
    }
}

/// Outbound value movement from a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub recipient: AccountId,
    pub amount: Amount,
    pub reason: TransferReason,
    pub at: DateTime<Utc>,
}

/// Record of one cede: the booking passed from `from` to `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CessionRecord {
    /// The reservation that was closed.
    pub closed_reservation: ReservationId,
    /// The reservation opened for the new holder.
    pub opened_reservation: ReservationId,
    pub from: AccountId,
    pub to: AccountId,
    pub stake: Amount,
    pub lead: Amount,
    pub booker_payout: Amount,
    pub protocol_fee: Amount,
    pub at: DateTime<Utc>,
}

impl CessionRecord {
    /// What the ceding booker earned on top of getting the stake back.
    #[must_use]
    pub fn premium(&self) -> Amount {
        self.booker_payout.saturating_sub(self.stake)
    }
}
