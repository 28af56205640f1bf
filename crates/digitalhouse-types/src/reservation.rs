//! Reservation and auction bid records.
//!
//! ## Bid lifecycle
//!
//! ```text
//!   ┌────────┐  outbid / keep / check-in / settle   ┌──────────┐
//!   │ ACTIVE ├─────────────────────────────────────▶│ REFUNDED │
//!   └───┬────┘                                      └──────────┘
//!       │ cede
//!       ▼
//!   ┌──────────┐
//!   │ CONSUMED │
//!   └──────────┘
//! ```
//!
//! Closing is one-way. A second close on the same bid is a double refund and
//! is reported as a ledger inconsistency.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, BidId, DigitalHouseError, ReservationId, Result, stay_nights};

/// A booking held in a vault by a staking party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    /// Current holder of the booking.
    pub booker: AccountId,
    /// Value escrowed against this reservation.
    pub stake_amount: Amount,
    /// Holder's claim on the escrowed stake, minted 1:1 with it.
    pub shares: Amount,
    pub check_in_date: DateTime<Utc>,
    pub check_out_date: DateTime<Utc>,
    /// Version counter, bumped by every state-changing action against this
    /// reservation. Booker actions must present the value they last saw.
    pub nonce: u64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Open a reservation at nonce 0.
    #[must_use]
    pub fn new(
        booker: AccountId,
        stake_amount: Amount,
        check_in_date: DateTime<Utc>,
        check_out_date: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReservationId::new(),
            booker,
            stake_amount,
            shares: stake_amount,
            check_in_date,
            check_out_date,
            nonce: 0,
            is_active: true,
            created_at,
        }
    }

    /// Hand the booking over to `new_booker`: same dates, same escrowed stake
    /// and shares, fresh id and nonce.
    #[must_use]
    pub fn transferred_to(&self, new_booker: AccountId, at: DateTime<Utc>) -> Self {
        Self {
            id: ReservationId::new(),
            booker: new_booker,
            stake_amount: self.stake_amount,
            shares: self.shares,
            check_in_date: self.check_in_date,
            check_out_date: self.check_out_date,
            nonce: 0,
            is_active: true,
            created_at: at,
        }
    }

    pub fn bump_nonce(&mut self) {
        self.nonce += 1;
    }

    /// Check-in date has been reached.
    #[must_use]
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.check_in_date
    }

    /// Check-out date has been reached.
    #[must_use]
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now >= self.check_out_date
    }

    #[must_use]
    pub fn nights(&self) -> u64 {
        stay_nights(self.check_in_date, self.check_out_date)
    }
}

/// Why a bid stopped being active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BidClosure {
    /// Superseded by a higher bid; refunded.
    Outbid,
    /// The booker kept the reservation; refunded.
    RefundedOnKeep,
    /// The booker checked in, closing the window; refunded.
    RefundedOnCheckIn,
    /// The booking settled (check-out or expiry); refunded.
    RefundedOnSettle,
    /// Won a cede; the amount paid out the previous booker and protocol.
    Consumed,
}

impl BidClosure {
    /// `true` when the bidder got their amount back.
    #[must_use]
    pub fn is_refund(self) -> bool {
        !matches!(self, Self::Consumed)
    }
}

impl std::fmt::Display for BidClosure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outbid => write!(f, "OUTBID"),
            Self::RefundedOnKeep => write!(f, "REFUNDED_ON_KEEP"),
            Self::RefundedOnCheckIn => write!(f, "REFUNDED_ON_CHECK_IN"),
            Self::RefundedOnSettle => write!(f, "REFUNDED_ON_SETTLE"),
            Self::Consumed => write!(f, "CONSUMED"),
        }
    }
}

/// An offer to take over the current reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionBid {
    pub id: BidId,
    /// The reservation this bid competes for.
    pub reservation_id: ReservationId,
    pub bidder: AccountId,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
    pub is_active: bool,
    /// Set exactly once, when the bid becomes inactive.
    pub closure: Option<BidClosure>,
}

impl AuctionBid {
    #[must_use]
    pub fn new(
        reservation_id: ReservationId,
        bidder: AccountId,
        amount: Amount,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BidId::new(),
            reservation_id,
            bidder,
            amount,
            timestamp,
            is_active: true,
            closure: None,
        }
    }

    /// Deactivate the bid.
    ///
    /// # Errors
    /// Returns `LedgerInconsistency` if the bid was already closed.
    pub fn close(&mut self, closure: BidClosure) -> Result<()> {
        if !self.is_active {
            return Err(DigitalHouseError::LedgerInconsistency {
                reason: format!(
                    "bid {} already closed ({}), cannot close as {closure}",
                    self.id,
                    self.closure.map_or_else(|| "?".to_string(), |c| c.to_string()),
                ),
            });
        }
        self.is_active = false;
        self.closure = Some(closure);
        Ok(())
    }
}
