//! Vault: one property's reservation, auction and settlement state machine.
//!
//! Every mutating operation runs against a staged copy of the booking state
//! (reservation, bids, escrow ledger). The escrow invariant is verified on the
//! staged copy; only then is it committed together with the journal entries
//! (events, transfers, cession records). A failed operation leaves the vault
//! byte-for-byte unchanged.

use chrono::{DateTime, Utc};
use digitalhouse_types::{
    AccessCredential, AccountId, Amount, AuctionBid, BidClosure, BidId, CallContext,
    CessionRecord, CredentialIssuer, DigitalHouseError, Reservation, ReservationId, Result,
    Transfer, TransferReason, VaultAddress, VaultEvent, VaultPhase, VaultSnapshot, VaultState,
};
use serde::{Deserialize, Serialize};

use crate::escrow::{EscrowKey, EscrowLedger};
use crate::settlement::SettlementPolicy;

/// Everything needed to open a vault.
#[derive(Debug, Clone)]
pub struct VaultSetup {
    pub id: String,
    pub address: VaultAddress,
    pub property_details: String,
    pub base_price: Amount,
    pub created_at: DateTime<Utc>,
    /// Receives the protocol share of cedes.
    pub treasury: AccountId,
    pub policy: SettlementPolicy,
    pub issuer: CredentialIssuer,
}

/// Result of [`Vault::decide`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Booker kept the reservation; the listed refunds went to bidders.
    Kept { refunds: Vec<Transfer> },
    /// Booker ceded the reservation to the leading bidder.
    Ceded(CessionRecord),
}

/// Fixed terms of the vault plus the registry-controlled active flag.
#[derive(Debug, Clone)]
struct Terms {
    id: String,
    address: VaultAddress,
    property_details: String,
    base_price: Amount,
    created_at: DateTime<Utc>,
    treasury: AccountId,
    policy: SettlementPolicy,
    issuer: CredentialIssuer,
    is_active: bool,
}

/// Mutable booking state. Cloned, mutated and verified before commit.
#[derive(Debug, Clone)]
struct Book {
    state: VaultState,
    reservation: Option<Reservation>,
    bids: Vec<AuctionBid>,
    ledger: EscrowLedger,
}

/// Journal output of one operation, appended only on commit.
#[derive(Debug, Default)]
struct Effects {
    events: Vec<VaultEvent>,
    transfers: Vec<Transfer>,
    cessions: Vec<CessionRecord>,
    closed: Vec<Reservation>,
    credential: Option<AccessCredential>,
}

impl Effects {
    fn pay(
        &mut self,
        recipient: AccountId,
        amount: Amount,
        reason: TransferReason,
        at: DateTime<Utc>,
    ) {
        if amount > 0 {
            self.transfers.push(Transfer {
                recipient,
                amount,
                reason,
                at,
            });
        }
    }
}

impl Book {
    /// Stake of the active reservation plus every active bid.
    fn expected_held(&self) -> Result<Amount> {
        let stake = self
            .reservation
            .as_ref()
            .filter(|r| r.is_active)
            .map_or(0, |r| r.stake_amount);
        self.bids
            .iter()
            .filter(|b| b.is_active)
            .try_fold(stake, |acc, b| acc.checked_add(b.amount))
            .ok_or_else(|| DigitalHouseError::LedgerInconsistency {
                reason: "active stake plus bids overflows".into(),
            })
    }

    fn verify(&self) -> Result<()> {
        self.ledger.verify(self.expected_held()?)
    }

    fn leading_index(&self) -> Option<usize> {
        self.bids
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_active)
            .max_by_key(|(_, b)| b.amount)
            .map(|(i, _)| i)
    }

    fn transition(&mut self, operation: &'static str, target: VaultState) -> Result<()> {
        if !self.state.can_transition_to(target) {
            return Err(DigitalHouseError::InvalidState {
                operation,
                state: self.state,
                reason: format!("no transition to {target}"),
            });
        }
        self.state = target;
        Ok(())
    }

    /// The active reservation, or `InvalidState` when there is none.
    fn held_reservation(&self, operation: &'static str) -> Result<&Reservation> {
        self.reservation
            .as_ref()
            .filter(|r| r.is_active && self.state.holds_reservation())
            .ok_or_else(|| DigitalHouseError::InvalidState {
                operation,
                state: self.state,
                reason: "no active reservation".into(),
            })
    }

    fn held_reservation_mut(&mut self, operation: &'static str) -> Result<&mut Reservation> {
        let state = self.state;
        self.reservation
            .as_mut()
            .filter(|r| r.is_active && state.holds_reservation())
            .ok_or_else(|| DigitalHouseError::InvalidState {
                operation,
                state,
                reason: "no active reservation".into(),
            })
    }

    /// Close one bid and return its escrowed amount to the bidder.
    fn refund_bid(
        &mut self,
        index: usize,
        closure: BidClosure,
        at: DateTime<Utc>,
        fx: &mut Effects,
    ) -> Result<()> {
        let bid = &mut self.bids[index];
        bid.close(closure)?;
        let entry = self.ledger.release(EscrowKey::Bid(bid.id))?;
        if entry.owner != bid.bidder || entry.amount != bid.amount {
            return Err(DigitalHouseError::LedgerInconsistency {
                reason: format!(
                    "escrow for {} holds {} for {}, bid records {} for {}",
                    bid.id, entry.amount, entry.owner, bid.amount, bid.bidder
                ),
            });
        }
        fx.pay(bid.bidder, bid.amount, TransferReason::BidRefund, at);
        fx.events.push(VaultEvent::BidRefunded {
            bid_id: bid.id,
            bidder: bid.bidder,
            amount: bid.amount,
            closure,
        });
        Ok(())
    }

    fn refund_active_bids(
        &mut self,
        closure: BidClosure,
        at: DateTime<Utc>,
        fx: &mut Effects,
    ) -> Result<()> {
        let active: Vec<usize> = self
            .bids
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_active)
            .map(|(i, _)| i)
            .collect();
        for index in active {
            self.refund_bid(index, closure, at, fx)?;
        }
        Ok(())
    }

    /// End the booking: refund bids, return the stake, close the reservation.
    fn settle(
        &mut self,
        operation: &'static str,
        expired: bool,
        at: DateTime<Utc>,
        fx: &mut Effects,
    ) -> Result<Amount> {
        self.refund_active_bids(BidClosure::RefundedOnSettle, at, fx)?;

        let reservation = self.held_reservation_mut(operation)?;
        let (id, booker, stake) = (reservation.id, reservation.booker, reservation.stake_amount);
        reservation.is_active = false;
        reservation.bump_nonce();

        let entry = self.ledger.release(EscrowKey::Stake(id))?;
        if entry.owner != booker || entry.amount != stake {
            return Err(DigitalHouseError::LedgerInconsistency {
                reason: format!(
                    "stake escrow for {id} holds {} for {}, reservation records {stake} for {booker}",
                    entry.amount, entry.owner
                ),
            });
        }
        fx.pay(booker, stake, TransferReason::StakeRelease, at);
        self.transition(operation, VaultState::Settled)?;
        fx.events.push(VaultEvent::Settled {
            reservation_id: id,
            booker,
            released: stake,
            expired,
        });
        Ok(stake)
    }
}

fn check_booker(
    reservation: &Reservation,
    caller: &AccountId,
    operation: &'static str,
) -> Result<()> {
    if reservation.booker != *caller {
        return Err(DigitalHouseError::Unauthorized {
            reason: format!("{operation} is reserved to the current booker"),
        });
    }
    Ok(())
}

fn check_nonce(reservation: &Reservation, presented: u64) -> Result<()> {
    if reservation.nonce != presented {
        return Err(DigitalHouseError::StaleNonce {
            presented,
            current: reservation.nonce,
        });
    }
    Ok(())
}

/// One property's booking ledger.
#[derive(Debug, Clone)]
pub struct Vault {
    terms: Terms,
    book: Book,
    current_nonce: u64,
    closed_reservations: Vec<Reservation>,
    transfers: Vec<Transfer>,
    cessions: Vec<CessionRecord>,
    credential: Option<AccessCredential>,
    events: Vec<VaultEvent>,
}

impl Vault {
    /// Open a vault in `FREE`.
    ///
    /// # Errors
    /// `InvalidArgument` if the id is empty or the base price is zero.
    pub fn new(setup: VaultSetup) -> Result<Self> {
        if setup.id.is_empty() {
            return Err(DigitalHouseError::InvalidArgument {
                reason: "Vault ID required".into(),
            });
        }
        if setup.base_price == 0 {
            return Err(DigitalHouseError::InvalidArgument {
                reason: "Base price must be > 0".into(),
            });
        }
        Ok(Self {
            terms: Terms {
                id: setup.id,
                address: setup.address,
                property_details: setup.property_details,
                base_price: setup.base_price,
                created_at: setup.created_at,
                treasury: setup.treasury,
                policy: setup.policy,
                issuer: setup.issuer,
                is_active: true,
            },
            book: Book {
                state: VaultState::Free,
                reservation: None,
                bids: Vec::new(),
                ledger: EscrowLedger::new(),
            },
            current_nonce: 0,
            closed_reservations: Vec::new(),
            transfers: Vec::new(),
            cessions: Vec::new(),
            credential: None,
            events: Vec::new(),
        })
    }

    /// Stage `op` on a copy of the booking state, verify the escrow
    /// invariant, then commit state and journal together.
    fn commit<T>(
        &mut self,
        operation: &'static str,
        op: impl FnOnce(&Terms, &mut Book, &mut Effects) -> Result<T>,
    ) -> Result<T> {
        let mut staged = self.book.clone();
        let mut fx = Effects::default();

        let outcome = op(&self.terms, &mut staged, &mut fx).and_then(|out| {
            staged.verify()?;
            Ok(out)
        });
        let out = match outcome {
            Ok(out) => out,
            Err(err) => {
                if err.is_invariant_violation() {
                    tracing::error!(
                        vault_id = %self.terms.id,
                        operation,
                        error = %err,
                        "escrow invariant violated, operation aborted"
                    );
                } else {
                    tracing::debug!(
                        vault_id = %self.terms.id,
                        operation,
                        code = err.code(),
                        "operation rejected"
                    );
                }
                return Err(err);
            }
        };

        self.book = staged;
        self.current_nonce += 1;
        self.events.append(&mut fx.events);
        self.transfers.append(&mut fx.transfers);
        self.cessions.append(&mut fx.cessions);
        self.closed_reservations.append(&mut fx.closed);
        if let Some(credential) = fx.credential {
            self.credential = Some(credential);
        }
        Ok(out)
    }

    // =================================================================
    // Reservation
    // =================================================================

    /// Stake `stake_amount` to hold the property from `check_in` to
    /// `check_out`. Opens the secondary market.
    ///
    /// # Errors
    /// - `InvalidState` if the vault is deactivated or not `FREE`
    /// - `InsufficientStake` if the stake is below the base price
    /// - `InvalidDates` if `check_in >= check_out` or check-in is in the past
    pub fn reserve(
        &mut self,
        ctx: &CallContext,
        stake_amount: Amount,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    ) -> Result<ReservationId> {
        let id = self.commit("reserve", |terms, book, fx| {
            if !terms.is_active {
                return Err(DigitalHouseError::InvalidState {
                    operation: "reserve",
                    state: book.state,
                    reason: "vault is deactivated".into(),
                });
            }
            if book.state != VaultState::Free {
                return Err(DigitalHouseError::InvalidState {
                    operation: "reserve",
                    state: book.state,
                    reason: "vault already holds a booking".into(),
                });
            }
            if stake_amount < terms.base_price {
                return Err(DigitalHouseError::InsufficientStake {
                    stake: stake_amount,
                    base_price: terms.base_price,
                });
            }
            if check_in >= check_out {
                return Err(DigitalHouseError::InvalidDates {
                    reason: format!("check-in {check_in} is not before check-out {check_out}"),
                });
            }
            if check_in < ctx.now {
                return Err(DigitalHouseError::InvalidDates {
                    reason: format!("check-in {check_in} is in the past"),
                });
            }

            let reservation = Reservation::new(ctx.caller, stake_amount, check_in, check_out, ctx.now);
            book.ledger
                .lock(EscrowKey::Stake(reservation.id), ctx.caller, stake_amount)?;
            book.transition("reserve", VaultState::Bidding)?;
            fx.events.push(VaultEvent::Reserved {
                reservation_id: reservation.id,
                booker: ctx.caller,
                stake_amount,
                check_in_date: check_in,
                check_out_date: check_out,
            });
            let id = reservation.id;
            book.reservation = Some(reservation);
            Ok(id)
        })?;

        tracing::info!(
            vault_id = %self.terms.id,
            reservation = %id,
            booker = %ctx.caller,
            stake = stake_amount,
            "reservation opened"
        );
        Ok(id)
    }

    // =================================================================
    // Auction
    // =================================================================

    /// Bid `amount` to take over the current reservation. The previous leader
    /// is refunded.
    ///
    /// # Errors
    /// - `InvalidState` if bidding is closed (not `BIDDING`, or check-in reached)
    /// - `SelfBid` if the caller is the current booker
    /// - `BidTooLow` unless `amount` strictly exceeds the leader (or base price)
    pub fn place_bid(&mut self, ctx: &CallContext, amount: Amount) -> Result<BidId> {
        let bid_id = self.commit("place_bid", |terms, book, fx| {
            if !book.state.accepts_bids() {
                return Err(DigitalHouseError::InvalidState {
                    operation: "place_bid",
                    state: book.state,
                    reason: "bidding window is closed".into(),
                });
            }
            let reservation = book.held_reservation("place_bid")?;
            if reservation.has_started(ctx.now) {
                return Err(DigitalHouseError::InvalidState {
                    operation: "place_bid",
                    state: book.state,
                    reason: "check-in date reached".into(),
                });
            }
            if reservation.booker == ctx.caller {
                return Err(DigitalHouseError::SelfBid);
            }
            let reservation_id = reservation.id;

            let leader = book.leading_index();
            let must_exceed = leader.map_or(terms.base_price, |i| book.bids[i].amount);
            if amount <= must_exceed {
                return Err(DigitalHouseError::BidTooLow {
                    amount,
                    must_exceed,
                });
            }

            if let Some(index) = leader {
                book.refund_bid(index, BidClosure::Outbid, ctx.now, fx)?;
            }
            let bid = AuctionBid::new(reservation_id, ctx.caller, amount, ctx.now);
            book.ledger.lock(EscrowKey::Bid(bid.id), ctx.caller, amount)?;
            book.held_reservation_mut("place_bid")?.bump_nonce();
            fx.events.push(VaultEvent::BidPlaced {
                bid_id: bid.id,
                bidder: ctx.caller,
                amount,
            });
            let id = bid.id;
            book.bids.push(bid);
            Ok(id)
        })?;

        tracing::debug!(
            vault_id = %self.terms.id,
            bid = %bid_id,
            bidder = %ctx.caller,
            amount,
            "bid placed"
        );
        Ok(bid_id)
    }

    /// Booker's choice: keep the reservation (refund bidders, close the
    /// window for good) or cede it to the leading bidder.
    ///
    /// A cede is profitable when the lead exceeds the reservation's
    /// `stake_amount`. The successor inherits that stake unchanged, so after
    /// a cede the threshold for the new booker is still the original stake,
    /// not the bid they won with. The split is computed against the same
    /// stake.
    ///
    /// # Errors
    /// - `InvalidState` if there is no reservation, the vault is not
    ///   `BIDDING`, or check-in has been reached
    /// - `Unauthorized` if the caller is not the current booker
    /// - `StaleNonce` if `expected_nonce` is not the reservation's nonce
    /// - `NoProfitableBid` when ceding without a bid above the stake
    pub fn decide(&mut self, ctx: &CallContext, expected_nonce: u64, keep: bool) -> Result<Decision> {
        let decision = self.commit("decide", |terms, book, fx| {
            let reservation = book.held_reservation("decide")?;
            check_booker(reservation, &ctx.caller, "decide")?;
            if book.state != VaultState::Bidding {
                return Err(DigitalHouseError::InvalidState {
                    operation: "decide",
                    state: book.state,
                    reason: "decision already taken or window closed".into(),
                });
            }
            if reservation.has_started(ctx.now) {
                return Err(DigitalHouseError::InvalidState {
                    operation: "decide",
                    state: book.state,
                    reason: "check-in date reached".into(),
                });
            }
            check_nonce(reservation, expected_nonce)?;

            if keep {
                book.refund_active_bids(BidClosure::RefundedOnKeep, ctx.now, fx)?;
                book.transition("decide", VaultState::Kept)?;
                let reservation = book.held_reservation_mut("decide")?;
                reservation.bump_nonce();
                fx.events.push(VaultEvent::ReservationKept {
                    reservation_id: reservation.id,
                });
                return Ok(Decision::Kept {
                    refunds: fx.transfers.clone(),
                });
            }

            let stake = reservation.stake_amount;
            let Some(lead_index) = book.leading_index() else {
                return Err(DigitalHouseError::NoProfitableBid { lead: 0, stake });
            };
            let lead = book.bids[lead_index].clone();
            let split = terms.policy.split(stake, lead.amount)?;

            // Consume the winning bid; any other active bid is refunded.
            book.bids[lead_index].close(BidClosure::Consumed)?;
            let released = book.ledger.release(EscrowKey::Bid(lead.id))?;
            if released.amount != split.booker_payout + split.protocol_fee {
                return Err(DigitalHouseError::LedgerInconsistency {
                    reason: format!(
                        "cede pays out {} + {} but winning bid escrowed {}",
                        split.booker_payout, split.protocol_fee, released.amount
                    ),
                });
            }
            book.refund_active_bids(BidClosure::Outbid, ctx.now, fx)?;

            let previous = book.held_reservation_mut("decide")?;
            previous.is_active = false;
            previous.bump_nonce();
            let previous = previous.clone();
            let successor = previous.transferred_to(lead.bidder, ctx.now);
            book.ledger.reassign(
                EscrowKey::Stake(previous.id),
                EscrowKey::Stake(successor.id),
                successor.booker,
            )?;

            fx.pay(previous.booker, split.booker_payout, TransferReason::CedeProceeds, ctx.now);
            fx.pay(terms.treasury, split.protocol_fee, TransferReason::ProtocolFee, ctx.now);

            let record = CessionRecord {
                closed_reservation: previous.id,
                opened_reservation: successor.id,
                from: previous.booker,
                to: successor.booker,
                stake,
                lead: lead.amount,
                booker_payout: split.booker_payout,
                protocol_fee: split.protocol_fee,
                at: ctx.now,
            };
            fx.events.push(VaultEvent::ReservationCeded {
                from: previous.booker,
                to: successor.booker,
                lead: lead.amount,
                booker_payout: split.booker_payout,
                protocol_fee: split.protocol_fee,
            });
            fx.cessions.push(record.clone());
            fx.closed.push(previous);
            book.reservation = Some(successor);
            book.transition("decide", VaultState::Bidding)?;
            Ok(Decision::Ceded(record))
        })?;

        match &decision {
            Decision::Kept { refunds } => tracing::info!(
                vault_id = %self.terms.id,
                booker = %ctx.caller,
                refunds = refunds.len(),
                "reservation kept, bidding closed"
            ),
            Decision::Ceded(record) => tracing::info!(
                vault_id = %self.terms.id,
                from = %record.from,
                to = %record.to,
                lead = record.lead,
                booker_payout = record.booker_payout,
                protocol_fee = record.protocol_fee,
                "reservation ceded"
            ),
        }
        Ok(decision)
    }

    // =================================================================
    // Stay
    // =================================================================

    /// Check in: closes bidding and issues the access credential.
    ///
    /// # Errors
    /// - `InvalidState` outside `[check_in, check_out)`, or when not
    ///   `BIDDING`/`KEPT`
    /// - `Unauthorized` if the caller is not the current booker
    /// - `StaleNonce` if `expected_nonce` is stale
    pub fn check_in(&mut self, ctx: &CallContext, expected_nonce: u64) -> Result<AccessCredential> {
        let credential = self.commit("check_in", |terms, book, fx| {
            let reservation = book.held_reservation("check_in")?;
            check_booker(reservation, &ctx.caller, "check_in")?;
            if !matches!(book.state, VaultState::Bidding | VaultState::Kept) {
                return Err(DigitalHouseError::InvalidState {
                    operation: "check_in",
                    state: book.state,
                    reason: "already checked in".into(),
                });
            }
            if !reservation.has_started(ctx.now) {
                return Err(DigitalHouseError::InvalidState {
                    operation: "check_in",
                    state: book.state,
                    reason: format!("check-in opens at {}", reservation.check_in_date),
                });
            }
            if reservation.has_ended(ctx.now) {
                return Err(DigitalHouseError::InvalidState {
                    operation: "check_in",
                    state: book.state,
                    reason: format!("stay ended at {}", reservation.check_out_date),
                });
            }
            check_nonce(reservation, expected_nonce)?;

            book.refund_active_bids(BidClosure::RefundedOnCheckIn, ctx.now, fx)?;
            book.transition("check_in", VaultState::Occupied)?;
            let reservation = book.held_reservation_mut("check_in")?;
            reservation.bump_nonce();
            let credential = terms.issuer.issue(terms.address, reservation, ctx.now);
            fx.events.push(VaultEvent::CheckedIn {
                reservation_id: reservation.id,
                booker: reservation.booker,
            });
            fx.credential = Some(credential.clone());
            Ok(credential)
        })?;

        tracing::info!(
            vault_id = %self.terms.id,
            booker = %ctx.caller,
            token = %credential.token(),
            "checked in"
        );
        Ok(credential)
    }

    /// Check out: refunds outstanding bids, releases the stake to the booker
    /// and settles the vault.
    ///
    /// # Errors
    /// - `InvalidState` before the check-out date or without a reservation
    /// - `Unauthorized` if the caller is not the current booker
    /// - `StaleNonce` if `expected_nonce` is stale
    pub fn check_out(&mut self, ctx: &CallContext, expected_nonce: u64) -> Result<Vec<Transfer>> {
        let (released, transfers) = self.commit("check_out", |_, book, fx| {
            let reservation = book.held_reservation("check_out")?;
            check_booker(reservation, &ctx.caller, "check_out")?;
            if !reservation.has_ended(ctx.now) {
                return Err(DigitalHouseError::InvalidState {
                    operation: "check_out",
                    state: book.state,
                    reason: format!("check-out opens at {}", reservation.check_out_date),
                });
            }
            check_nonce(reservation, expected_nonce)?;
            let released = book.settle("check_out", false, ctx.now, fx)?;
            Ok((released, fx.transfers.clone()))
        })?;

        tracing::info!(
            vault_id = %self.terms.id,
            booker = %ctx.caller,
            released,
            "checked out, vault settled"
        );
        Ok(transfers)
    }

    /// Settle a booking whose period ended without a check-out. Callable by
    /// anyone; the stake goes back to the booker of record.
    ///
    /// # Errors
    /// `InvalidState` before the check-out date or without a reservation.
    pub fn expire(&mut self, ctx: &CallContext) -> Result<Vec<Transfer>> {
        let (released, transfers) = self.commit("expire", |_, book, fx| {
            let reservation = book.held_reservation("expire")?;
            if !reservation.has_ended(ctx.now) {
                return Err(DigitalHouseError::InvalidState {
                    operation: "expire",
                    state: book.state,
                    reason: format!("booking runs until {}", reservation.check_out_date),
                });
            }
            let released = book.settle("expire", true, ctx.now, fx)?;
            Ok((released, fx.transfers.clone()))
        })?;

        tracing::info!(
            vault_id = %self.terms.id,
            caller = %ctx.caller,
            released,
            "booking expired, vault settled"
        );
        Ok(transfers)
    }

    // =================================================================
    // Administration (driven by the registry)
    // =================================================================

    /// Block new reservations. Returns `false` if already inactive.
    ///
    /// A vault owned by a registry is only reachable through its booking
    /// handle, so there the flag moves via the registry alone.
    pub fn deactivate(&mut self) -> bool {
        std::mem::replace(&mut self.terms.is_active, false)
    }

    /// Allow new reservations again. Returns `false` if already active.
    pub fn activate(&mut self) -> bool {
        !std::mem::replace(&mut self.terms.is_active, true)
    }

    // =================================================================
    // Reads
    // =================================================================

    #[must_use]
    pub fn id(&self) -> &str {
        &self.terms.id
    }

    #[must_use]
    pub fn address(&self) -> VaultAddress {
        self.terms.address
    }

    #[must_use]
    pub fn property_details(&self) -> &str {
        &self.terms.property_details
    }

    #[must_use]
    pub fn base_price(&self) -> Amount {
        self.terms.base_price
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.terms.created_at
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.terms.is_active
    }

    #[must_use]
    pub fn state(&self) -> VaultState {
        self.book.state
    }

    #[must_use]
    pub fn phase(&self) -> VaultPhase {
        self.book.state.phase()
    }

    /// Incremented by every committed mutation.
    #[must_use]
    pub fn current_nonce(&self) -> u64 {
        self.current_nonce
    }

    /// Current (or, once settled, last) reservation.
    #[must_use]
    pub fn reservation(&self) -> Option<&Reservation> {
        self.book.reservation.as_ref()
    }

    #[must_use]
    pub fn active_reservation(&self) -> Option<&Reservation> {
        self.book.reservation.as_ref().filter(|r| r.is_active)
    }

    /// Reservations closed by cedes, oldest first.
    #[must_use]
    pub fn closed_reservations(&self) -> &[Reservation] {
        &self.closed_reservations
    }

    /// Every bid ever placed, in order.
    #[must_use]
    pub fn bids(&self) -> &[AuctionBid] {
        &self.book.bids
    }

    #[must_use]
    pub fn leading_bid(&self) -> Option<&AuctionBid> {
        self.book.leading_index().map(|i| &self.book.bids[i])
    }

    /// Value currently held in escrow.
    #[must_use]
    pub fn escrowed(&self) -> Amount {
        self.book.ledger.held()
    }

    #[must_use]
    pub fn ledger(&self) -> &EscrowLedger {
        &self.book.ledger
    }

    /// Re-check the escrow invariant against the committed state.
    pub fn verify_ledger(&self) -> Result<()> {
        self.book.verify()
    }

    /// Outbound value movements, in commit order.
    #[must_use]
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    #[must_use]
    pub fn cessions(&self) -> &[CessionRecord] {
        &self.cessions
    }

    #[must_use]
    pub fn credential(&self) -> Option<&AccessCredential> {
        self.credential.as_ref()
    }

    #[must_use]
    pub fn treasury(&self) -> AccountId {
        self.terms.treasury
    }

    #[must_use]
    pub fn policy(&self) -> SettlementPolicy {
        self.terms.policy
    }

    /// Premiums `account` earned by ceding reservations in this vault.
    #[must_use]
    pub fn earnings_of(&self, account: &AccountId) -> Amount {
        self.cessions
            .iter()
            .filter(|c| c.from == *account)
            .fold(0, |acc: Amount, c| acc.saturating_add(c.premium()))
    }

    /// Take the events committed since the last drain.
    pub fn drain_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub fn snapshot(&self) -> VaultSnapshot {
        VaultSnapshot {
            id: self.terms.id.clone(),
            address: self.terms.address,
            property_details: self.terms.property_details.clone(),
            base_price: self.terms.base_price,
            state: self.book.state,
            phase: self.book.state.phase(),
            current_nonce: self.current_nonce,
            is_active: self.terms.is_active,
            reservation: self.book.reservation.clone(),
            bids: self.book.bids.clone(),
            escrowed: self.book.ledger.held(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const BASE: Amount = 1_000_000;

    struct Fixture {
        vault: Vault,
        now: DateTime<Utc>,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
        booker: AccountId,
        treasury: AccountId,
    }

    impl Fixture {
        fn new() -> Self {
            let now = Utc::now();
            let treasury = AccountId::random();
            let vault = Vault::new(VaultSetup {
                id: "V1".into(),
                address: VaultAddress::derive(&AccountId::random(), 0, "V1"),
                property_details: "Loft".into(),
                base_price: BASE,
                created_at: now,
                treasury,
                policy: SettlementPolicy::default(),
                issuer: CredentialIssuer::from_seed(&[9u8; 32]),
            })
            .unwrap();
            Self {
                vault,
                now,
                check_in: now + Duration::days(10),
                check_out: now + Duration::days(15),
                booker: AccountId::random(),
                treasury,
            }
        }

        fn ctx(&self, caller: AccountId) -> CallContext {
            CallContext::new(caller, self.now)
        }

        fn reserved(stake: Amount) -> Self {
            let mut f = Self::new();
            let ctx = f.ctx(f.booker);
            f.vault.reserve(&ctx, stake, f.check_in, f.check_out).unwrap();
            f
        }

        fn nonce(&self) -> u64 {
            self.vault.active_reservation().unwrap().nonce
        }
    }

    #[test]
    fn new_vault_rejects_bad_terms() {
        let f = Fixture::new();
        let mut setup = VaultSetup {
            id: String::new(),
            address: f.vault.address(),
            property_details: "x".into(),
            base_price: 100,
            created_at: f.now,
            treasury: f.treasury,
            policy: SettlementPolicy::default(),
            issuer: CredentialIssuer::from_seed(&[1u8; 32]),
        };
        assert!(matches!(
            Vault::new(setup.clone()),
            Err(DigitalHouseError::InvalidArgument { .. })
        ));
        setup.id = "V1".into();
        setup.base_price = 0;
        assert!(matches!(
            Vault::new(setup),
            Err(DigitalHouseError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn reserve_escrows_stake_and_opens_auction() {
        let f = Fixture::reserved(BASE);
        assert_eq!(f.vault.state(), VaultState::Bidding);
        assert_eq!(f.vault.phase(), VaultPhase::Auction);
        assert_eq!(f.vault.escrowed(), BASE);
        let r = f.vault.active_reservation().unwrap();
        assert_eq!(r.booker, f.booker);
        assert_eq!(r.nonce, 0);
        assert_eq!(f.vault.current_nonce(), 1);
        f.vault.verify_ledger().unwrap();
    }

    #[test]
    fn reserve_preconditions() {
        let mut f = Fixture::new();
        let ctx = f.ctx(f.booker);

        let err = f.vault.reserve(&ctx, BASE - 1, f.check_in, f.check_out).unwrap_err();
        assert!(matches!(err, DigitalHouseError::InsufficientStake { .. }));

        let err = f.vault.reserve(&ctx, BASE, f.check_out, f.check_in).unwrap_err();
        assert!(matches!(err, DigitalHouseError::InvalidDates { .. }));

        let past = f.now - Duration::days(1);
        let err = f.vault.reserve(&ctx, BASE, past, f.check_out).unwrap_err();
        assert!(matches!(err, DigitalHouseError::InvalidDates { .. }));

        assert_eq!(f.vault.state(), VaultState::Free);
        assert_eq!(f.vault.current_nonce(), 0);
        assert_eq!(f.vault.escrowed(), 0);

        f.vault.reserve(&ctx, BASE, f.check_in, f.check_out).unwrap();
        let other = f.ctx(AccountId::random());
        let err = f.vault.reserve(&other, BASE, f.check_in, f.check_out).unwrap_err();
        assert!(matches!(err, DigitalHouseError::InvalidState { .. }));
    }

    #[test]
    fn deactivated_vault_refuses_reservations() {
        let mut f = Fixture::new();
        assert!(f.vault.deactivate());
        assert!(!f.vault.deactivate());
        let ctx = f.ctx(f.booker);
        let err = f.vault.reserve(&ctx, BASE, f.check_in, f.check_out).unwrap_err();
        assert!(matches!(err, DigitalHouseError::InvalidState { .. }));

        assert!(f.vault.activate());
        f.vault.reserve(&ctx, BASE, f.check_in, f.check_out).unwrap();
    }

    #[test]
    fn outbid_refunds_previous_leader_once() {
        let mut f = Fixture::reserved(BASE);
        let alice = AccountId::random();
        let bob = AccountId::random();

        f.vault.place_bid(&f.ctx(alice), 1_100_000).unwrap();
        f.vault.place_bid(&f.ctx(bob), 1_200_000).unwrap();

        let bids = f.vault.bids();
        assert!(!bids[0].is_active);
        assert_eq!(bids[0].closure, Some(BidClosure::Outbid));
        assert!(bids[1].is_active);
        assert_eq!(f.vault.leading_bid().unwrap().bidder, bob);
        assert_eq!(f.vault.escrowed(), BASE + 1_200_000);

        let refunds: Vec<_> = f
            .vault
            .transfers()
            .iter()
            .filter(|t| t.recipient == alice)
            .collect();
        assert_eq!(refunds.len(), 1);
        assert_eq!(refunds[0].amount, 1_100_000);
        assert_eq!(f.nonce(), 2);
    }

    #[test]
    fn bid_rules() {
        let mut f = Fixture::reserved(BASE);
        let alice = AccountId::random();

        let err = f.vault.place_bid(&f.ctx(alice), BASE).unwrap_err();
        assert!(matches!(err, DigitalHouseError::BidTooLow { must_exceed: BASE, .. }));

        let err = f.vault.place_bid(&f.ctx(f.booker), 2_000_000).unwrap_err();
        assert!(matches!(err, DigitalHouseError::SelfBid));

        f.vault.place_bid(&f.ctx(alice), 1_100_000).unwrap();
        let err = f.vault.place_bid(&f.ctx(AccountId::random()), 1_050_000).unwrap_err();
        assert!(matches!(err, DigitalHouseError::BidTooLow { .. }));
        assert_eq!(f.vault.leading_bid().unwrap().amount, 1_100_000);

        let late = CallContext::new(alice, f.check_in);
        let err = f.vault.place_bid(&late, 5_000_000).unwrap_err();
        assert!(matches!(err, DigitalHouseError::InvalidState { .. }));
    }

    #[test]
    fn keep_refunds_and_closes_window() {
        let mut f = Fixture::reserved(BASE);
        let alice = AccountId::random();
        f.vault.place_bid(&f.ctx(alice), 1_100_000).unwrap();

        let nonce = f.nonce();
        let decision = f.vault.decide(&f.ctx(f.booker), nonce, true).unwrap();
        let Decision::Kept { refunds } = decision else {
            panic!("expected keep");
        };
        assert_eq!(refunds.len(), 1);
        assert_eq!(refunds[0].recipient, alice);
        assert_eq!(f.vault.state(), VaultState::Kept);
        assert_eq!(f.vault.escrowed(), BASE);
        assert!(f.vault.bids().iter().all(|b| !b.is_active));

        let err = f.vault.place_bid(&f.ctx(alice), 2_000_000).unwrap_err();
        assert!(matches!(err, DigitalHouseError::InvalidState { .. }));
        let err = f.vault.decide(&f.ctx(f.booker), f.nonce(), false).unwrap_err();
        assert!(matches!(err, DigitalHouseError::InvalidState { .. }));
    }

    #[test]
    fn cede_splits_incremental_value() {
        let mut f = Fixture::reserved(BASE);
        let winner = AccountId::random();
        f.vault.place_bid(&f.ctx(AccountId::random()), 1_100_000).unwrap();
        f.vault.place_bid(&f.ctx(winner), 1_300_000).unwrap();

        let nonce = f.nonce();
        let Decision::Ceded(record) = f.vault.decide(&f.ctx(f.booker), nonce, false).unwrap() else {
            panic!("expected cede");
        };
        assert_eq!(record.booker_payout, 1_210_000);
        assert_eq!(record.protocol_fee, 90_000);
        assert_eq!(record.to, winner);

        let r = f.vault.active_reservation().unwrap();
        assert_eq!(r.booker, winner);
        assert_eq!(r.nonce, 0);
        assert_eq!(r.check_in_date, f.check_in);
        assert_eq!(f.vault.state(), VaultState::Bidding);
        assert_eq!(f.vault.escrowed(), BASE);
        assert_eq!(f.vault.closed_reservations().len(), 1);
        assert!(!f.vault.closed_reservations()[0].is_active);

        let fee = f
            .vault
            .transfers()
            .iter()
            .find(|t| t.reason == TransferReason::ProtocolFee)
            .unwrap();
        assert_eq!(fee.recipient, f.treasury);
        assert_eq!(fee.amount, 90_000);
        assert_eq!(f.vault.earnings_of(&f.booker), 210_000);
        f.vault.verify_ledger().unwrap();
    }

    #[test]
    fn cede_without_profit_is_rejected_atomically() {
        let mut f = Fixture::reserved(1_500_000);
        f.vault.place_bid(&f.ctx(AccountId::random()), 1_200_000).unwrap();
        let before = f.vault.current_nonce();

        let err = f.vault.decide(&f.ctx(f.booker), f.nonce(), false).unwrap_err();
        assert!(matches!(
            err,
            DigitalHouseError::NoProfitableBid {
                lead: 1_200_000,
                stake: 1_500_000
            }
        ));
        assert_eq!(f.vault.current_nonce(), before);
        assert!(f.vault.leading_bid().is_some());
        assert_eq!(f.vault.escrowed(), 1_500_000 + 1_200_000);

        let mut empty = Fixture::reserved(BASE);
        let err = empty.vault.decide(&empty.ctx(empty.booker), 0, false).unwrap_err();
        assert!(matches!(err, DigitalHouseError::NoProfitableBid { lead: 0, .. }));
    }

    #[test]
    fn decide_requires_booker_and_fresh_nonce() {
        let mut f = Fixture::reserved(BASE);
        let err = f.vault.decide(&f.ctx(AccountId::random()), 0, true).unwrap_err();
        assert!(matches!(err, DigitalHouseError::Unauthorized { .. }));

        f.vault.place_bid(&f.ctx(AccountId::random()), 1_100_000).unwrap();
        let err = f.vault.decide(&f.ctx(f.booker), 0, false).unwrap_err();
        assert!(matches!(
            err,
            DigitalHouseError::StaleNonce {
                presented: 0,
                current: 1
            }
        ));

        let late = CallContext::new(f.booker, f.check_in);
        let err = f.vault.decide(&late, 1, true).unwrap_err();
        assert!(matches!(err, DigitalHouseError::InvalidState { .. }));
    }

    #[test]
    fn check_in_issues_credential_and_refunds() {
        let mut f = Fixture::reserved(BASE);
        let bidder = AccountId::random();
        f.vault.place_bid(&f.ctx(bidder), 1_100_000).unwrap();

        let early = CallContext::new(f.booker, f.check_in - Duration::seconds(1));
        assert!(matches!(
            f.vault.check_in(&early, f.nonce()).unwrap_err(),
            DigitalHouseError::InvalidState { .. }
        ));

        let at = CallContext::new(f.booker, f.check_in);
        let credential = f.vault.check_in(&at, f.nonce()).unwrap();
        assert_eq!(credential.holder, f.booker);
        assert_eq!(credential.vault_address, f.vault.address());
        credential
            .verify(&CredentialIssuer::from_seed(&[9u8; 32]).verifying_key())
            .unwrap();
        assert_eq!(f.vault.state(), VaultState::Occupied);
        assert_eq!(f.vault.escrowed(), BASE);
        assert_eq!(f.vault.credential(), Some(&credential));
        assert_eq!(f.vault.bids()[0].closure, Some(BidClosure::RefundedOnCheckIn));
    }

    #[test]
    fn check_out_settles_and_releases_stake() {
        let mut f = Fixture::reserved(BASE);
        let before = CallContext::new(f.booker, f.check_in - Duration::days(1));
        assert!(matches!(
            f.vault.check_out(&before, f.nonce()).unwrap_err(),
            DigitalHouseError::InvalidState { .. }
        ));

        let after = CallContext::new(f.booker, f.check_out + Duration::hours(1));
        let transfers = f.vault.check_out(&after, f.nonce()).unwrap();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].recipient, f.booker);
        assert_eq!(transfers[0].reason, TransferReason::StakeRelease);
        assert_eq!(transfers[0].amount, BASE);
        assert_eq!(f.vault.state(), VaultState::Settled);
        assert_eq!(f.vault.phase(), VaultPhase::Settled);
        assert_eq!(f.vault.escrowed(), 0);
        assert!(!f.vault.reservation().unwrap().is_active);

        // Terminal.
        let ctx = CallContext::new(AccountId::random(), f.check_out + Duration::days(30));
        let err = f
            .vault
            .reserve(&ctx, BASE, ctx.now + Duration::days(1), ctx.now + Duration::days(2))
            .unwrap_err();
        assert!(matches!(err, DigitalHouseError::InvalidState { .. }));
    }

    #[test]
    fn expire_settles_untouched_booking() {
        let mut f = Fixture::reserved(BASE);
        let bidder = AccountId::random();
        f.vault.place_bid(&f.ctx(bidder), 1_100_000).unwrap();

        let anyone = CallContext::new(AccountId::random(), f.check_out - Duration::seconds(1));
        assert!(f.vault.expire(&anyone).is_err());

        let anyone = CallContext::new(AccountId::random(), f.check_out);
        let transfers = f.vault.expire(&anyone).unwrap();
        assert_eq!(transfers.len(), 2);
        assert!(transfers.iter().any(|t| t.recipient == bidder && t.amount == 1_100_000));
        assert!(transfers.iter().any(|t| t.recipient == f.booker && t.amount == BASE));
        assert_eq!(f.vault.state(), VaultState::Settled);
        assert_eq!(f.vault.escrowed(), 0);
        f.vault.verify_ledger().unwrap();
    }

    #[test]
    fn events_are_drained_in_order() {
        let mut f = Fixture::reserved(BASE);
        f.vault.place_bid(&f.ctx(AccountId::random()), 1_100_000).unwrap();
        let events = f.vault.drain_events();
        assert!(matches!(events[0], VaultEvent::Reserved { .. }));
        assert!(matches!(events[1], VaultEvent::BidPlaced { .. }));
        assert!(f.vault.drain_events().is_empty());
    }

    #[test]
    fn snapshot_reflects_state() {
        let f = Fixture::reserved(BASE);
        let snap = f.vault.snapshot();
        assert_eq!(snap.id, "V1");
        assert_eq!(snap.phase, VaultPhase::Auction);
        assert_eq!(snap.escrowed, BASE);
        assert_eq!(snap.reservation.unwrap().booker, f.booker);
        assert!(snap.bids.is_empty());
    }

    #[test]
    fn corrupted_ledger_aborts_without_side_effects() {
        let mut f = Fixture::reserved(BASE);
        f.vault.drain_events();
        f.vault
            .book
            .ledger
            .lock(EscrowKey::Bid(BidId::new()), AccountId::random(), 5)
            .unwrap();
        let nonce = f.vault.current_nonce();
        let reservation_nonce = f.nonce();

        let err = f
            .vault
            .place_bid(&f.ctx(AccountId::random()), 1_100_000)
            .unwrap_err();
        assert!(err.is_invariant_violation());
        assert!(matches!(err, DigitalHouseError::LedgerInconsistency { .. }));
        assert!(f.vault.bids().is_empty());

        let after = CallContext::new(f.booker, f.check_out + Duration::hours(1));
        let err = f.vault.check_out(&after, reservation_nonce).unwrap_err();
        assert!(err.is_invariant_violation());

        assert_eq!(f.vault.state(), VaultState::Bidding);
        assert_eq!(f.vault.current_nonce(), nonce);
        assert_eq!(f.nonce(), reservation_nonce);
        assert!(f.vault.transfers().is_empty());
        assert!(f.vault.drain_events().is_empty());
        assert_eq!(f.vault.escrowed(), BASE + 5);
    }

    #[test]
    fn successor_cede_threshold_is_original_stake() {
        let mut f = Fixture::reserved(BASE);
        let winner = AccountId::random();
        f.vault.place_bid(&f.ctx(winner), 1_300_000).unwrap();
        f.vault.decide(&f.ctx(f.booker), f.nonce(), false).unwrap();
        assert_eq!(f.vault.active_reservation().unwrap().stake_amount, BASE);

        // Below what the winner paid, but above the inherited stake.
        f.vault.place_bid(&f.ctx(AccountId::random()), 1_050_000).unwrap();
        let Decision::Ceded(record) = f.vault.decide(&f.ctx(winner), f.nonce(), false).unwrap()
        else {
            panic!("expected cede");
        };
        assert_eq!(record.from, winner);
        assert_eq!(record.stake, BASE);
        assert_eq!(record.booker_payout, 1_035_000);
        assert_eq!(record.protocol_fee, 15_000);
        f.vault.verify_ledger().unwrap();
    }
}
