//! Error types for the Digital House vault engine.
//!
//! All errors use the `DH_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Registry / argument errors
//! - 2xx: Vault state and reservation errors
//! - 3xx: Auction errors
//! - 4xx: Escrow ledger errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{Amount, VaultState};

/// Central error enum for all Digital House operations.
///
/// Every error is local to the attempted operation: the vault or registry is
/// left exactly as it was before the call.
#[derive(Debug, Error)]
pub enum DigitalHouseError {
    // =================================================================
    // Registry / Argument Errors (1xx)
    // =================================================================
    /// Malformed input (empty id, zero price, bad hex, ...).
    #[error("DH_ERR_100: Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// A vault with this id was already created (ids are never reused).
    #[error("DH_ERR_101: Vault ID already exists: {0}")]
    DuplicateId(String),

    /// No vault is registered under this id or address.
    #[error("DH_ERR_102: Vault not found: {0}")]
    NotFound(String),

    /// The caller lacks the capability required for this operation.
    #[error("DH_ERR_103: Unauthorized: {reason}")]
    Unauthorized { reason: String },

    // =================================================================
    // Vault State Errors (2xx)
    // =================================================================
    /// The operation is not valid in the vault's current state or time window.
    #[error("DH_ERR_200: {operation} not allowed in state {state}: {reason}")]
    InvalidState {
        operation: &'static str,
        state: VaultState,
        reason: String,
    },

    /// Stake is below the vault's base price.
    #[error("DH_ERR_201: Insufficient stake: need at least {base_price}, got {stake}")]
    InsufficientStake { stake: Amount, base_price: Amount },

    /// Check-in/check-out dates are unordered or in the past.
    #[error("DH_ERR_202: Invalid dates: {reason}")]
    InvalidDates { reason: String },

    /// The caller's view of the reservation predates a concurrent mutation.
    #[error("DH_ERR_203: Stale nonce: presented {presented}, current {current}")]
    StaleNonce { presented: u64, current: u64 },

    // =================================================================
    // Auction Errors (3xx)
    // =================================================================
    /// Bid does not strictly exceed the current leading bid (or base price).
    #[error("DH_ERR_300: Bid too low: {amount} must be greater than {must_exceed}")]
    BidTooLow { amount: Amount, must_exceed: Amount },

    /// The current booker tried to bid on their own reservation.
    #[error("DH_ERR_301: Self-bid blocked: bidder is the current booker")]
    SelfBid,

    /// Ceding requires a leading bid above the stake.
    #[error("DH_ERR_302: No profitable bid: leading bid {lead} does not exceed stake {stake}")]
    NoProfitableBid { lead: Amount, stake: Amount },

    // =================================================================
    // Escrow Errors (4xx)
    // =================================================================
    /// Escrow invariant violation. Indicates a programming defect.
    #[error("DH_ERR_400: Ledger inconsistency: {reason}")]
    LedgerInconsistency { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("DH_ERR_900: Configuration error: {0}")]
    Configuration(String),

    /// Access credential failed verification.
    #[error("DH_ERR_901: Credential error: {0}")]
    Credential(String),
}

impl DigitalHouseError {
    /// `true` for errors that signal a defect in the engine rather than bad
    /// user input. Operators should be alerted on these.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::LedgerInconsistency { .. })
    }

    /// The `DH_ERR_xxx` code of this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "DH_ERR_100",
            Self::DuplicateId(_) => "DH_ERR_101",
            Self::NotFound(_) => "DH_ERR_102",
            Self::Unauthorized { .. } => "DH_ERR_103",
            Self::InvalidState { .. } => "DH_ERR_200",
            Self::InsufficientStake { .. } => "DH_ERR_201",
            Self::InvalidDates { .. } => "DH_ERR_202",
            Self::StaleNonce { .. } => "DH_ERR_203",
            Self::BidTooLow { .. } => "DH_ERR_300",
            Self::SelfBid => "DH_ERR_301",
            Self::NoProfitableBid { .. } => "DH_ERR_302",
            Self::LedgerInconsistency { .. } => "DH_ERR_400",
            Self::Configuration(_) => "DH_ERR_900",
            Self::Credential(_) => "DH_ERR_901",
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, DigitalHouseError>;
