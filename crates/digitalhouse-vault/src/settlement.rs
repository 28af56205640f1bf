//! Settlement policy: how a cede splits the incremental value.
//!
//! ```text
//! incremental   = lead - stake
//! protocol_fee  = floor(incremental * fee_bps / 10_000)
//! booker_payout = stake + incremental - protocol_fee
//! ```
//!
//! Integer arithmetic only; rounding dust always goes to the booker, so
//! `booker_payout + protocol_fee == lead` exactly.

use digitalhouse_types::{Amount, DigitalHouseError, Result, constants};
use serde::{Deserialize, Serialize};

/// Outcome of splitting a cede.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CessionSplit {
    pub incremental: Amount,
    pub booker_payout: Amount,
    pub protocol_fee: Amount,
}

/// Fee schedule applied to cedes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPolicy {
    protocol_fee_bps: u16,
}

impl SettlementPolicy {
    /// # Errors
    /// `InvalidArgument` if the rate exceeds 100%.
    pub fn new(protocol_fee_bps: u16) -> Result<Self> {
        if u64::from(protocol_fee_bps) > constants::BPS_DENOMINATOR {
            return Err(DigitalHouseError::InvalidArgument {
                reason: format!(
                    "protocol fee {protocol_fee_bps} bps exceeds {}",
                    constants::BPS_DENOMINATOR
                ),
            });
        }
        Ok(Self { protocol_fee_bps })
    }

    #[must_use]
    pub fn protocol_fee_bps(&self) -> u16 {
        self.protocol_fee_bps
    }

    /// Split a cede where the leading bid `lead` replaces a booking staked at
    /// `stake`.
    ///
    /// # Errors
    /// `NoProfitableBid` if `lead <= stake` (no ceding at a loss).
    pub fn split(&self, stake: Amount, lead: Amount) -> Result<CessionSplit> {
        if lead <= stake {
            return Err(DigitalHouseError::NoProfitableBid { lead, stake });
        }
        let incremental = lead - stake;
        let fee = u128::from(incremental) * u128::from(self.protocol_fee_bps)
            / u128::from(constants::BPS_DENOMINATOR);
        // fee <= incremental, so it always fits.
        let protocol_fee = Amount::try_from(fee).map_err(|_| {
            DigitalHouseError::LedgerInconsistency {
                reason: format!("protocol fee {fee} exceeds incremental {incremental}"),
            }
        })?;
        Ok(CessionSplit {
            incremental,
            booker_payout: lead - protocol_fee,
            protocol_fee,
        })
    }
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            protocol_fee_bps: constants::DEFAULT_PROTOCOL_FEE_BPS,
        }
    }
}

/// Split with the default 70/30 policy.
///
/// # Errors
/// `NoProfitableBid` if `lead <= stake`.
pub fn split(stake: Amount, lead: Amount) -> Result<CessionSplit> {
    SettlementPolicy::default().split(stake, lead)
}
