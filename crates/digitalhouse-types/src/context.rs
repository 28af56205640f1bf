//! Per-call capability context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AccountId;

/// Who is calling and when.
///
/// The wallet/auth layer authenticates `caller` before the call reaches the
/// engine. Every time window (check-in, check-out) is evaluated against `now`,
/// so tests and replays can drive the clock explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: AccountId,
    pub now: DateTime<Utc>,
}

impl CallContext {
    #[must_use]
    pub fn new(caller: AccountId, now: DateTime<Utc>) -> Self {
        Self { caller, now }
    }

    /// Same time, different caller.
    #[must_use]
    pub fn as_caller(self, caller: AccountId) -> Self {
        Self { caller, ..self }
    }
}
