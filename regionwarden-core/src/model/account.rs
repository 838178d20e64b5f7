//! Account data sourced from the account directory

use super::flags::PaymentFlags;
use super::ids::AgentId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// A grid user account. Immutable for the duration of a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Agent this account belongs to
    pub agent_id: AgentId,

    /// Display name, used in denial reasons and ban-criteria matching
    pub name: String,

    /// Administrative level; non-zero bypasses most checks
    pub user_level: i32,

    /// Account creation time, unix seconds
    pub created_at: i64,

    /// Payment-verification state
    pub payment_flags: PaymentFlags,

    /// Scope the account was created under, if any
    pub scope_id: Option<Uuid>,
}

impl Account {
    /// Age of the account in whole days at `now` (unix seconds)
    pub fn age_days(&self, now: i64) -> i64 {
        (now - self.created_at) / SECONDS_PER_DAY
    }

    /// Account has never supplied payment information
    pub fn lacks_payment_info(&self) -> bool {
        self.payment_flags
            .contains(PaymentFlags::NO_PAYMENT_INFO_ON_FILE)
    }

    /// Account has payment information on file
    pub fn has_payment_info(&self) -> bool {
        self.payment_flags.contains(PaymentFlags::PAYMENT_INFO_ON_FILE)
    }

    /// Account has used its payment information
    pub fn has_used_payment_info(&self) -> bool {
        self.payment_flags.contains(PaymentFlags::PAYMENT_INFO_IN_USE)
    }
}
