//! Per-region teleport cooldown
//!
//! One scalar deadline per region, not per agent: concurrent agents
//! teleporting into the same region share a single cooldown window.
//! Child agents crossing in from a neighbor are never throttled.

use crate::region::RegionState;
use tokio::sync::Mutex;
use tracing::debug;

/// Cooldown gate over the shared per-region state
#[derive(Debug, Clone)]
pub struct TeleportRateLimiter {
    enabled: bool,
    cooldown_secs: i64,
}

impl TeleportRateLimiter {
    pub fn new(enabled: bool, cooldown_secs: i64) -> Self {
        TeleportRateLimiter { enabled, cooldown_secs }
    }

    /// Allow or refuse a teleport at `now` (unix seconds), arming the next
    /// cooldown window on success.
    pub async fn check_and_update(
        &self,
        state: &Mutex<RegionState>,
        is_child_agent: bool,
        now: i64,
    ) -> bool {
        if !self.enabled || is_child_agent {
            return true;
        }

        let mut state = state.lock().await;
        if state.next_teleport_allowed_at > now {
            debug!(
                next_allowed_at = state.next_teleport_allowed_at,
                now, "teleport refused by cooldown"
            );
            return false;
        }
        state.next_teleport_allowed_at = now + self.cooldown_secs;
        true
    }
}
