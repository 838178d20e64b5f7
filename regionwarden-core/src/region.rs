//! Per-region mutable state and region sessions
//!
//! Cooldown deadlines, the telehub spawn cursor, and the resident count are
//! the only mutable state the engine owns. Each region gets its own state
//! object behind its own lock, handed out by [`RegionStates`], so concurrent
//! admissions into the same region serialize on exactly the state they
//! share and regions never contend with each other.

use crate::directory::{DirectoryError, EstateStore};
use crate::model::{EstateSettings, RegionId, RegionInfo};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Mutable per-region decision state
#[derive(Debug, Default)]
pub struct RegionState {
    /// Unix second before which further teleports into the region are
    /// refused
    pub next_teleport_allowed_at: i64,

    /// Round-robin position into the telehub spawn list
    pub telehub_cursor: usize,

    /// Fully-resident agents currently in the region
    pub resident_count: u32,
}

/// Registry handing out the per-region state lock
#[derive(Default)]
pub struct RegionStates {
    inner: Mutex<HashMap<RegionId, Arc<Mutex<RegionState>>>>,
}

impl RegionStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for a region, created on first use
    pub async fn for_region(&self, region_id: RegionId) -> Arc<Mutex<RegionState>> {
        let mut inner = self.inner.lock().await;
        inner
            .entry(region_id)
            .or_insert_with(|| Arc::new(Mutex::new(RegionState::default())))
            .clone()
    }

    /// Drop a region's state at teardown
    pub async fn remove(&self, region_id: RegionId) {
        self.inner.lock().await.remove(&region_id);
    }
}

/// A region activated against the engine: its static descriptor, the estate
/// settings loaded once for the session, and its state lock.
pub struct RegionSession {
    pub info: RegionInfo,

    /// Estate policy; written by ban self-healing and admin operations
    pub estate: Arc<RwLock<EstateSettings>>,

    /// Per-region mutable state shared with the telehub registry and rate
    /// limiter
    pub state: Arc<Mutex<RegionState>>,
}

impl RegionSession {
    /// Load estate settings for the region and bind its state lock
    pub async fn activate(
        info: RegionInfo,
        estate_store: &Arc<dyn EstateStore>,
        states: &RegionStates,
    ) -> Result<Self, DirectoryError> {
        let estate = estate_store.load(info.region_id).await?;
        let state = states.for_region(info.region_id).await;
        Ok(RegionSession {
            info,
            estate: Arc::new(RwLock::new(estate)),
            state,
        })
    }

    pub fn region_id(&self) -> RegionId {
        self.info.region_id
    }

    /// Record an agent becoming fully resident
    pub async fn agent_arrived(&self) {
        self.state.lock().await.resident_count += 1;
    }

    /// Record a resident agent leaving
    pub async fn agent_departed(&self) {
        let mut state = self.state.lock().await;
        state.resident_count = state.resident_count.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_state_created_once_per_region() {
        let states = RegionStates::new();
        let region = RegionId::generate();

        let a = states.for_region(region).await;
        a.lock().await.resident_count = 7;

        let b = states.for_region(region).await;
        assert_eq!(b.lock().await.resident_count, 7);
    }

    #[tokio::test]
    async fn test_regions_are_independent() {
        let states = RegionStates::new();
        let a = states.for_region(RegionId::generate()).await;
        let b = states.for_region(RegionId::generate()).await;

        a.lock().await.resident_count = 3;
        assert_eq!(b.lock().await.resident_count, 0);
    }

    #[tokio::test]
    async fn test_arrivals_and_departures_balance() {
        let states = RegionStates::new();
        let info = RegionInfo::new(RegionId::generate(), "Sandbox");
        let session = RegionSession {
            state: states.for_region(info.region_id).await,
            estate: Arc::new(RwLock::new(EstateSettings::new(
                crate::model::EstateId(1),
                crate::model::AgentId::generate(),
            ))),
            info,
        };

        session.agent_arrived().await;
        session.agent_arrived().await;
        session.agent_departed().await;
        assert_eq!(session.state.lock().await.resident_count, 1);

        // Departures never underflow
        session.agent_departed().await;
        session.agent_departed().await;
        assert_eq!(session.state.lock().await.resident_count, 0);
    }

    #[tokio::test]
    async fn test_remove_discards_state() {
        let states = RegionStates::new();
        let region = RegionId::generate();

        states.for_region(region).await.lock().await.resident_count = 5;
        states.remove(region).await;
        assert_eq!(states.for_region(region).await.lock().await.resident_count, 0);
    }
}
