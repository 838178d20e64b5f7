//! Telehub registry and round-robin spawn selection
//!
//! At most one telehub per region. Spawn points are offsets relative to the
//! hub; selection cycles through them with a cursor kept in the per-region
//! state, so concurrent arrivals each receive the next offset in order.

use crate::model::{RegionId, Telehub};
use crate::region::RegionStates;
use glam::Vec3;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

/// Telehub registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelehubError {
    #[error("region has no telehub")]
    NoTelehub,

    #[error("telehub has no position; connect it to an object first")]
    NoPosition,

    #[error("spawn index {0} out of range")]
    SpawnIndexOutOfRange(usize),
}

/// Per-region telehub state
pub struct TelehubRegistry {
    telehubs: Mutex<HashMap<RegionId, Telehub>>,
    states: Arc<RegionStates>,
}

impl TelehubRegistry {
    pub fn new(states: Arc<RegionStates>) -> Self {
        TelehubRegistry {
            telehubs: Mutex::new(HashMap::new()),
            states,
        }
    }

    /// Telehub for a region, if one is placed
    pub async fn get(&self, region_id: RegionId) -> Option<Telehub> {
        self.telehubs.lock().await.get(&region_id).cloned()
    }

    /// Place or replace a region's telehub
    pub async fn set(&self, telehub: Telehub) {
        info!(region_id = %telehub.region_id, name = %telehub.name, "telehub connected");
        let region_id = telehub.region_id;
        self.telehubs.lock().await.insert(region_id, telehub);
        self.reset_cursor(region_id).await;
    }

    /// Remove a region's telehub
    pub async fn delete(&self, region_id: RegionId) {
        self.telehubs.lock().await.remove(&region_id);
        self.reset_cursor(region_id).await;
    }

    /// Add a spawn offset. Refused while the hub still sits at the zero
    /// sentinel position.
    pub async fn append_spawn(&self, region_id: RegionId, offset: Vec3) -> Result<(), TelehubError> {
        let mut telehubs = self.telehubs.lock().await;
        let hub = telehubs.get_mut(&region_id).ok_or(TelehubError::NoTelehub)?;
        if !hub.has_position() {
            return Err(TelehubError::NoPosition);
        }
        hub.spawn_offsets.push(offset);
        Ok(())
    }

    /// Remove the spawn offset at `index`
    pub async fn remove_spawn(&self, region_id: RegionId, index: usize) -> Result<(), TelehubError> {
        let mut telehubs = self.telehubs.lock().await;
        let hub = telehubs.get_mut(&region_id).ok_or(TelehubError::NoTelehub)?;
        if index >= hub.spawn_offsets.len() {
            return Err(TelehubError::SpawnIndexOutOfRange(index));
        }
        hub.spawn_offsets.remove(index);

        let len = hub.spawn_offsets.len();
        drop(telehubs);
        let state = self.states.for_region(region_id).await;
        let mut state = state.lock().await;
        if len == 0 || state.telehub_cursor >= len {
            state.telehub_cursor = 0;
        }
        Ok(())
    }

    /// Next landing position for a region with a telehub.
    ///
    /// Returns the hub position unchanged when no spawn offsets exist;
    /// otherwise returns the offset under the cursor and advances it
    /// modulo the list length.
    pub async fn next_spawn_position(&self, region_id: RegionId) -> Option<Vec3> {
        let telehubs = self.telehubs.lock().await;
        let hub = telehubs.get(&region_id)?;
        if hub.spawn_offsets.is_empty() {
            return Some(hub.position);
        }

        let position = hub.position;
        let offsets = hub.spawn_offsets.clone();
        drop(telehubs);

        let state = self.states.for_region(region_id).await;
        let mut state = state.lock().await;
        let cursor = state.telehub_cursor % offsets.len();
        state.telehub_cursor = (cursor + 1) % offsets.len();
        Some(position + offsets[cursor])
    }

    async fn reset_cursor(&self, region_id: RegionId) {
        let state = self.states.for_region(region_id).await;
        state.lock().await.telehub_cursor = 0;
    }
}
