//! Telehub data

use super::ids::RegionId;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A designated region entry object with zero or more spawn offsets for
/// forced landings. At most one per region; a position of (0, 0) on the XY
/// plane is the sentinel for "no telehub placed".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Telehub {
    pub region_id: RegionId,

    /// World position of the hub object
    pub position: Vec3,

    /// Orientation of the hub object
    pub rotation: Quat,

    /// Spawn points stored as offsets relative to `position`
    pub spawn_offsets: Vec<Vec3>,

    /// Scene object the hub is connected to
    pub object_id: Uuid,

    pub name: String,
}

impl Telehub {
    /// Hub connected to a scene object at `position`
    pub fn new(region_id: RegionId, position: Vec3, object_id: Uuid, name: impl Into<String>) -> Self {
        Telehub {
            region_id,
            position,
            rotation: Quat::IDENTITY,
            spawn_offsets: Vec::new(),
            object_id,
            name: name.into(),
        }
    }

    /// Whether the hub has a real position (the XY zero point means "no
    /// telehub")
    pub fn has_position(&self) -> bool {
        self.position.x != 0.0 || self.position.y != 0.0
    }
}
