//! Static region descriptor

use super::flags::RegionFlags;
use super::ids::RegionId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Region identity and policy knobs that do not change while the region is
/// up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionInfo {
    pub region_id: RegionId,
    pub name: String,

    /// Region extent in meters on each axis
    pub size_x: u32,
    pub size_y: u32,

    /// Maturity access level required to enter (compare against
    /// [`MaturityRating::access_level`](super::MaturityRating))
    pub access_level: u8,

    pub flags: RegionFlags,

    /// Maximum resident agents; 0 disables the limit
    pub agent_limit: u32,

    /// Minimum account age in days; 0 disables the check
    pub minimum_age_days: i64,

    /// Account scope this region serves, if any
    pub scope_id: Option<Uuid>,
}

impl RegionInfo {
    /// 256x256 region with no entry restrictions
    pub fn new(region_id: RegionId, name: impl Into<String>) -> Self {
        RegionInfo {
            region_id,
            name: name.into(),
            size_x: 256,
            size_y: 256,
            access_level: 0,
            flags: RegionFlags::empty(),
            agent_limit: 0,
            minimum_age_days: 0,
            scope_id: None,
        }
    }

    pub fn is_prelude(&self) -> bool {
        self.flags.contains(RegionFlags::PRELUDE)
    }
}
