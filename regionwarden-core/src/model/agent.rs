//! Per-agent grid records and the in-scene avatar view

use super::flags::AgentFlags;
use super::ids::{AgentId, EstateId, GroupId, RegionId};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::IpAddr;

/// Maturity rating an agent has opted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MaturityRating {
    Pg,
    Mature,
    Adult,
}

impl MaturityRating {
    /// Access level this rating grants, comparable against
    /// [`RegionInfo::access_level`](super::RegionInfo).
    pub fn access_level(self) -> u8 {
        match self {
            MaturityRating::Pg => 13,
            MaturityRating::Mature => 21,
            MaturityRating::Adult => 42,
        }
    }
}

/// Persistent per-agent record kept by the grid, read and conditionally
/// updated (prelude visits) by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    pub agent_id: AgentId,

    /// Maturity rating the agent has verified for
    pub maturity: MaturityRating,

    /// Minor / past-prelude markers
    pub flags: AgentFlags,

    /// Prelude regions this agent has already entered
    pub prelude_visited: HashSet<RegionId>,

    /// When set, the agent may only enter regions of this estate
    pub limited_to_estate: Option<EstateId>,
}

impl AgentInfo {
    /// Fresh record for an agent the grid has not seen before
    pub fn new(agent_id: AgentId) -> Self {
        AgentInfo {
            agent_id,
            maturity: MaturityRating::Mature,
            flags: AgentFlags::empty(),
            prelude_visited: HashSet::new(),
            limited_to_estate: None,
        }
    }

    /// Agent is flagged as a minor
    pub fn is_minor(&self) -> bool {
        self.flags.contains(AgentFlags::MINOR)
    }

    /// Record a prelude visit. Returns false if the region was already
    /// recorded.
    pub fn record_prelude_visit(&mut self, region_id: RegionId) -> bool {
        let inserted = self.prelude_visited.insert(region_id);
        if inserted {
            self.flags |= AgentFlags::PAST_PRELUDE;
        }
        inserted
    }
}

/// The scene's view of an avatar that is (or is becoming) present in the
/// region. Optional per request: an agent teleporting in from another
/// region may not have a presence yet.
#[derive(Debug, Clone)]
pub struct AvatarPresence {
    pub agent_id: AgentId,

    /// Display name as the scene knows it
    pub name: String,

    /// Elevated administrative level; non-zero bypasses most checks
    pub god_level: i32,

    /// Lightweight crossing presence, not yet fully resident
    pub is_child_agent: bool,

    /// Network endpoint the viewer is connected from
    pub endpoint: Option<IpAddr>,

    /// Group the avatar currently has active
    pub active_group: Option<GroupId>,

    /// Current (or requested) position within the region
    pub position: Vec3,
}
