//! Parcel data consulted during placement

use super::flags::ParcelFlags;
use super::ids::{AgentId, GroupId, ParcelId};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Landing rule a parcel applies to non-direct teleports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LandingKind {
    /// Teleports into this parcel are blocked outright
    None,
    /// Arrivals are routed to the parcel's user location
    LandingPoint,
    /// Arrivals may land anywhere in the parcel
    Anywhere,
}

/// A sub-region land area with independent access flags and landing rule.
/// Read-only for this engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub id: ParcelId,
    pub name: String,
    pub flags: ParcelFlags,
    pub landing: LandingKind,

    /// Landing coordinate used when `landing == LandingPoint`; the zero
    /// vector means unset.
    pub user_location: Vec3,

    /// Group granted access when `USE_ACCESS_GROUP` is set
    pub group_id: Option<GroupId>,

    /// Users banned from the parcel outright
    pub banned: HashSet<AgentId>,

    /// Users excluded by the access/pass list
    pub restricted: HashSet<AgentId>,
}

impl Parcel {
    /// Open parcel with no flags and no landing rule
    pub fn new(name: impl Into<String>) -> Self {
        Parcel {
            id: ParcelId::generate(),
            name: name.into(),
            flags: ParcelFlags::empty(),
            landing: LandingKind::Anywhere,
            user_location: Vec3::ZERO,
            group_id: None,
            banned: HashSet::new(),
            restricted: HashSet::new(),
        }
    }

    pub fn is_banned(&self, agent_id: AgentId) -> bool {
        self.banned.contains(&agent_id)
    }

    pub fn is_restricted(&self, agent_id: AgentId) -> bool {
        self.restricted.contains(&agent_id)
    }

    pub fn is_banned_or_restricted(&self, agent_id: AgentId) -> bool {
        self.is_banned(agent_id) || self.is_restricted(agent_id)
    }

    /// Whether a landing coordinate has been configured
    pub fn has_user_location(&self) -> bool {
        self.user_location != Vec3::ZERO
    }

    /// Whether any of the access-group/access-list/pass-list gates is in
    /// play for the given agent. `active_group` is the group the agent has
    /// active, if any.
    pub fn restricts(&self, agent_id: AgentId, active_group: Option<GroupId>) -> bool {
        if self.flags.contains(ParcelFlags::USE_ACCESS_GROUP) {
            if self.group_id.is_some() && active_group != self.group_id {
                return true;
            }
        }
        if self.flags.contains(ParcelFlags::USE_ACCESS_LIST)
            || self.flags.contains(ParcelFlags::USE_PASS_LIST)
        {
            if self.is_restricted(agent_id) {
                return true;
            }
        }
        false
    }
}
