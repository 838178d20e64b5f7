//! Estate settings and ban list

use super::ids::{AgentId, EstateId, GroupId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One entry in an estate ban list.
///
/// Entries are not unique by user id: self-healing may leave near-duplicate
/// entries differing only by mask, and consumers must tolerate that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstateBan {
    pub banned_user_id: AgentId,

    /// Address recorded when the ban was issued
    pub banned_host_address: String,

    /// IP/hostname mask matched against connecting clients
    pub banned_host_ip_mask: String,

    /// Hostname recorded when the ban was issued
    pub banned_host_name_mask: String,

    pub estate_id: EstateId,
}

impl EstateBan {
    /// Ban covering a single user id with every mask field set to the
    /// address the user connected from.
    pub fn for_user(user_id: AgentId, address: &str, estate_id: EstateId) -> Self {
        EstateBan {
            banned_user_id: user_id,
            banned_host_address: address.to_string(),
            banned_host_ip_mask: address.to_string(),
            banned_host_name_mask: address.to_string(),
            estate_id,
        }
    }
}

/// Access policy shared by every region of an estate.
///
/// Loaded once per region session and kept in memory; admin operations and
/// ban self-healing mutate it, after which the whole object is persisted
/// through the estate store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstateSettings {
    pub estate_id: EstateId,
    pub owner_id: AgentId,
    pub manager_ids: HashSet<AgentId>,
    pub access_ids: HashSet<AgentId>,
    pub group_ids: HashSet<GroupId>,
    pub bans: Vec<EstateBan>,

    pub allow_direct_teleport: bool,
    pub public_access: bool,
    pub deny_anonymous: bool,
    pub deny_identified: bool,
    pub deny_transacted: bool,
    pub deny_minors: bool,
}

impl EstateSettings {
    /// Open estate with the given id and owner
    pub fn new(estate_id: EstateId, owner_id: AgentId) -> Self {
        EstateSettings {
            estate_id,
            owner_id,
            manager_ids: HashSet::new(),
            access_ids: HashSet::new(),
            group_ids: HashSet::new(),
            bans: Vec::new(),
            allow_direct_teleport: true,
            public_access: true,
            deny_anonymous: false,
            deny_identified: false,
            deny_transacted: false,
            deny_minors: false,
        }
    }

    pub fn is_owner(&self, agent_id: AgentId) -> bool {
        self.owner_id == agent_id
    }

    pub fn is_manager(&self, agent_id: AgentId) -> bool {
        self.manager_ids.contains(&agent_id)
    }

    pub fn has_access(&self, agent_id: AgentId) -> bool {
        self.access_ids.contains(&agent_id)
    }

    /// Append a ban entry
    pub fn add_ban(&mut self, ban: EstateBan) {
        self.bans.push(ban);
    }

    /// Remove every ban entry for a user
    pub fn remove_ban(&mut self, agent_id: AgentId) {
        self.bans.retain(|b| b.banned_user_id != agent_id);
    }

    pub fn add_manager(&mut self, agent_id: AgentId) {
        self.manager_ids.insert(agent_id);
    }

    pub fn remove_manager(&mut self, agent_id: AgentId) {
        self.manager_ids.remove(&agent_id);
    }

    pub fn add_access(&mut self, agent_id: AgentId) {
        self.access_ids.insert(agent_id);
    }

    pub fn remove_access(&mut self, agent_id: AgentId) {
        self.access_ids.remove(&agent_id);
    }

    pub fn add_group(&mut self, group_id: GroupId) {
        self.group_ids.insert(group_id);
    }

    pub fn remove_group(&mut self, group_id: GroupId) {
        self.group_ids.remove(&group_id);
    }

    /// Rewrite the stored mask of an existing user ban with the address the
    /// user is currently connecting from. Returns true when an entry
    /// changed; calling again with the same address is a no-op.
    pub fn heal_ban(&mut self, agent_id: AgentId, current_address: &str) -> bool {
        let mut changed = false;
        for ban in self
            .bans
            .iter_mut()
            .filter(|b| b.banned_user_id == agent_id)
        {
            if ban.banned_host_ip_mask != current_address {
                ban.banned_host_ip_mask = current_address.to_string();
                changed = true;
            }
        }
        changed
    }

    /// Add a user ban because the user matched an existing ban's network
    /// mask. Returns true when a new entry was added; a user that already
    /// carries a ban entry is left alone so retries cannot duplicate.
    pub fn propagate_ban(&mut self, agent_id: AgentId, address: &str) -> bool {
        if self.bans.iter().any(|b| b.banned_user_id == agent_id) {
            return false;
        }
        let estate_id = self.estate_id;
        self.add_ban(EstateBan::for_user(agent_id, address, estate_id));
        true
    }
}
