//! Estate ban-list matching
//!
//! Pure classification over an ordered ban list. An entry naming the
//! querying user wins outright; otherwise entries match by network
//! identity: a reverse-DNS hostname containing the stored mask, a source
//! address starting with it, or exact equality with the stored host
//! address/name. Reverse DNS is resolved once by the caller, best-effort;
//! when it is absent only the prefix/equality checks apply.

use crate::model::{AgentId, EstateBan};

/// Result of scanning a ban list for one connecting user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanMatch {
    /// Entry at the index names this user id
    ExactUser(usize),
    /// Entry at the index matched the user's network identity only
    Mask(usize),
    /// No entry matched
    None,
}

impl BanMatch {
    pub fn is_banned(&self) -> bool {
        !matches!(self, BanMatch::None)
    }
}

/// Scan `bans` in order for the first entry covering the user.
///
/// `source_ip` is the address the user is connecting from, rendered as a
/// string; `hostname` is its reverse-DNS name when resolution succeeded.
pub fn classify(
    bans: &[EstateBan],
    user_id: AgentId,
    source_ip: Option<&str>,
    hostname: Option<&str>,
) -> BanMatch {
    for (index, ban) in bans.iter().enumerate() {
        if ban.banned_user_id == user_id {
            return BanMatch::ExactUser(index);
        }

        if mask_matches(ban, source_ip, hostname) {
            return BanMatch::Mask(index);
        }
    }
    BanMatch::None
}

fn mask_matches(ban: &EstateBan, source_ip: Option<&str>, hostname: Option<&str>) -> bool {
    let mask = ban.banned_host_ip_mask.as_str();
    if !mask.is_empty() {
        if let Some(host) = hostname {
            if host.contains(mask) {
                return true;
            }
        }
        if let Some(ip) = source_ip {
            if ip.starts_with(mask) {
                return true;
            }
        }
    }

    if let Some(ip) = source_ip {
        if !ban.banned_host_address.is_empty() && ip == ban.banned_host_address {
            return true;
        }
        if !ban.banned_host_name_mask.is_empty() && ip == ban.banned_host_name_mask {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EstateId;

    fn ban_for(user: AgentId, mask: &str) -> EstateBan {
        EstateBan::for_user(user, mask, EstateId(1))
    }

    #[test]
    fn test_empty_list_matches_nothing() {
        assert_eq!(classify(&[], AgentId::generate(), Some("1.2.3.4"), None), BanMatch::None);
    }

    #[test]
    fn test_exact_user_wins_regardless_of_ip() {
        let banned = AgentId::generate();
        let bans = vec![ban_for(banned, "1.2.3.4")];

        assert_eq!(classify(&bans, banned, Some("5.6.7.8"), None), BanMatch::ExactUser(0));
        assert_eq!(classify(&bans, banned, None, None), BanMatch::ExactUser(0));
    }

    #[test]
    fn test_ip_prefix_matches_other_user() {
        let bans = vec![ban_for(AgentId::generate(), "10.0.")];
        let newcomer = AgentId::generate();

        assert_eq!(classify(&bans, newcomer, Some("10.0.3.7"), None), BanMatch::Mask(0));
        assert_eq!(classify(&bans, newcomer, Some("10.1.3.7"), None), BanMatch::None);
    }

    #[test]
    fn test_hostname_containment_matches() {
        let mut ban = ban_for(AgentId::generate(), "badisp.example");
        ban.banned_host_address = String::new();
        ban.banned_host_name_mask = String::new();
        let bans = vec![ban];
        let newcomer = AgentId::generate();

        assert_eq!(
            classify(&bans, newcomer, Some("203.0.113.9"), Some("client-9.badisp.example")),
            BanMatch::Mask(0)
        );
        assert_eq!(
            classify(&bans, newcomer, Some("203.0.113.9"), Some("client-9.goodisp.example")),
            BanMatch::None
        );
    }

    #[test]
    fn test_host_address_equality_matches() {
        let mut ban = ban_for(AgentId::generate(), "");
        ban.banned_host_address = "198.51.100.4".to_string();
        ban.banned_host_name_mask = String::new();
        let bans = vec![ban];

        assert_eq!(
            classify(&bans, AgentId::generate(), Some("198.51.100.4"), None),
            BanMatch::Mask(0)
        );
        assert_eq!(
            classify(&bans, AgentId::generate(), Some("198.51.100.40"), None),
            BanMatch::None
        );
    }

    #[test]
    fn test_entries_scanned_in_order() {
        let banned = AgentId::generate();
        let bans = vec![ban_for(AgentId::generate(), "10.0."), ban_for(banned, "1.2.3.4")];

        // Mask entry earlier in the list wins over a later exact entry
        assert_eq!(classify(&bans, banned, Some("10.0.0.1"), None), BanMatch::Mask(0));
    }

    #[test]
    fn test_duplicate_entries_tolerated() {
        let banned = AgentId::generate();
        let bans = vec![ban_for(banned, "1.2.3.4"), ban_for(banned, "5.6.7.8")];

        assert_eq!(classify(&bans, banned, Some("9.9.9.9"), None), BanMatch::ExactUser(0));
    }

    #[test]
    fn test_missing_ip_cannot_mask_match() {
        let bans = vec![ban_for(AgentId::generate(), "10.0.")];
        assert_eq!(classify(&bans, AgentId::generate(), None, None), BanMatch::None);
    }
}
