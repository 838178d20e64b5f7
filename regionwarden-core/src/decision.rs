//! Decision result types
//!
//! Every admission or placement decision resolves to a single tagged value:
//! allow (with the corrected landing position, for placement) or deny with a
//! human-readable reason. There is no partially-initialized output state.

use glam::Vec3;
use thiserror::Error;

/// Why an agent was refused entry or placement.
///
/// The `Display` strings are surfaced verbatim to the connecting viewer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DenyReason {
    #[error("No account exists")]
    NoAccount,

    #[error("Failed authentication.")]
    AuthenticationFailed,

    #[error("Logins are currently Disabled")]
    LoginsDisabled,

    #[error("Too many teleports. Please try again soon.")]
    TeleportCooldown,

    #[error("You have been banned from this region.")]
    BanCriteria,

    #[error("Failed to verify user presence in the grid for {account} in region {region}. Presence service does not exist.")]
    PresenceServiceUnavailable { account: String, region: String },

    #[error("Failed to verify user presence in the grid for {account}, access denied to region {region}.")]
    NotOnline { account: String, region: String },

    #[error("Too many agents at this time. Please come back later.")]
    RegionFull,

    #[error("Banned from this region.")]
    Banned,

    #[error("You may not enter this region.")]
    EntryDenied,

    #[error("You may not enter this region, Public access has been turned off.")]
    PublicAccessOff,

    #[error("The region has too high of a maturity level. Blocking teleport.")]
    MaturityTooHigh,

    #[error("Banned from this parcel.")]
    ParcelBanned,

    #[error("You may not enter this region as you have already been to this prelude region.")]
    PreludeAlreadyVisited,

    #[error("You may not enter this region, as it is outside of the estate you are limited to.")]
    OutsideLimitedEstate,

    #[error("Unable to find land details")]
    NoParcel,
}

impl DenyReason {
    /// Stable label for metrics and structured logs
    pub fn label(&self) -> &'static str {
        match self {
            DenyReason::NoAccount => "no_account",
            DenyReason::AuthenticationFailed => "authentication_failed",
            DenyReason::LoginsDisabled => "logins_disabled",
            DenyReason::TeleportCooldown => "teleport_cooldown",
            DenyReason::BanCriteria => "ban_criteria",
            DenyReason::PresenceServiceUnavailable { .. } => "presence_unavailable",
            DenyReason::NotOnline { .. } => "not_online",
            DenyReason::RegionFull => "region_full",
            DenyReason::Banned => "banned",
            DenyReason::EntryDenied => "entry_denied",
            DenyReason::PublicAccessOff => "public_access_off",
            DenyReason::MaturityTooHigh => "maturity",
            DenyReason::ParcelBanned => "parcel_banned",
            DenyReason::PreludeAlreadyVisited => "prelude",
            DenyReason::OutsideLimitedEstate => "limited_to_estate",
            DenyReason::NoParcel => "no_parcel",
        }
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    Allow,
    Deny(DenyReason),
}

impl AdmissionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AdmissionDecision::Allow)
    }

    /// Denial reason, if denied
    pub fn reason(&self) -> Option<&DenyReason> {
        match self {
            AdmissionDecision::Allow => None,
            AdmissionDecision::Deny(reason) => Some(reason),
        }
    }
}

/// Outcome of a placement computation
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// Entry allowed at the corrected landing position
    Allow { position: Vec3 },
    Deny(DenyReason),
}

impl Placement {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Placement::Allow { .. })
    }

    /// Landing position, if allowed
    pub fn position(&self) -> Option<Vec3> {
        match self {
            Placement::Allow { position } => Some(*position),
            Placement::Deny(_) => None,
        }
    }

    /// Denial reason, if denied
    pub fn reason(&self) -> Option<&DenyReason> {
        match self {
            Placement::Allow { .. } => None,
            Placement::Deny(reason) => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deny_reason_display_texts() {
        assert_eq!(DenyReason::NoAccount.to_string(), "No account exists");
        assert_eq!(
            DenyReason::TeleportCooldown.to_string(),
            "Too many teleports. Please try again soon."
        );
        assert_eq!(
            DenyReason::NotOnline {
                account: "Test Resident".to_string(),
                region: "Sandbox".to_string()
            }
            .to_string(),
            "Failed to verify user presence in the grid for Test Resident, access denied to region Sandbox."
        );
    }

    #[test]
    fn test_decision_accessors() {
        assert!(AdmissionDecision::Allow.is_allowed());
        let deny = AdmissionDecision::Deny(DenyReason::Banned);
        assert!(!deny.is_allowed());
        assert_eq!(deny.reason(), Some(&DenyReason::Banned));
    }

    #[test]
    fn test_placement_accessors() {
        let allow = Placement::Allow { position: Vec3::new(1.0, 2.0, 3.0) };
        assert!(allow.is_allowed());
        assert_eq!(allow.position(), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(Placement::Deny(DenyReason::ParcelBanned).position(), None);
    }
}
