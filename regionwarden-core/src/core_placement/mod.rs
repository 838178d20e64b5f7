//! Teleport placement pipeline
//!
//! Runs after admission succeeds and turns the requested coordinate into
//! the actual landing position. Stages run in order; each either produces a
//! definite position, denies with a reason, or defers to the next stage:
//! bounds clamping, parcel resolution, ban/restriction escape, landing
//! enforcement (telehub round-robin, landing points), the one-time prelude
//! gate, estate confinement, parcel content flags, and the terrain clamp.

use crate::config::EngineConfig;
use crate::decision::{DenyReason, Placement};
use crate::directory::{
    AccountDirectory, AgentInfoStore, GroupDirectory, ParcelDirectory, TerrainSampler,
};
use crate::core_telehub::TelehubRegistry;
use crate::model::{
    Account, AgentId, AgentInfo, AvatarPresence, EstateSettings, LandingKind, Parcel,
    ParcelFlags, TeleportFlags,
};
use crate::metrics;
use crate::region::RegionSession;
use glam::Vec3;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Height added above sampled terrain so avatars never land underground
const TERRAIN_CLEARANCE: f32 = 1.25;

/// One admitted agent's relocation request
#[derive(Debug, Clone)]
pub struct PlacementRequest {
    pub agent_id: AgentId,

    /// Requested landing coordinate
    pub position: Vec3,

    pub teleport_flags: TeleportFlags,

    pub is_child_agent: bool,

    /// In-scene presence, when the scene already has one for this agent
    pub presence: Option<AvatarPresence>,
}

/// Computes corrected landing positions
pub struct TeleportPlacementEngine {
    config: EngineConfig,
    accounts: Arc<dyn AccountDirectory>,
    agent_infos: Arc<dyn AgentInfoStore>,
    parcels: Arc<dyn ParcelDirectory>,
    terrain: Arc<dyn TerrainSampler>,
    groups: Arc<dyn GroupDirectory>,
    telehubs: Arc<TelehubRegistry>,
}

enum Escape {
    /// A nearby parcel accepts the agent; land at its landing point
    Relocated { parcel: Arc<Parcel>, position: Vec3 },
    /// Nothing nearby qualifies; dump at the nearest region edge
    EdgeDump(Vec3),
    /// No presence exists to relocate safely
    Denied,
}

impl TeleportPlacementEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: EngineConfig,
        accounts: Arc<dyn AccountDirectory>,
        agent_infos: Arc<dyn AgentInfoStore>,
        parcels: Arc<dyn ParcelDirectory>,
        terrain: Arc<dyn TerrainSampler>,
        groups: Arc<dyn GroupDirectory>,
        telehubs: Arc<TelehubRegistry>,
    ) -> Self {
        TeleportPlacementEngine {
            config,
            accounts,
            agent_infos,
            parcels,
            terrain,
            groups,
            telehubs,
        }
    }

    /// Compute the landing position for an admitted agent
    pub async fn place(&self, session: &RegionSession, request: &PlacementRequest) -> Placement {
        let placement = self.run_pipeline(session, request).await;
        match &placement {
            Placement::Allow { position } => {
                metrics::placement("allowed");
                debug!(
                    agent_id = %request.agent_id,
                    region = %session.info.name,
                    ?position,
                    "placement computed"
                );
            }
            Placement::Deny(reason) => {
                metrics::placement("denied");
                info!(
                    agent_id = %request.agent_id,
                    region = %session.info.name,
                    reason = %reason,
                    "placement denied"
                );
            }
        }
        placement
    }

    async fn run_pipeline(&self, session: &RegionSession, request: &PlacementRequest) -> Placement {
        let Some(account) = self
            .accounts
            .lookup(session.info.scope_id, request.agent_id)
        else {
            return Placement::Deny(DenyReason::AuthenticationFailed);
        };

        let mut position =
            clamp_to_region(request.position, session.info.size_x, session.info.size_y);

        let Some(mut parcel) = self.resolve_parcel(&mut position) else {
            return Placement::Deny(DenyReason::NoParcel);
        };

        let presence = request.presence.as_ref();
        let active_group = presence.and_then(|p| p.active_group);
        if parcel.is_banned(request.agent_id) || parcel.restricts(request.agent_id, active_group) {
            match self.escape_restricted(position, presence, request.agent_id) {
                Escape::Relocated { parcel: found, position: landing } => {
                    parcel = found;
                    position = landing;
                }
                Escape::EdgeDump(edge) => {
                    position = edge;
                    let Some(found) = self.resolve_parcel(&mut position) else {
                        return Placement::Deny(DenyReason::NoParcel);
                    };
                    parcel = found;
                }
                Escape::Denied => return Placement::Deny(DenyReason::ParcelBanned),
            }
        }

        if let Some(denied) = self
            .enforce_landing(session, request, &account, &mut parcel, &mut position)
            .await
        {
            return Placement::Deny(denied);
        }

        let estate_id = session.estate.read().await.estate_id;
        let agent_info = self.agent_infos.get(request.agent_id);
        if let Some(mut info) = agent_info.clone() {
            if session.info.is_prelude() {
                if !info.record_prelude_visit(session.region_id()) {
                    return Placement::Deny(DenyReason::PreludeAlreadyVisited);
                }
                self.persist_agent_info(info.clone());
            }
            if let Some(limited_to) = info.limited_to_estate {
                if limited_to != estate_id {
                    return Placement::Deny(DenyReason::OutsideLimitedEstate);
                }
            }
        }

        if parcel.flags.contains(ParcelFlags::DENY_ANONYMOUS) && account.lacks_payment_info() {
            return Placement::Deny(DenyReason::EntryDenied);
        }
        if parcel.flags.contains(ParcelFlags::DENY_AGE_UNVERIFIED) {
            if agent_info.as_ref().map_or(false, AgentInfo::is_minor) {
                return Placement::Deny(DenyReason::EntryDenied);
            }
        }

        let sample_x = position.x.max(0.0) as u32;
        let sample_y = position.y.max(0.0) as u32;
        let floor = self.terrain.height_at(sample_x, sample_y) + TERRAIN_CLEARANCE;
        if floor.is_finite() && floor >= position.z {
            position.z = floor;
        }

        Placement::Allow { position }
    }

    /// Landing-point enforcement for non-direct, non-crossing arrivals
    async fn enforce_landing(
        &self,
        session: &RegionSession,
        request: &PlacementRequest,
        account: &Account,
        parcel: &mut Arc<Parcel>,
        position: &mut Vec3,
    ) -> Option<DenyReason> {
        let is_crossing = !self.config.force_landing_points_on_crossing
            && request.is_child_agent
            && request.teleport_flags.contains(TeleportFlags::VIA_REGION_ID);
        if is_crossing {
            return None;
        }
        let direct = request.teleport_flags.is_direct();

        let presence = request.presence.as_ref();
        let privileged = presence.map_or(false, |p| p.god_level != 0) || account.user_level != 0;
        let estate = session.estate.read().await;
        if !direct && !estate.allow_direct_teleport {
            if !privileged {
                if let Some(hub_position) =
                    self.telehubs.next_spawn_position(session.region_id()).await
                {
                    *position = hub_position;
                } else if parcel.landing == LandingKind::LandingPoint {
                    *position = self.landing_point_or_edge(parcel, presence, *position);
                }
            }
        } else if !privileged && !self.has_parcel_permission(request.agent_id, parcel, &estate) {
            match parcel.landing {
                LandingKind::None => {
                    // Hard block: the parcel accepts no incoming teleports,
                    // direct or otherwise
                    match self.escape_restricted(*position, presence, request.agent_id) {
                        Escape::Relocated { parcel: found, position: landing } => {
                            *parcel = found;
                            *position = landing;
                        }
                        Escape::EdgeDump(edge) => *position = edge,
                        Escape::Denied => return Some(DenyReason::ParcelBanned),
                    }
                }
                LandingKind::LandingPoint if !direct => {
                    *position = self.landing_point_or_edge(parcel, presence, *position);
                }
                _ => {}
            }
        }
        None
    }

    /// Parcel at the position, falling back to the region's first parcel
    /// (recentring the position at its ground centroid)
    fn resolve_parcel(&self, position: &mut Vec3) -> Option<Arc<Parcel>> {
        if let Some(parcel) = self.parcels.at_point(position.x, position.y) {
            return Some(parcel);
        }
        let first = self.parcels.all_parcels().into_iter().next()?;
        *position = self.parcels.ground_center(&first);
        Some(first)
    }

    /// Find the nearest parcel that neither bans nor restricts the agent
    /// and adopt its landing point. Parcels that block incoming teleports
    /// are never relocation targets.
    fn escape_restricted(
        &self,
        position: Vec3,
        presence: Option<&AvatarPresence>,
        agent_id: AgentId,
    ) -> Escape {
        for candidate in self.parcels.near_point(position) {
            if candidate.landing == LandingKind::None {
                continue;
            }
            if candidate.is_banned_or_restricted(agent_id) {
                continue;
            }
            let landing = if candidate.has_user_location() {
                candidate.user_location
            } else {
                self.parcels.ground_center(&candidate)
            };
            return Escape::Relocated { parcel: candidate, position: landing };
        }

        match presence {
            Some(presence) => Escape::EdgeDump(self.parcels.nearest_edge(presence)),
            None => Escape::Denied,
        }
    }

    fn landing_point_or_edge(
        &self,
        parcel: &Parcel,
        presence: Option<&AvatarPresence>,
        current: Vec3,
    ) -> Vec3 {
        if parcel.has_user_location() {
            parcel.user_location
        } else if let Some(presence) = presence {
            self.parcels.nearest_edge(presence)
        } else {
            current
        }
    }

    /// Estate owners/managers and members of the parcel's group hold
    /// generic parcel permission.
    fn has_parcel_permission(
        &self,
        agent_id: AgentId,
        parcel: &Parcel,
        estate: &EstateSettings,
    ) -> bool {
        if estate.is_owner(agent_id) || estate.is_manager(agent_id) {
            return true;
        }
        match parcel.group_id {
            Some(group) => self.groups.memberships_of(agent_id).contains(&group),
            None => false,
        }
    }

    /// Persist an agent record without blocking the decision
    fn persist_agent_info(&self, info: AgentInfo) {
        let store = self.agent_infos.clone();
        let agent_id = info.agent_id;
        tokio::spawn(async move {
            if let Err(err) = store.update(info).await {
                warn!(%agent_id, error = %err, "failed to persist agent record");
            }
        });
    }
}

/// Fold an out-of-bounds coordinate back into the region.
///
/// Anything outside `[-2, size - 2]` on X or Y is folded into `[0, size]`
/// by repeatedly adding or subtracting the region size, then mirrored
/// across the axis center. In-range input comes back untouched.
pub fn clamp_to_region(position: Vec3, size_x: u32, size_y: u32) -> Vec3 {
    let size_x = size_x as f32;
    let size_y = size_y as f32;
    let mut p = position;

    if p.x < -2.0 || p.y < -2.0 || p.x > size_x - 2.0 || p.y > size_y - 2.0 {
        let mut folded_x = false;
        let mut folded_y = false;

        while p.x < 0.0 {
            p.x += size_x;
            folded_x = true;
        }
        while p.x > size_x {
            p.x -= size_x;
            folded_x = true;
        }
        while p.y < 0.0 {
            p.y += size_y;
            folded_y = true;
        }
        while p.y > size_y {
            p.y -= size_y;
            folded_y = true;
        }

        if folded_x {
            p.x = size_x - p.x;
        }
        if folded_y {
            p.y = size_y - p.y;
        }
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clamp_is_identity_in_range() {
        let p = Vec3::new(100.0, 200.0, 21.0);
        assert_eq!(clamp_to_region(p, 256, 256), p);
    }

    #[test]
    fn test_clamp_identity_near_upper_edge() {
        // Past size-2 but still inside the region: triggers the check but
        // folds nothing
        let p = Vec3::new(255.0, 10.0, 21.0);
        assert_eq!(clamp_to_region(p, 256, 256), p);
    }

    #[test]
    fn test_clamp_folds_and_mirrors_negative() {
        let p = Vec3::new(-3.0, 10.0, 21.0);
        let clamped = clamp_to_region(p, 256, 256);
        assert_eq!(clamped.x, 256.0 - 253.0);
        assert_eq!(clamped.y, 10.0);
    }

    #[test]
    fn test_clamp_folds_and_mirrors_overshoot() {
        let p = Vec3::new(300.0, 10.0, 21.0);
        let clamped = clamp_to_region(p, 256, 256);
        assert_eq!(clamped.x, 256.0 - 44.0);
    }

    #[test]
    fn test_clamp_preserves_z() {
        let p = Vec3::new(-100.0, 900.0, 77.5);
        assert_eq!(clamp_to_region(p, 256, 256).z, 77.5);
    }

    proptest! {
        #[test]
        fn prop_in_range_positions_unchanged(
            x in 0.0f32..=256.0,
            y in 0.0f32..=256.0,
        ) {
            let p = Vec3::new(x, y, 21.0);
            prop_assert_eq!(clamp_to_region(p, 256, 256), p);
        }

        #[test]
        fn prop_result_always_inside_region(
            x in -2000.0f32..=2000.0,
            y in -2000.0f32..=2000.0,
        ) {
            let clamped = clamp_to_region(Vec3::new(x, y, 21.0), 256, 256);
            prop_assert!(clamped.x >= 0.0 && clamped.x <= 256.0, "x = {}", clamped.x);
            prop_assert!(clamped.y >= 0.0 && clamped.y <= 256.0, "y = {}", clamped.y);
        }

        #[test]
        fn prop_holds_for_rectangular_regions(
            x in -4000.0f32..=4000.0,
            y in -4000.0f32..=4000.0,
        ) {
            let clamped = clamp_to_region(Vec3::new(x, y, 0.0), 512, 128);
            prop_assert!(clamped.x >= 0.0 && clamped.x <= 512.0);
            prop_assert!(clamped.y >= 0.0 && clamped.y <= 128.0);
        }
    }
}
