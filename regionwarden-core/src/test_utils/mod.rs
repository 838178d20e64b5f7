//! Shared fixtures for unit and integration tests
//!
//! [`TestWorld`] stands up the full engine against the in-memory
//! directories: one 256x256 region on estate 1 with a single open parcel
//! covering it, flat terrain at 20m, and a manual clock.

use crate::config::EngineConfig;
use crate::core_admission::{AdmissionPolicyEngine, AdmissionRequest};
use crate::core_placement::{PlacementRequest, TeleportPlacementEngine};
use crate::core_telehub::TelehubRegistry;
use crate::directory::memory::{
    FlatTerrain, ManualClock, MemoryAccountDirectory, MemoryAgentInfoStore, MemoryEstateStore,
    MemoryGroupDirectory, MemoryParcelDirectory, MemoryPresenceDirectory, NoopResolver,
    ParcelRect,
};
use crate::directory::{EstateStore, NameResolver};
use crate::model::{
    Account, AgentId, AvatarPresence, EstateId, EstateSettings, Parcel, PaymentFlags, RegionId,
    RegionInfo, TeleportFlags,
};
use crate::region::{RegionSession, RegionStates};
use glam::Vec3;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

/// Fixed "now" the manual clock starts at
pub const T0: i64 = 1_700_000_000;

/// Default ground height of the flat test terrain
pub const GROUND: f32 = 20.0;

/// A fully wired in-memory world for exercising decisions
pub struct TestWorld {
    pub config: EngineConfig,
    pub region: RegionInfo,
    pub owner: AgentId,

    pub accounts: Arc<MemoryAccountDirectory>,
    pub presence_dir: Arc<MemoryPresenceDirectory>,
    pub estate_store: Arc<MemoryEstateStore>,
    pub agent_infos: Arc<MemoryAgentInfoStore>,
    pub parcels: Arc<MemoryParcelDirectory>,
    pub terrain: Arc<FlatTerrain>,
    pub groups: Arc<MemoryGroupDirectory>,
    pub resolver: Arc<dyn NameResolver>,
    pub clock: Arc<ManualClock>,
    pub states: Arc<RegionStates>,
    pub telehubs: Arc<TelehubRegistry>,
}

impl TestWorld {
    /// World with one open region-wide parcel and an owner account
    pub fn new() -> Self {
        let world = Self::bare();
        world.parcels.add(
            Parcel::new("mainland"),
            ParcelRect::new(
                0.0,
                0.0,
                world.region.size_x as f32,
                world.region.size_y as f32,
                GROUND,
            ),
        );
        world
    }

    /// World without any parcels, for tests that lay out their own
    pub fn bare() -> Self {
        let region_id = RegionId::generate();
        let region = RegionInfo::new(region_id, "Sandbox");
        let owner = AgentId::generate();

        let accounts = Arc::new(MemoryAccountDirectory::new());
        accounts.insert(resident_account(owner, "Estate Owner"));

        let presence_dir = Arc::new(MemoryPresenceDirectory::new());
        presence_dir.set_online(owner, true);

        let estate_store = Arc::new(MemoryEstateStore::new());
        estate_store.insert(region_id, EstateSettings::new(EstateId(1), owner));

        let parcels = Arc::new(MemoryParcelDirectory::new(region.size_x, region.size_y));

        let states = Arc::new(RegionStates::new());
        let telehubs = Arc::new(TelehubRegistry::new(states.clone()));

        let mut config = EngineConfig::default();
        // Most scenarios issue several decisions back to back; the cooldown
        // has its own dedicated tests
        config.block_teleport_cooldown = false;

        TestWorld {
            config,
            region,
            owner,
            accounts,
            presence_dir,
            estate_store,
            agent_infos: Arc::new(MemoryAgentInfoStore::new()),
            parcels,
            terrain: Arc::new(FlatTerrain::new(GROUND)),
            groups: Arc::new(MemoryGroupDirectory::new()),
            resolver: Arc::new(NoopResolver),
            clock: Arc::new(ManualClock::new(T0)),
            states,
            telehubs,
        }
    }

    /// Register an online resident with payment info on file, created 100
    /// days before [`T0`]
    pub fn add_resident(&self, name: &str) -> AgentId {
        let agent_id = AgentId::generate();
        self.accounts.insert(resident_account(agent_id, name));
        self.presence_dir.set_online(agent_id, true);
        agent_id
    }

    /// Mutate the stored estate settings before the session is activated
    pub fn with_estate(&self, f: impl FnOnce(&mut EstateSettings)) {
        let mut settings = self
            .estate_store
            .stored(self.region.region_id)
            .expect("estate seeded");
        f(&mut settings);
        self.estate_store.insert(self.region.region_id, settings);
    }

    /// Activate a session against the stored estate settings
    pub async fn session(&self) -> RegionSession {
        let store: Arc<dyn EstateStore> = self.estate_store.clone();
        RegionSession::activate(self.region.clone(), &store, &self.states)
            .await
            .expect("estate seeded")
    }

    pub fn admission_engine(&self) -> AdmissionPolicyEngine {
        AdmissionPolicyEngine::new(
            self.config.clone(),
            self.accounts.clone(),
            self.presence_dir.clone(),
            self.estate_store.clone(),
            self.agent_infos.clone(),
            self.groups.clone(),
            self.resolver.clone(),
            self.clock.clone(),
        )
    }

    pub fn placement_engine(&self) -> TeleportPlacementEngine {
        TeleportPlacementEngine::new(
            self.config.clone(),
            self.accounts.clone(),
            self.agent_infos.clone(),
            self.parcels.clone(),
            self.terrain.clone(),
            self.groups.clone(),
            self.telehubs.clone(),
        )
    }

    /// Admission request with a routable source address and no presence
    pub fn admission_request(&self, agent_id: AgentId) -> AdmissionRequest {
        AdmissionRequest {
            agent_id,
            source_ip: Some(test_ip()),
            teleport_flags: TeleportFlags::empty(),
            is_child_agent: false,
            presence: None,
        }
    }

    /// Placement request targeting the given coordinate, with an in-scene
    /// presence standing at it
    pub fn placement_request(&self, agent_id: AgentId, position: Vec3) -> PlacementRequest {
        PlacementRequest {
            agent_id,
            position,
            teleport_flags: TeleportFlags::empty(),
            is_child_agent: false,
            presence: Some(self.presence_at(agent_id, position)),
        }
    }

    pub fn presence_at(&self, agent_id: AgentId, position: Vec3) -> AvatarPresence {
        AvatarPresence {
            agent_id,
            name: "Test Resident".to_string(),
            god_level: 0,
            is_child_agent: false,
            endpoint: Some(test_ip()),
            active_group: None,
            position,
        }
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Address test requests connect from
pub fn test_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5))
}

fn resident_account(agent_id: AgentId, name: &str) -> Account {
    Account {
        agent_id,
        name: name.to_string(),
        user_level: 0,
        created_at: T0 - 100 * 24 * 60 * 60,
        payment_flags: PaymentFlags::PAYMENT_INFO_ON_FILE,
        scope_id: None,
    }
}
