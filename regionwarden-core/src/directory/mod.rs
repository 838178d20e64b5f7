//! Injected capability interfaces
//!
//! The engine consumes every external service through these traits so
//! decision logic runs without live network dependencies. Only the presence
//! query and reverse-DNS resolution are async; both are wrapped in explicit
//! timeouts by their callers and degrade to defined fallbacks. Everything
//! else is synchronous and never suspends a decision.
//!
//! In-memory implementations for tests and the demo binary live in
//! [`memory`].

mod error;
pub mod memory;

pub use error::DirectoryError;

use crate::model::{
    Account, AgentId, AgentInfo, AvatarPresence, EstateSettings, GroupId, Parcel, RegionId,
};
use async_trait::async_trait;
use glam::Vec3;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use uuid::Uuid;

/// Online state reported by the presence directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceStatus {
    pub is_online: bool,
}

/// Grid account lookups
pub trait AccountDirectory: Send + Sync {
    /// Resolve an account within a scope. `None` when no account exists.
    fn lookup(&self, scope_id: Option<Uuid>, agent_id: AgentId) -> Option<Account>;
}

/// Grid presence lookups.
///
/// Callers bound this with a timeout; an error (or timeout) means the
/// service is unavailable, which is itself a denial for the requesting
/// agent — it is never retried within a decision.
#[async_trait]
pub trait PresenceDirectory: Send + Sync {
    async fn status(&self, agent_id: AgentId) -> Result<PresenceStatus, DirectoryError>;
}

/// Estate settings persistence. Saves are whole-object upserts.
#[async_trait]
pub trait EstateStore: Send + Sync {
    async fn load(&self, region_id: RegionId) -> Result<EstateSettings, DirectoryError>;
    async fn save(&self, settings: EstateSettings) -> Result<(), DirectoryError>;
}

/// Persistent per-agent grid records
#[async_trait]
pub trait AgentInfoStore: Send + Sync {
    fn get(&self, agent_id: AgentId) -> Option<AgentInfo>;
    async fn update(&self, info: AgentInfo) -> Result<(), DirectoryError>;
}

/// Parcel lookups within the hosting region
pub trait ParcelDirectory: Send + Sync {
    /// Parcel covering the given XY coordinate, if any
    fn at_point(&self, x: f32, y: f32) -> Option<Arc<Parcel>>;

    /// Parcels near a position, closest first
    fn near_point(&self, position: Vec3) -> Vec<Arc<Parcel>>;

    /// Region-edge position nearest to the presence's location
    fn nearest_edge(&self, presence: &AvatarPresence) -> Vec3;

    /// Center of a parcel at ground level
    fn ground_center(&self, parcel: &Parcel) -> Vec3;

    /// Every parcel in the region, in stable order
    fn all_parcels(&self) -> Vec<Arc<Parcel>>;
}

/// Terrain heightfield sampling
pub trait TerrainSampler: Send + Sync {
    fn height_at(&self, x: u32, y: u32) -> f32;
}

/// Group membership lookups
pub trait GroupDirectory: Send + Sync {
    fn memberships_of(&self, agent_id: AgentId) -> HashSet<GroupId>;
}

/// Best-effort reverse-DNS resolution used by ban-mask matching.
///
/// `None` covers both "no PTR record" and any resolution failure; a failure
/// never surfaces to the caller, matching degrades to prefix/equality
/// checks.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn reverse_lookup(&self, ip: IpAddr) -> Option<String>;
}

/// Time source, injectable for tests. Unix seconds serve both the cooldown
/// window and the account-age check.
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> i64;
}
