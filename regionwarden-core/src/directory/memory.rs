//! In-memory capability implementations
//!
//! Back the engine in unit/integration tests and the demo binary. All state
//! lives behind `std::sync` locks; none of the async methods hold a lock
//! across an await point.

use super::{
    AccountDirectory, AgentInfoStore, Clock, DirectoryError, EstateStore, GroupDirectory,
    NameResolver, ParcelDirectory, PresenceDirectory, PresenceStatus, TerrainSampler,
};
use crate::model::{
    Account, AgentId, AgentInfo, AvatarPresence, EstateSettings, GroupId, Parcel, ParcelId,
    RegionId,
};
use async_trait::async_trait;
use glam::Vec3;
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Account directory over a hash map
#[derive(Default)]
pub struct MemoryAccountDirectory {
    accounts: RwLock<HashMap<AgentId, Account>>,
}

impl MemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, account: Account) {
        self.accounts
            .write()
            .expect("account lock poisoned")
            .insert(account.agent_id, account);
    }
}

impl AccountDirectory for MemoryAccountDirectory {
    fn lookup(&self, scope_id: Option<Uuid>, agent_id: AgentId) -> Option<Account> {
        let accounts = self.accounts.read().expect("account lock poisoned");
        let account = accounts.get(&agent_id)?;
        if let (Some(scope), Some(account_scope)) = (scope_id, account.scope_id) {
            if scope != account_scope {
                return None;
            }
        }
        Some(account.clone())
    }
}

/// Presence directory with a toggleable outage switch
pub struct MemoryPresenceDirectory {
    online: RwLock<HashSet<AgentId>>,
    available: AtomicBool,
}

impl Default for MemoryPresenceDirectory {
    fn default() -> Self {
        MemoryPresenceDirectory {
            online: RwLock::new(HashSet::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl MemoryPresenceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_online(&self, agent_id: AgentId, online: bool) {
        let mut set = self.online.write().expect("presence lock poisoned");
        if online {
            set.insert(agent_id);
        } else {
            set.remove(&agent_id);
        }
    }

    /// Simulate a presence-service outage
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl PresenceDirectory for MemoryPresenceDirectory {
    async fn status(&self, agent_id: AgentId) -> Result<PresenceStatus, DirectoryError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("presence directory".to_string()));
        }
        let online = self
            .online
            .read()
            .expect("presence lock poisoned")
            .contains(&agent_id);
        Ok(PresenceStatus { is_online: online })
    }
}

/// Estate store keyed by region, tracking save calls for assertions
#[derive(Default)]
pub struct MemoryEstateStore {
    estates: RwLock<HashMap<RegionId, EstateSettings>>,
    save_count: AtomicUsize,
}

impl MemoryEstateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, region_id: RegionId, settings: EstateSettings) {
        self.estates
            .write()
            .expect("estate lock poisoned")
            .insert(region_id, settings);
    }

    /// Last persisted settings for a region
    pub fn stored(&self, region_id: RegionId) -> Option<EstateSettings> {
        self.estates
            .read()
            .expect("estate lock poisoned")
            .get(&region_id)
            .cloned()
    }

    /// Number of `save` calls observed
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EstateStore for MemoryEstateStore {
    async fn load(&self, region_id: RegionId) -> Result<EstateSettings, DirectoryError> {
        self.estates
            .read()
            .expect("estate lock poisoned")
            .get(&region_id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    async fn save(&self, settings: EstateSettings) -> Result<(), DirectoryError> {
        let mut estates = self.estates.write().expect("estate lock poisoned");
        for stored in estates.values_mut() {
            if stored.estate_id == settings.estate_id {
                *stored = settings.clone();
            }
        }
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Agent-info store over a hash map
#[derive(Default)]
pub struct MemoryAgentInfoStore {
    infos: RwLock<HashMap<AgentId, AgentInfo>>,
}

impl MemoryAgentInfoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, info: AgentInfo) {
        self.infos
            .write()
            .expect("agent info lock poisoned")
            .insert(info.agent_id, info);
    }
}

#[async_trait]
impl AgentInfoStore for MemoryAgentInfoStore {
    fn get(&self, agent_id: AgentId) -> Option<AgentInfo> {
        self.infos
            .read()
            .expect("agent info lock poisoned")
            .get(&agent_id)
            .cloned()
    }

    async fn update(&self, info: AgentInfo) -> Result<(), DirectoryError> {
        self.infos
            .write()
            .expect("agent info lock poisoned")
            .insert(info.agent_id, info);
        Ok(())
    }
}

/// Axis-aligned footprint of a parcel within the region
#[derive(Debug, Clone, Copy)]
pub struct ParcelRect {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
    pub ground_z: f32,
}

impl ParcelRect {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32, ground_z: f32) -> Self {
        ParcelRect { x_min, y_min, x_max, y_max, ground_z }
    }

    fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x_min && x < self.x_max && y >= self.y_min && y < self.y_max
    }

    fn center(&self) -> Vec3 {
        Vec3::new(
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
            self.ground_z,
        )
    }
}

struct ParcelEntry {
    rect: ParcelRect,
    parcel: Arc<Parcel>,
}

/// Parcel directory over rectangular footprints
pub struct MemoryParcelDirectory {
    entries: RwLock<Vec<ParcelEntry>>,
    size_x: f32,
    size_y: f32,
}

impl MemoryParcelDirectory {
    pub fn new(size_x: u32, size_y: u32) -> Self {
        MemoryParcelDirectory {
            entries: RwLock::new(Vec::new()),
            size_x: size_x as f32,
            size_y: size_y as f32,
        }
    }

    pub fn add(&self, parcel: Parcel, rect: ParcelRect) -> Arc<Parcel> {
        let parcel = Arc::new(parcel);
        self.entries
            .write()
            .expect("parcel lock poisoned")
            .push(ParcelEntry { rect, parcel: parcel.clone() });
        parcel
    }

    fn rect_of(&self, parcel_id: ParcelId) -> Option<ParcelRect> {
        self.entries
            .read()
            .expect("parcel lock poisoned")
            .iter()
            .find(|e| e.parcel.id == parcel_id)
            .map(|e| e.rect)
    }
}

impl ParcelDirectory for MemoryParcelDirectory {
    fn at_point(&self, x: f32, y: f32) -> Option<Arc<Parcel>> {
        self.entries
            .read()
            .expect("parcel lock poisoned")
            .iter()
            .find(|e| e.rect.contains(x, y))
            .map(|e| e.parcel.clone())
    }

    fn near_point(&self, position: Vec3) -> Vec<Arc<Parcel>> {
        let entries = self.entries.read().expect("parcel lock poisoned");
        let mut with_distance: Vec<(f32, Arc<Parcel>)> = entries
            .iter()
            .map(|e| {
                let center = e.rect.center();
                let dx = center.x - position.x;
                let dy = center.y - position.y;
                (dx * dx + dy * dy, e.parcel.clone())
            })
            .collect();
        with_distance.sort_by(|a, b| a.0.total_cmp(&b.0));
        with_distance.into_iter().map(|(_, p)| p).collect()
    }

    fn nearest_edge(&self, presence: &AvatarPresence) -> Vec3 {
        let pos = presence.position;
        let candidates = [
            Vec3::new(0.0, pos.y, pos.z),
            Vec3::new(self.size_x, pos.y, pos.z),
            Vec3::new(pos.x, 0.0, pos.z),
            Vec3::new(pos.x, self.size_y, pos.z),
        ];
        candidates
            .into_iter()
            .min_by(|a, b| a.distance_squared(pos).total_cmp(&b.distance_squared(pos)))
            .unwrap_or(pos)
    }

    fn ground_center(&self, parcel: &Parcel) -> Vec3 {
        match self.rect_of(parcel.id) {
            Some(rect) => rect.center(),
            None => Vec3::new(self.size_x / 2.0, self.size_y / 2.0, 0.0),
        }
    }

    fn all_parcels(&self) -> Vec<Arc<Parcel>> {
        self.entries
            .read()
            .expect("parcel lock poisoned")
            .iter()
            .map(|e| e.parcel.clone())
            .collect()
    }
}

/// Flat terrain at a fixed height
pub struct FlatTerrain {
    pub height: f32,
}

impl FlatTerrain {
    pub fn new(height: f32) -> Self {
        FlatTerrain { height }
    }
}

impl TerrainSampler for FlatTerrain {
    fn height_at(&self, _x: u32, _y: u32) -> f32 {
        self.height
    }
}

/// Group directory over a hash map
#[derive(Default)]
pub struct MemoryGroupDirectory {
    memberships: RwLock<HashMap<AgentId, HashSet<GroupId>>>,
}

impl MemoryGroupDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_membership(&self, agent_id: AgentId, group_id: GroupId) {
        self.memberships
            .write()
            .expect("group lock poisoned")
            .entry(agent_id)
            .or_default()
            .insert(group_id);
    }
}

impl GroupDirectory for MemoryGroupDirectory {
    fn memberships_of(&self, agent_id: AgentId) -> HashSet<GroupId> {
        self.memberships
            .read()
            .expect("group lock poisoned")
            .get(&agent_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// Resolver that never resolves; the production default when no reverse-DNS
/// backend is wired in
pub struct NoopResolver;

#[async_trait]
impl NameResolver for NoopResolver {
    async fn reverse_lookup(&self, _ip: IpAddr) -> Option<String> {
        None
    }
}

/// Resolver over a fixed table
#[derive(Default)]
pub struct StaticResolver {
    table: HashMap<IpAddr, String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, ip: IpAddr, hostname: impl Into<String>) -> Self {
        self.table.insert(ip, hostname.into());
        self
    }
}

#[async_trait]
impl NameResolver for StaticResolver {
    async fn reverse_lookup(&self, ip: IpAddr) -> Option<String> {
        self.table.get(&ip).cloned()
    }
}

/// Wall clock
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock for tests
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        ManualClock { now: AtomicI64::new(now) }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PaymentFlags;

    #[test]
    fn test_account_scope_mismatch() {
        let dir = MemoryAccountDirectory::new();
        let scope = Uuid::new_v4();
        let agent = AgentId::generate();
        dir.insert(Account {
            agent_id: agent,
            name: "Scoped Resident".to_string(),
            user_level: 0,
            created_at: 0,
            payment_flags: PaymentFlags::empty(),
            scope_id: Some(scope),
        });

        assert!(dir.lookup(Some(scope), agent).is_some());
        assert!(dir.lookup(Some(Uuid::new_v4()), agent).is_none());
        assert!(dir.lookup(None, agent).is_some());
    }

    #[test]
    fn test_parcel_rect_lookup() {
        let dir = MemoryParcelDirectory::new(256, 256);
        let parcel = dir.add(Parcel::new("west"), ParcelRect::new(0.0, 0.0, 128.0, 256.0, 21.0));
        dir.add(Parcel::new("east"), ParcelRect::new(128.0, 0.0, 256.0, 256.0, 21.0));

        let hit = dir.at_point(10.0, 10.0).expect("parcel");
        assert_eq!(hit.id, parcel.id);
        assert_eq!(dir.all_parcels().len(), 2);
    }

    #[test]
    fn test_near_point_orders_by_distance() {
        let dir = MemoryParcelDirectory::new(256, 256);
        dir.add(Parcel::new("west"), ParcelRect::new(0.0, 0.0, 128.0, 256.0, 21.0));
        let east = dir.add(Parcel::new("east"), ParcelRect::new(128.0, 0.0, 256.0, 256.0, 21.0));

        let near = dir.near_point(Vec3::new(250.0, 128.0, 21.0));
        assert_eq!(near[0].id, east.id);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now_unix(), 100);
        clock.advance(5);
        assert_eq!(clock.now_unix(), 105);
    }
}
