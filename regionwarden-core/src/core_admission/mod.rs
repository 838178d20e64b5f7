//! Region admission policy
//!
//! Ordered authorization checks over an entry request. The first failing
//! check wins and its reason is surfaced verbatim; elevated agents bypass
//! everything past the cooldown, and estate owners/managers/access-list
//! members bypass the policy flags but never an explicit ban.
//!
//! Ban matching self-heals: an exact ban whose stored mask no longer equals
//! the address the user connects from is rewritten with the current
//! address, and a mask hit against a previously unseen user grows the ban
//! list by one entry for that user. Both writes are persisted
//! fire-and-forget; the denial does not wait for them.

use crate::config::EngineConfig;
use crate::core_banlist::{classify, BanMatch};
use crate::core_ratelimit::TeleportRateLimiter;
use crate::decision::{AdmissionDecision, DenyReason};
use crate::directory::{
    AccountDirectory, AgentInfoStore, Clock, EstateStore, GroupDirectory, NameResolver,
    PresenceDirectory,
};
use crate::metrics;
use crate::model::{Account, AgentId, AgentInfo, AvatarPresence, EstateSettings, TeleportFlags};
use crate::region::RegionSession;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// One agent's attempt to enter a region
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    pub agent_id: AgentId,

    /// Address the viewer is connecting from, when known
    pub source_ip: Option<IpAddr>,

    pub teleport_flags: TeleportFlags,

    /// Crossing in as a child agent rather than connecting fresh
    pub is_child_agent: bool,

    /// In-scene presence, when the scene already has one for this agent
    pub presence: Option<AvatarPresence>,
}

/// Authorizes agents into regions
pub struct AdmissionPolicyEngine {
    config: EngineConfig,
    accounts: Arc<dyn AccountDirectory>,
    presence_dir: Arc<dyn PresenceDirectory>,
    estate_store: Arc<dyn EstateStore>,
    agent_infos: Arc<dyn AgentInfoStore>,
    groups: Arc<dyn GroupDirectory>,
    resolver: Arc<dyn NameResolver>,
    clock: Arc<dyn Clock>,
    rate_limiter: TeleportRateLimiter,
    logins_disabled: AtomicBool,
}

impl AdmissionPolicyEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: EngineConfig,
        accounts: Arc<dyn AccountDirectory>,
        presence_dir: Arc<dyn PresenceDirectory>,
        estate_store: Arc<dyn EstateStore>,
        agent_infos: Arc<dyn AgentInfoStore>,
        groups: Arc<dyn GroupDirectory>,
        resolver: Arc<dyn NameResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let rate_limiter = TeleportRateLimiter::new(
            config.block_teleport_cooldown,
            config.teleport_cooldown_secs(),
        );
        let logins_disabled = AtomicBool::new(config.start_with_logins_disabled);
        AdmissionPolicyEngine {
            config,
            accounts,
            presence_dir,
            estate_store,
            agent_infos,
            groups,
            resolver,
            clock,
            rate_limiter,
            logins_disabled,
        }
    }

    /// Allow simulator logins
    pub fn enable_logins(&self) {
        if self.logins_disabled.swap(false, Ordering::SeqCst) {
            warn!("enabling logins");
        }
    }

    /// Refuse all non-privileged entry
    pub fn disable_logins(&self) {
        if !self.logins_disabled.swap(true, Ordering::SeqCst) {
            warn!("disabling logins");
        }
    }

    pub fn logins_enabled(&self) -> bool {
        !self.logins_disabled.load(Ordering::SeqCst)
    }

    /// Decide whether the agent may enter the region
    pub async fn decide(
        &self,
        session: &RegionSession,
        request: &AdmissionRequest,
    ) -> AdmissionDecision {
        let decision = self.run_checks(session, request).await;
        match &decision {
            AdmissionDecision::Allow => {
                metrics::admission("allowed");
                debug!(agent_id = %request.agent_id, region = %session.info.name, "admission allowed");
            }
            AdmissionDecision::Deny(reason) => {
                metrics::admission("denied");
                metrics::admission_denial(reason.label());
                info!(
                    agent_id = %request.agent_id,
                    region = %session.info.name,
                    reason = %reason,
                    "admission denied"
                );
            }
        }
        decision
    }

    async fn run_checks(
        &self,
        session: &RegionSession,
        request: &AdmissionRequest,
    ) -> AdmissionDecision {
        use AdmissionDecision::{Allow, Deny};

        let now = self.clock.now_unix();

        let Some(account) = self
            .accounts
            .lookup(session.info.scope_id, request.agent_id)
        else {
            return Deny(DenyReason::NoAccount);
        };

        if !self.logins_enabled() {
            return Deny(DenyReason::LoginsDisabled);
        }

        if !self
            .rate_limiter
            .check_and_update(&session.state, request.is_child_agent, now)
            .await
        {
            return Deny(DenyReason::TeleportCooldown);
        }

        if is_privileged(&account, request.presence.as_ref()) {
            return Allow;
        }

        let ip_string = request.source_ip.map(|ip| ip.to_string());
        if self.matches_ban_criteria(&account, ip_string.as_deref()) {
            return Deny(DenyReason::BanCriteria);
        }

        if !request.teleport_flags.contains(TeleportFlags::VIA_LOGIN) {
            if let Some(denial) = self.check_presence(session, &account, request.agent_id).await {
                return Deny(denial);
            }
        }

        if session.info.agent_limit > 0 {
            let residents = session.state.lock().await.resident_count;
            if residents + 1 > session.info.agent_limit {
                return Deny(DenyReason::RegionFull);
            }
        }

        if let Some(denial) = self.check_ban_list(session, request, ip_string.as_deref()).await {
            return Deny(denial);
        }

        {
            let estate = session.estate.read().await;
            if estate.is_owner(request.agent_id)
                || estate.is_manager(request.agent_id)
                || estate.has_access(request.agent_id)
            {
                return Allow;
            }
            if !estate.group_ids.is_empty() {
                let memberships = self.groups.memberships_of(request.agent_id);
                if memberships.iter().any(|g| estate.group_ids.contains(g)) {
                    return Allow;
                }
            }

            if estate.deny_anonymous && account.lacks_payment_info() {
                return Deny(DenyReason::EntryDenied);
            }
            if estate.deny_identified && account.has_payment_info() {
                return Deny(DenyReason::EntryDenied);
            }
            if estate.deny_transacted && account.has_used_payment_info() {
                return Deny(DenyReason::EntryDenied);
            }
        }

        if session.info.minimum_age_days != 0
            && account.age_days(now) < session.info.minimum_age_days
        {
            return Deny(DenyReason::EntryDenied);
        }

        {
            let estate = session.estate.read().await;
            if !estate.public_access {
                return Deny(DenyReason::PublicAccessOff);
            }

            if self.config.check_maturity_level {
                let info = self
                    .agent_infos
                    .get(request.agent_id)
                    .unwrap_or_else(|| AgentInfo::new(request.agent_id));
                if session.info.access_level > info.maturity.access_level() {
                    return Deny(DenyReason::MaturityTooHigh);
                }
                if estate.deny_minors && info.is_minor() {
                    return Deny(DenyReason::MaturityTooHigh);
                }
            }
        }

        Allow
    }

    fn matches_ban_criteria(&self, account: &Account, ip: Option<&str>) -> bool {
        for criterion in &self.config.ban_criteria {
            if account.name.contains(criterion) {
                return true;
            }
            if let Some(ip) = ip {
                if ip.contains(criterion) {
                    return true;
                }
            }
        }
        false
    }

    async fn check_presence(
        &self,
        session: &RegionSession,
        account: &Account,
        agent_id: AgentId,
    ) -> Option<DenyReason> {
        let status = timeout(self.config.presence_timeout, self.presence_dir.status(agent_id)).await;
        match status {
            Ok(Ok(status)) if status.is_online => None,
            Ok(Ok(_)) => Some(DenyReason::NotOnline {
                account: account.name.clone(),
                region: session.info.name.clone(),
            }),
            Ok(Err(err)) => {
                warn!(agent_id = %agent_id, error = %err, "presence directory unavailable");
                Some(DenyReason::PresenceServiceUnavailable {
                    account: account.name.clone(),
                    region: session.info.name.clone(),
                })
            }
            Err(_) => {
                warn!(agent_id = %agent_id, "presence directory query timed out");
                Some(DenyReason::PresenceServiceUnavailable {
                    account: account.name.clone(),
                    region: session.info.name.clone(),
                })
            }
        }
    }

    /// Scan the estate ban list, self-healing stale masks and propagating
    /// mask hits onto previously unseen users.
    async fn check_ban_list(
        &self,
        session: &RegionSession,
        request: &AdmissionRequest,
        ip_string: Option<&str>,
    ) -> Option<DenyReason> {
        let hostname = match request.source_ip {
            Some(ip) => {
                let empty = session.estate.read().await.bans.is_empty();
                if empty {
                    None
                } else {
                    self.resolve_hostname(ip).await
                }
            }
            None => None,
        };

        let estate = session.estate.read().await;
        let verdict = classify(&estate.bans, request.agent_id, ip_string, hostname.as_deref());
        drop(estate);

        match verdict {
            BanMatch::ExactUser(_) => {
                if let Some(ip) = ip_string {
                    let mut estate = session.estate.write().await;
                    if estate.heal_ban(request.agent_id, ip) {
                        metrics::ban_list_rewrite("heal");
                        info!(agent_id = %request.agent_id, address = ip, "ban mask rewritten");
                        self.persist_estate(estate.clone());
                    }
                }
                Some(DenyReason::Banned)
            }
            BanMatch::Mask(_) => {
                if let Some(ip) = ip_string {
                    let mut estate = session.estate.write().await;
                    if estate.propagate_ban(request.agent_id, ip) {
                        metrics::ban_list_rewrite("propagate");
                        info!(agent_id = %request.agent_id, address = ip, "ban propagated to new user");
                        self.persist_estate(estate.clone());
                    }
                }
                Some(DenyReason::Banned)
            }
            BanMatch::None => None,
        }
    }

    /// Reverse-DNS under its budget; failure or timeout means "no hostname"
    async fn resolve_hostname(&self, ip: IpAddr) -> Option<String> {
        match timeout(self.config.dns_timeout, self.resolver.reverse_lookup(ip)).await {
            Ok(hostname) => hostname,
            Err(_) => {
                warn!(%ip, "reverse DNS timed out");
                None
            }
        }
    }

    /// Persist estate settings without blocking the decision
    fn persist_estate(&self, settings: EstateSettings) {
        let store = self.estate_store.clone();
        let estate_id = settings.estate_id;
        tokio::spawn(async move {
            if let Err(err) = store.save(settings).await {
                warn!(%estate_id, error = %err, "failed to persist estate settings");
            }
        });
    }
}

fn is_privileged(account: &Account, presence: Option<&AvatarPresence>) -> bool {
    presence.map_or(false, |p| p.god_level != 0) || account.user_level != 0
}
