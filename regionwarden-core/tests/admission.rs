//! Admission policy integration tests
//!
//! Each test stands up the full engine against the in-memory directories
//! and drives `decide` end to end.

use regionwarden_core::decision::{AdmissionDecision, DenyReason};
use regionwarden_core::model::{
    Account, AgentFlags, AgentId, AgentInfo, EstateBan, MaturityRating, PaymentFlags,
    TeleportFlags,
};
use regionwarden_core::test_utils::{test_ip, TestWorld, T0};
use std::time::Duration;

/// Let fire-and-forget persistence tasks drain
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn happy_path_allows() {
    let world = TestWorld::new();
    let visitor = world.add_resident("Visiting Resident");
    let engine = world.admission_engine();
    let session = world.session().await;

    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Allow);
}

#[tokio::test]
async fn unknown_agent_is_denied() {
    let world = TestWorld::new();
    let engine = world.admission_engine();
    let session = world.session().await;

    let decision = engine
        .decide(&session, &world.admission_request(AgentId::generate()))
        .await;
    assert_eq!(decision, AdmissionDecision::Deny(DenyReason::NoAccount));
}

#[tokio::test]
async fn logins_toggle_gates_entry() {
    let mut world = TestWorld::new();
    world.config.start_with_logins_disabled = true;
    let visitor = world.add_resident("Visiting Resident");
    let engine = world.admission_engine();
    let session = world.session().await;

    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Deny(DenyReason::LoginsDisabled));

    engine.enable_logins();
    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Allow);
}

#[tokio::test]
async fn teleport_cooldown_shares_one_window_per_region() {
    let mut world = TestWorld::new();
    world.config.block_teleport_cooldown = true;
    let first = world.add_resident("First Resident");
    let second = world.add_resident("Second Resident");
    let engine = world.admission_engine();
    let session = world.session().await;

    assert_eq!(
        engine.decide(&session, &world.admission_request(first)).await,
        AdmissionDecision::Allow
    );
    // A different agent one second later hits the same region window
    world.clock.advance(1);
    assert_eq!(
        engine.decide(&session, &world.admission_request(second)).await,
        AdmissionDecision::Deny(DenyReason::TeleportCooldown)
    );
    // Third attempt after the 3-second window passes
    world.clock.advance(2);
    assert_eq!(
        engine.decide(&session, &world.admission_request(second)).await,
        AdmissionDecision::Allow
    );
}

#[tokio::test]
async fn elevated_account_bypasses_policy() {
    let world = TestWorld::new();
    world.with_estate(|es| es.public_access = false);
    let admin = AgentId::generate();
    world.accounts.insert(Account {
        agent_id: admin,
        name: "Grid Admin".to_string(),
        user_level: 200,
        created_at: T0,
        payment_flags: PaymentFlags::empty(),
        scope_id: None,
    });
    let engine = world.admission_engine();
    let session = world.session().await;

    let decision = engine.decide(&session, &world.admission_request(admin)).await;
    assert_eq!(decision, AdmissionDecision::Allow);
}

#[tokio::test]
async fn ban_criteria_match_display_name() {
    let mut world = TestWorld::new();
    world.config.ban_criteria = vec!["Griefer".to_string()];
    let visitor = world.add_resident("Griefer Resident");
    let engine = world.admission_engine();
    let session = world.session().await;

    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Deny(DenyReason::BanCriteria));
}

#[tokio::test]
async fn offline_agent_is_denied_unless_arriving_via_login() {
    let world = TestWorld::new();
    let visitor = world.add_resident("Visiting Resident");
    world.presence_dir.set_online(visitor, false);
    let engine = world.admission_engine();
    let session = world.session().await;

    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(
        decision,
        AdmissionDecision::Deny(DenyReason::NotOnline {
            account: "Visiting Resident".to_string(),
            region: "Sandbox".to_string(),
        })
    );

    let mut request = world.admission_request(visitor);
    request.teleport_flags = TeleportFlags::VIA_LOGIN;
    assert_eq!(engine.decide(&session, &request).await, AdmissionDecision::Allow);
}

#[tokio::test]
async fn presence_outage_denies_with_service_reason() {
    let world = TestWorld::new();
    let visitor = world.add_resident("Visiting Resident");
    world.presence_dir.set_available(false);
    let engine = world.admission_engine();
    let session = world.session().await;

    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(
        decision,
        AdmissionDecision::Deny(DenyReason::PresenceServiceUnavailable {
            account: "Visiting Resident".to_string(),
            region: "Sandbox".to_string(),
        })
    );
}

#[tokio::test]
async fn full_region_turns_agents_away() {
    let mut world = TestWorld::new();
    world.region.agent_limit = 2;
    let visitor = world.add_resident("Visiting Resident");
    let engine = world.admission_engine();
    let session = world.session().await;
    session.state.lock().await.resident_count = 2;

    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Deny(DenyReason::RegionFull));
}

#[tokio::test]
async fn exact_ban_overrides_owner_privileges() {
    let world = TestWorld::new();
    let owner = world.owner;
    world.with_estate(|es| {
        let estate_id = es.estate_id;
        es.add_ban(EstateBan::for_user(owner, "1.2.3.4", estate_id));
    });
    let engine = world.admission_engine();
    let session = world.session().await;

    let decision = engine.decide(&session, &world.admission_request(owner)).await;
    assert_eq!(decision, AdmissionDecision::Deny(DenyReason::Banned));
}

#[tokio::test]
async fn stale_ban_mask_is_rewritten_once() {
    let world = TestWorld::new();
    let visitor = world.add_resident("Banned Resident");
    world.with_estate(|es| {
        let estate_id = es.estate_id;
        es.add_ban(EstateBan::for_user(visitor, "1.2.3.4", estate_id));
    });
    let engine = world.admission_engine();
    let session = world.session().await;

    // Denied on user id even though the stored mask names another address
    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Deny(DenyReason::Banned));
    settle().await;

    let stored = world.estate_store.stored(world.region.region_id).unwrap();
    assert_eq!(stored.bans.len(), 1);
    assert_eq!(stored.bans[0].banned_host_ip_mask, test_ip().to_string());
    assert_eq!(world.estate_store.save_count(), 1);

    // Unchanged address on the next attempt: no further writes
    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Deny(DenyReason::Banned));
    settle().await;
    assert_eq!(world.estate_store.save_count(), 1);
}

#[tokio::test]
async fn mask_ban_propagates_to_new_account_once() {
    let world = TestWorld::new();
    let visitor = world.add_resident("Alt Resident");
    world.with_estate(|es| {
        let estate_id = es.estate_id;
        // Ban some other account by network mask covering the test address
        es.add_ban(EstateBan::for_user(AgentId::generate(), "203.0.113.", estate_id));
    });
    let engine = world.admission_engine();
    let session = world.session().await;

    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Deny(DenyReason::Banned));
    settle().await;

    let stored = world.estate_store.stored(world.region.region_id).unwrap();
    assert_eq!(stored.bans.len(), 2);
    assert!(stored.bans.iter().any(|b| b.banned_user_id == visitor));
    assert_eq!(world.estate_store.save_count(), 1);

    // A propagated entry already exists for this user; no duplicate on retry
    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Deny(DenyReason::Banned));
    settle().await;
    let stored = world.estate_store.stored(world.region.region_id).unwrap();
    assert_eq!(stored.bans.len(), 2);
    assert_eq!(world.estate_store.save_count(), 1);
}

#[tokio::test]
async fn reverse_dns_hostname_matches_ban_mask() {
    let mut world = TestWorld::new();
    world.resolver = std::sync::Arc::new(
        regionwarden_core::directory::memory::StaticResolver::new()
            .with_entry(test_ip(), "client-7.badisp.example"),
    );
    let visitor = world.add_resident("Alt Resident");
    world.with_estate(|es| {
        let estate_id = es.estate_id;
        let mut ban = EstateBan::for_user(AgentId::generate(), "badisp.example", estate_id);
        ban.banned_host_address = String::new();
        ban.banned_host_name_mask = String::new();
        es.add_ban(ban);
    });
    let engine = world.admission_engine();
    let session = world.session().await;

    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Deny(DenyReason::Banned));
    settle().await;

    // The network-identity hit propagated a ban for the connecting user
    let stored = world.estate_store.stored(world.region.region_id).unwrap();
    assert!(stored.bans.iter().any(|b| b.banned_user_id == visitor));
}

#[tokio::test]
async fn access_list_bypasses_closed_estate() {
    let world = TestWorld::new();
    let visitor = world.add_resident("Invited Resident");
    world.with_estate(|es| {
        es.public_access = false;
        es.add_access(visitor);
    });
    let engine = world.admission_engine();
    let session = world.session().await;

    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Allow);
}

#[tokio::test]
async fn estate_group_membership_bypasses_closed_estate() {
    let world = TestWorld::new();
    let visitor = world.add_resident("Member Resident");
    let group = regionwarden_core::model::GroupId::generate();
    world.groups.add_membership(visitor, group);
    world.with_estate(|es| {
        es.public_access = false;
        es.add_group(group);
    });
    let engine = world.admission_engine();
    let session = world.session().await;

    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Allow);
}

#[tokio::test]
async fn anonymous_accounts_denied_when_estate_requires_payment_info() {
    let world = TestWorld::new();
    world.with_estate(|es| es.deny_anonymous = true);
    let visitor = AgentId::generate();
    world.accounts.insert(Account {
        agent_id: visitor,
        name: "Anonymous Resident".to_string(),
        user_level: 0,
        created_at: T0,
        payment_flags: PaymentFlags::NO_PAYMENT_INFO_ON_FILE,
        scope_id: None,
    });
    world.presence_dir.set_online(visitor, true);
    let engine = world.admission_engine();
    let session = world.session().await;

    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Deny(DenyReason::EntryDenied));
}

#[tokio::test]
async fn young_accounts_denied_by_minimum_age() {
    let mut world = TestWorld::new();
    world.region.minimum_age_days = 365;
    let visitor = world.add_resident("Recent Resident");
    let engine = world.admission_engine();
    let session = world.session().await;

    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Deny(DenyReason::EntryDenied));
}

#[tokio::test]
async fn closed_estate_denies_public_entry() {
    let world = TestWorld::new();
    world.with_estate(|es| es.public_access = false);
    let visitor = world.add_resident("Visiting Resident");
    let engine = world.admission_engine();
    let session = world.session().await;

    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Deny(DenyReason::PublicAccessOff));
}

#[tokio::test]
async fn maturity_rating_must_cover_region_access_level() {
    let mut world = TestWorld::new();
    world.region.access_level = MaturityRating::Adult.access_level();
    let visitor = world.add_resident("Visiting Resident");
    let engine = world.admission_engine();
    let session = world.session().await;

    // Default record rates Mature; Adult region denies
    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Deny(DenyReason::MaturityTooHigh));

    let mut info = AgentInfo::new(visitor);
    info.maturity = MaturityRating::Adult;
    world.agent_infos.insert(info);
    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Allow);
}

#[tokio::test]
async fn maturity_grid_admits_exactly_when_rating_covers_level() {
    for rating in [MaturityRating::Pg, MaturityRating::Mature, MaturityRating::Adult] {
        for level in [
            MaturityRating::Pg.access_level(),
            MaturityRating::Mature.access_level(),
            MaturityRating::Adult.access_level(),
        ] {
            let mut world = TestWorld::new();
            world.region.access_level = level;
            let visitor = world.add_resident("Visiting Resident");
            let mut info = AgentInfo::new(visitor);
            info.maturity = rating;
            world.agent_infos.insert(info);

            let engine = world.admission_engine();
            let session = world.session().await;
            let decision = engine.decide(&session, &world.admission_request(visitor)).await;

            let expected = if rating.access_level() >= level {
                AdmissionDecision::Allow
            } else {
                AdmissionDecision::Deny(DenyReason::MaturityTooHigh)
            };
            assert_eq!(decision, expected, "rating {rating:?} vs level {level}");
        }
    }
}

#[tokio::test]
async fn maturity_check_can_be_disabled() {
    let mut world = TestWorld::new();
    world.region.access_level = MaturityRating::Adult.access_level();
    world.config.check_maturity_level = false;
    let visitor = world.add_resident("Visiting Resident");
    let engine = world.admission_engine();
    let session = world.session().await;

    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Allow);
}

#[tokio::test]
async fn minors_denied_where_estate_denies_minors() {
    let world = TestWorld::new();
    world.with_estate(|es| es.deny_minors = true);
    let visitor = world.add_resident("Young Resident");
    let mut info = AgentInfo::new(visitor);
    info.flags |= AgentFlags::MINOR;
    world.agent_infos.insert(info);
    let engine = world.admission_engine();
    let session = world.session().await;

    let decision = engine.decide(&session, &world.admission_request(visitor)).await;
    assert_eq!(decision, AdmissionDecision::Deny(DenyReason::MaturityTooHigh));
}
