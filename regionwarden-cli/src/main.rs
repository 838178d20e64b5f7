use anyhow::Result;
use clap::Parser;
use glam::Vec3;
use regionwarden_core::directory::memory::{
    FlatTerrain, ManualClock, MemoryAccountDirectory, MemoryAgentInfoStore, MemoryEstateStore,
    MemoryGroupDirectory, MemoryParcelDirectory, MemoryPresenceDirectory, NoopResolver,
    ParcelRect,
};
use regionwarden_core::directory::EstateStore;
use regionwarden_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use regionwarden_core::model::{
    Account, AgentId, EstateId, EstateSettings, Parcel, PaymentFlags, RegionId, RegionInfo,
    Telehub, TeleportFlags,
};
use regionwarden_core::{
    AdmissionPolicyEngine, AdmissionRequest, PlacementRequest, RegionSession, RegionStates,
    TelehubRegistry, TeleportPlacementEngine,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "regionwarden")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run a sample admission + placement against an in-memory region
    Demo {
        /// Route arrivals through a telehub instead of direct teleports
        #[arg(long)]
        telehub: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = LogLevel::from_str(&args.log_level).unwrap_or_else(|| {
        eprintln!("Invalid log level '{}', using 'info'", args.log_level);
        LogLevel::Info
    });

    let config = LogConfig::new(log_level).json_format(args.json_logs);
    init_logging_with_config(config)?;

    regionwarden_core::metrics::init_metrics();

    match args.command {
        Some(Command::Demo { telehub }) => run_demo(telehub).await?,
        None => {
            info!("No command specified. Use --help for usage information.");
        }
    }

    Ok(())
}

/// Stand up one region with in-memory directories and walk an agent through
/// admission and placement.
async fn run_demo(use_telehub: bool) -> Result<()> {
    let region_id = RegionId::generate();
    let region = RegionInfo::new(region_id, "Demo Region");
    let owner = AgentId::generate();

    let accounts = Arc::new(MemoryAccountDirectory::new());
    let presence_dir = Arc::new(MemoryPresenceDirectory::new());
    let estate_store = Arc::new(MemoryEstateStore::new());
    let agent_infos = Arc::new(MemoryAgentInfoStore::new());
    let groups = Arc::new(MemoryGroupDirectory::new());
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let states = Arc::new(RegionStates::new());
    let telehubs = Arc::new(TelehubRegistry::new(states.clone()));

    let parcels = Arc::new(MemoryParcelDirectory::new(region.size_x, region.size_y));
    parcels.add(
        Parcel::new("mainland"),
        ParcelRect::new(0.0, 0.0, 256.0, 256.0, 20.0),
    );

    let mut estate = EstateSettings::new(EstateId(1), owner);
    estate.allow_direct_teleport = !use_telehub;
    estate_store.insert(region_id, estate);

    if use_telehub {
        let mut hub = Telehub::new(region_id, Vec3::new(128.0, 128.0, 25.0), Uuid::new_v4(), "arrivals");
        hub.spawn_offsets = vec![Vec3::new(8.0, 0.0, 0.0), Vec3::new(-8.0, 0.0, 0.0)];
        telehubs.set(hub).await;
    }

    let visitor = AgentId::generate();
    accounts.insert(Account {
        agent_id: visitor,
        name: "Demo Resident".to_string(),
        user_level: 0,
        created_at: 1_690_000_000,
        payment_flags: PaymentFlags::PAYMENT_INFO_ON_FILE,
        scope_id: None,
    });
    presence_dir.set_online(visitor, true);

    let engine_config = regionwarden_core::EngineConfig::from_env()?;
    let admission = AdmissionPolicyEngine::new(
        engine_config.clone(),
        accounts.clone(),
        presence_dir,
        estate_store.clone(),
        agent_infos.clone(),
        groups.clone(),
        Arc::new(NoopResolver),
        clock.clone(),
    );
    let placement = TeleportPlacementEngine::new(
        engine_config,
        accounts,
        agent_infos,
        parcels,
        Arc::new(FlatTerrain::new(20.0)),
        groups,
        telehubs,
    );

    let store: Arc<dyn EstateStore> = estate_store;
    let session = RegionSession::activate(region, &store, &states).await?;

    let decision = admission
        .decide(
            &session,
            &AdmissionRequest {
                agent_id: visitor,
                source_ip: Some("203.0.113.9".parse()?),
                teleport_flags: TeleportFlags::VIA_LOGIN,
                is_child_agent: false,
                presence: None,
            },
        )
        .await;
    info!(?decision, "admission decided");

    if decision.is_allowed() {
        for attempt in 0..2 {
            let landing = placement
                .place(
                    &session,
                    &PlacementRequest {
                        agent_id: visitor,
                        position: Vec3::new(40.0, 40.0, 0.0),
                        teleport_flags: TeleportFlags::VIA_LOGIN,
                        is_child_agent: false,
                        presence: None,
                    },
                )
                .await;
            info!(attempt, ?landing, "placement computed");
        }
    }

    Ok(())
}
