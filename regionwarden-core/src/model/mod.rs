//! Data model shared across the engine
//!
//! Plain data carried through admission and placement decisions: identifier
//! newtypes, flag bitmasks, accounts, estate settings with their ban lists,
//! parcels, telehubs, per-agent grid records, and region descriptors.

mod account;
mod agent;
mod estate;
mod flags;
mod ids;
mod parcel;
mod region_info;
mod telehub;

pub use account::Account;
pub use agent::{AgentInfo, AvatarPresence, MaturityRating};
pub use estate::{EstateBan, EstateSettings};
pub use flags::{AgentFlags, ParcelFlags, PaymentFlags, RegionFlags, TeleportFlags};
pub use ids::{AgentId, EstateId, GroupId, ParcelId, RegionId};
pub use parcel::{LandingKind, Parcel};
pub use region_info::RegionInfo;
pub use telehub::Telehub;
