//! Flag bitmasks carried on teleport requests, parcels, accounts, regions,
//! and per-agent grid records
//!
//! Bit values follow the wire protocol of the simulator the engine serves,
//! so masks received from the transport layer can be used unmodified.

use bitflags::bitflags;

bitflags! {
    /// How a teleport request arrived
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TeleportFlags: u32 {
        const VIA_LURE = 1 << 2;
        const VIA_LANDMARK = 1 << 3;
        const VIA_HOME = 1 << 5;
        const VIA_LOGIN = 1 << 7;
        const GODLIKE = 1 << 9;
        const NINE_ONE_ONE = 1 << 10;
        const VIA_REGION_ID = 1 << 12;
        const FORCE_REDIRECT = 1 << 15;
    }
}

impl TeleportFlags {
    /// Flags that let a teleport bypass landing-point enforcement entirely
    pub fn is_direct(self) -> bool {
        self.intersects(
            Self::VIA_LANDMARK
                | Self::VIA_HOME
                | Self::VIA_LURE
                | Self::FORCE_REDIRECT
                | Self::GODLIKE
                | Self::NINE_ONE_ONE,
        )
    }
}

bitflags! {
    /// Per-parcel access flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
    pub struct ParcelFlags: u32 {
        const USE_ACCESS_GROUP = 1 << 8;
        const USE_ACCESS_LIST = 1 << 9;
        const USE_PASS_LIST = 1 << 11;
        const DENY_ANONYMOUS = 1 << 22;
        const DENY_AGE_UNVERIFIED = 1 << 31;
    }
}

bitflags! {
    /// Payment-verification state recorded on an account profile
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
    pub struct PaymentFlags: u32 {
        const NO_PAYMENT_INFO_ON_FILE = 1 << 1;
        const PAYMENT_INFO_ON_FILE = 1 << 2;
        const PAYMENT_INFO_IN_USE = 1 << 3;
    }
}

bitflags! {
    /// Grid-level region flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
    pub struct RegionFlags: u32 {
        /// Region may be visited at most once per agent
        const PRELUDE = 1 << 10;
    }
}

bitflags! {
    /// Persistent per-agent grid flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
    pub struct AgentFlags: u32 {
        const MINOR = 1 << 0;
        const PAST_PRELUDE = 1 << 1;
    }
}
