//! Status effect ledgers: damage-over-time, beacon redirection, party buffs.

pub mod beacons;
pub mod buffs;
pub mod dots;

pub use beacons::{Beacon, BeaconLedger, BeaconSnapshot, HealRedirect};
pub use buffs::{BuffSnapshot, PartyBuff, PartyBuffLedger};
pub use dots::{DotInstance, DotLedger, DotSchedule, DotSnapshot};
