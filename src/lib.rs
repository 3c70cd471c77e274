//! partysim - Party Combat Decision Engine
//!
//! The per-tick combat core of a party-based RPG simulator: ability eligibility,
//! cooldowns, resources, DoT/beacon/buff ledgers and a utility scoring AI, plus a
//! headless Bevy host that plays scripted encounters.
//!
//! This library exposes the engine modules for testing and reuse.

pub mod cli;
pub mod combat;
pub mod headless;

// Re-export commonly used types
pub use combat::ai::{AbilityAi, CombatContext};
pub use combat::catalog::AbilityCatalog;
pub use combat::log::{CombatLog, CombatLogEventType};
pub use headless::HeadlessConfig;
