//! Headless mode for scripted encounters
//!
//! Runs a party against a set of enemies without any graphical output, suitable
//! for automated testing and batch analysis.
//!
//! ## Usage
//!
//! ```bash
//! # Run a headless encounter
//! cargo run --release -- --headless encounter.json
//! ```
//!
//! ## JSON Configuration
//!
//! ```json
//! {
//!   "party": [
//!     { "name": "Brakka", "class": "Warrior", "spec": "protection", "role": "Tank", "level": 30 },
//!     { "name": "Vela", "class": "Priest", "spec": "holy", "role": "Healer", "level": 30 }
//!   ],
//!   "enemies": [{ "name": "Ogre Mage", "max_health": 900.0, "damage": 12.0, "cast_interval": 5, "cast_damage": 20.0 }],
//!   "strategy": "Active",
//!   "max_ticks": 200,
//!   "random_seed": 42
//! }
//! ```

pub mod config;
pub mod runner;

pub use config::{ConfigError, EnemyConfig, HeadlessConfig, PartyMemberConfig};
pub use runner::{run_headless_match, simulate, HeadlessError, MatchOutcome, MatchResult, MatchRun};
