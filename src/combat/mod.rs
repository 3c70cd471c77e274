//! Combat decision engine
//!
//! Implements the per-tick combat core of a party simulator:
//! - Ability catalog and per-unit eligibility
//! - Cooldowns and resource pools
//! - Status ledgers: damage-over-time, heal-redirect beacons, party buffs
//! - Utility scoring AI that picks one ability per unit per tick
//! - A reference tick driver and combat logging

use bevy::prelude::*;

pub mod ai;
pub mod catalog;
pub mod constants;
pub mod cooldowns;
pub mod eligibility;
pub mod encounter;
pub mod events;
pub mod log;
pub mod resolver;
pub mod resources;
pub mod rng;
pub mod status;
pub mod systems;
pub mod units;

use catalog::AbilityCatalog;
use cooldowns::CooldownTracker;
use encounter::{CombatStats, EnemyRoster, TickClock};
use events::{AbilityChosenEvent, EngineEvent};
use resources::ResourceLedger;
use rng::GameRng;
use status::{BeaconLedger, DotLedger, PartyBuffLedger};
use systems::PendingActions;
use units::PartyRoster;

/// Plugin for the combat engine: events, empty ledgers and tick phase ordering.
///
/// The host still inserts the catalog (see [`install_catalog`]), the rosters and
/// the tick systems with its own run condition.
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app
            // Engine events
            .add_event::<EngineEvent>()
            .add_event::<AbilityChosenEvent>()
            // Ledgers
            .init_resource::<CooldownTracker>()
            .init_resource::<ResourceLedger>()
            .init_resource::<DotLedger>()
            .init_resource::<BeaconLedger>()
            .init_resource::<PartyBuffLedger>()
            // Encounter state
            .init_resource::<PartyRoster>()
            .init_resource::<EnemyRoster>()
            .init_resource::<CombatStats>()
            .init_resource::<TickClock>()
            .init_resource::<PendingActions>()
            .init_resource::<GameRng>()
            .init_resource::<log::CombatLog>();

        systems::configure_tick_phases(app);
    }
}

/// Insert the catalog together with the ledgers whose definitions come from it.
pub fn install_catalog(world: &mut World, catalog: AbilityCatalog) {
    info!(
        "Installing ability catalog ({} abilities, {} DoTs)",
        catalog.len(),
        catalog.dot_definitions().count()
    );
    world.insert_resource(DotLedger::from_catalog(&catalog));
    world.insert_resource(PartyBuffLedger::from_catalog(&catalog));
    world.insert_resource(catalog);
}
