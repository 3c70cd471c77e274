//! Headless encounter execution
//!
//! Builds a Bevy app without rendering, drives it one tick per `app.update()`
//! and collects a [`MatchResult`] when the encounter ends.

use bevy::log::LogPlugin;
use bevy::prelude::*;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::combat::catalog::{AbilityCatalog, CatalogError, ResourceKind};
use crate::combat::constants::{
    ENERGY_POOL, ENERGY_REGEN_PER_SECOND, MANA_PER_LEVEL, MANA_POOL_BASE, MANA_REGEN_PER_SECOND, RAGE_POOL,
};
use crate::combat::encounter::{CombatStats, Enemy, EnemyRoster, TickClock};
use crate::combat::log::{CombatLog, CombatLogEventType, LogSaveError};
use crate::combat::resources::{ResourceLedger, ResourcePool};
use crate::combat::rng::GameRng;
use crate::combat::systems::{self, TickPhase};
use crate::combat::units::{PartyRoster, Unit, UnitClass, UnitId};
use crate::combat::{install_catalog, CombatPlugin};

use super::config::{ConfigError, HeadlessConfig};

/// First id handed to enemies; party members count up from 1.
pub const ENEMY_ID_BASE: u32 = 100;

/// How the encounter ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchOutcome {
    /// Every enemy died
    Victory,
    /// Every party member died
    Defeat,
    /// The tick budget ran out
    Timeout,
}

/// Result of a completed headless encounter
///
/// This struct provides programmatic access to results for testing and analysis.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub outcome: MatchOutcome,
    /// Ticks simulated
    pub ticks: u32,
    /// Simulated seconds
    pub match_time: f32,
    pub party: Vec<CombatantResult>,
    pub enemies: Vec<CombatantResult>,
    /// Random seed used (if deterministic mode)
    pub random_seed: Option<u64>,
}

/// Statistics for a single participant after the encounter
#[derive(Debug, Clone, Serialize)]
pub struct CombatantResult {
    pub name: String,
    /// Class name for party members
    pub class_name: Option<String>,
    pub max_health: f32,
    /// Health remaining at the end (0 if dead)
    pub final_health: f32,
    pub survived: bool,
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub healing_done: f32,
    pub casts: u32,
}

/// A finished run: the result plus everything that was logged.
#[derive(Debug)]
pub struct MatchRun {
    pub result: MatchResult,
    pub log: CombatLog,
}

/// Failure while setting up or finishing a headless run.
#[derive(Debug, Error)]
pub enum HeadlessError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Log(#[from] LogSaveError),
    #[error("encounter did not finish within {0} updates")]
    Unfinished(u32),
}

/// Resource to track headless encounter state
#[derive(Resource)]
pub struct HeadlessMatchState {
    /// Tick budget before declaring a timeout
    pub max_ticks: u32,
    /// Whether the encounter has completed
    pub match_complete: bool,
    /// Random seed for deterministic simulation (if provided)
    pub random_seed: Option<u64>,
    /// Populated when the encounter completes
    pub result: Option<MatchResult>,
}

/// Plugin for headless encounter execution
pub struct HeadlessPlugin {
    pub config: HeadlessConfig,
}

impl Plugin for HeadlessPlugin {
    fn build(&self, app: &mut App) {
        let config = &self.config;

        let game_rng = match config.random_seed {
            Some(seed) => {
                info!("Using deterministic RNG with seed: {}", seed);
                GameRng::from_seed(seed)
            }
            None => {
                info!("Using non-deterministic RNG (no seed provided)");
                GameRng::from_entropy()
            }
        };

        let party = build_party(config);
        let mut resources = ResourceLedger::new(config.strategy);
        for unit in &party {
            let (kind, pool) = resource_pool_for(unit.class, unit.level);
            resources.register(unit.id, kind, pool);
        }

        app.insert_resource(PartyRoster::new(party))
            .insert_resource(EnemyRoster::new(build_enemies(config)))
            .insert_resource(resources)
            .insert_resource(game_rng)
            .insert_resource(HeadlessMatchState {
                max_ticks: config.max_ticks,
                match_complete: false,
                random_seed: config.random_seed,
                result: None,
            });

        systems::add_tick_systems(app, encounter_running);

        app.add_systems(Startup, (headless_setup_encounter, systems::apply_class_auras).chain())
            .add_systems(Update, headless_check_encounter_end.after(TickPhase::Dispatch));
    }
}

fn build_party(config: &HeadlessConfig) -> Vec<Unit> {
    config
        .party
        .iter()
        .zip(1u32..)
        .map(|(member, id)| {
            let mut unit = Unit::new(UnitId(id), member.name.clone(), member.class, member.spec.clone(), member.role)
                .with_level(member.level)
                .with_health(member.max_health, member.max_health);
            unit.attributes = member.attributes.clone();
            unit
        })
        .collect()
}

fn build_enemies(config: &HeadlessConfig) -> Vec<Enemy> {
    config
        .enemies
        .iter()
        .zip(ENEMY_ID_BASE..)
        .map(|(enemy, id)| {
            let built = Enemy::new(UnitId(id), enemy.name.clone(), enemy.max_health, enemy.damage);
            match enemy.cast_interval {
                Some(interval) => built.with_cast(interval, enemy.cast_damage),
                None => built,
            }
        })
        .collect()
}

/// Primary resource for a class: warriors build rage, rogues use energy, everyone else mana.
pub fn resource_pool_for(class: UnitClass, level: u32) -> (ResourceKind, ResourcePool) {
    match class {
        UnitClass::Warrior => (ResourceKind::Rage, ResourcePool::new(0.0, RAGE_POOL, 0.0)),
        UnitClass::Rogue => (ResourceKind::Energy, ResourcePool::full(ENERGY_POOL, ENERGY_REGEN_PER_SECOND)),
        _ => {
            let max = MANA_POOL_BASE + level.saturating_sub(1) as f32 * MANA_PER_LEVEL;
            (ResourceKind::Mana, ResourcePool::full(max, MANA_REGEN_PER_SECOND))
        }
    }
}

fn encounter_running(state: Res<HeadlessMatchState>) -> bool {
    !state.match_complete
}

/// Setup system for a headless encounter
fn headless_setup_encounter(
    party: Res<PartyRoster>,
    enemies: Res<EnemyRoster>,
    mut combat_log: ResMut<CombatLog>,
) {
    combat_log.clear();
    for unit in party.members() {
        combat_log.register_unit(unit.id, unit.name.clone());
    }
    for enemy in enemies.enemies() {
        combat_log.register_unit(enemy.id, enemy.name.clone());
    }
    combat_log.log(
        CombatLogEventType::MatchEvent,
        "Encounter started (headless mode)!".to_string(),
    );

    info!(
        "Headless encounter setup complete: party ({} members) vs {} enemies",
        party.members().len(),
        enemies.enemies().len()
    );
}

/// Check if the encounter has ended (party wiped, enemies cleared, or timeout)
fn headless_check_encounter_end(
    party: Res<PartyRoster>,
    enemies: Res<EnemyRoster>,
    clock: Res<TickClock>,
    stats: Res<CombatStats>,
    mut combat_log: ResMut<CombatLog>,
    mut state: ResMut<HeadlessMatchState>,
) {
    if state.match_complete {
        return;
    }

    let outcome = if !party.any_alive() {
        MatchOutcome::Defeat
    } else if !enemies.any_alive() {
        MatchOutcome::Victory
    } else if clock.tick >= state.max_ticks {
        MatchOutcome::Timeout
    } else {
        return;
    };

    info!("Encounter ended after {} ticks: {:?}", clock.tick, outcome);
    combat_log.log(
        CombatLogEventType::MatchEvent,
        format!("Encounter ended: {:?}", outcome),
    );

    state.result = Some(build_match_result(outcome, &party, &enemies, &clock, &stats, state.random_seed));
    state.match_complete = true;
}

/// Build the MatchResult from the current encounter state
fn build_match_result(
    outcome: MatchOutcome,
    party: &PartyRoster,
    enemies: &EnemyRoster,
    clock: &TickClock,
    stats: &CombatStats,
    random_seed: Option<u64>,
) -> MatchResult {
    let party = party
        .members()
        .iter()
        .map(|unit| {
            let totals = stats.get(unit.id);
            CombatantResult {
                name: unit.name.clone(),
                class_name: Some(unit.class.name().to_string()),
                max_health: unit.max_health,
                final_health: unit.health,
                survived: unit.is_alive(),
                damage_dealt: totals.damage_dealt,
                damage_taken: totals.damage_taken,
                healing_done: totals.healing_done,
                casts: totals.casts,
            }
        })
        .collect();

    let enemies = enemies
        .enemies()
        .iter()
        .map(|enemy| {
            let totals = stats.get(enemy.id);
            CombatantResult {
                name: enemy.name.clone(),
                class_name: None,
                max_health: enemy.max_health,
                final_health: enemy.health,
                survived: enemy.is_alive(),
                damage_dealt: totals.damage_dealt,
                damage_taken: totals.damage_taken,
                healing_done: totals.healing_done,
                casts: totals.casts,
            }
        })
        .collect();

    MatchResult {
        outcome,
        ticks: clock.tick,
        match_time: clock.elapsed,
        party,
        enemies,
        random_seed,
    }
}

/// Build the headless app for `config` around an already-loaded catalog.
pub fn build_app(config: &HeadlessConfig, catalog: AbilityCatalog) -> App {
    let mut app = App::new();
    // Minimal plugins - no window, no rendering
    app.add_plugins(MinimalPlugins).add_plugins(CombatPlugin);
    install_catalog(app.world_mut(), catalog);
    app.add_plugins(HeadlessPlugin { config: config.clone() });
    app
}

/// Drive `app` until the encounter completes.
pub fn run_app(mut app: App) -> Result<MatchRun, HeadlessError> {
    app.finish();
    app.cleanup();

    let budget = app.world().resource::<HeadlessMatchState>().max_ticks.saturating_add(1);
    for _ in 0..budget {
        app.update();
        if app.world().resource::<HeadlessMatchState>().match_complete {
            break;
        }
    }

    let world = app.world_mut();
    let result = world
        .resource_mut::<HeadlessMatchState>()
        .result
        .take()
        .ok_or(HeadlessError::Unfinished(budget))?;
    let log = std::mem::take(&mut *world.resource_mut::<CombatLog>());
    Ok(MatchRun { result, log })
}

/// Simulate an encounter without logging setup or file output.
pub fn simulate(config: &HeadlessConfig, catalog: AbilityCatalog) -> Result<MatchRun, HeadlessError> {
    config.check_specs(&catalog)?;
    run_app(build_app(config, catalog))
}

/// Load the catalog named by `config`, or the built-in one.
pub fn load_catalog(config: &HeadlessConfig) -> Result<AbilityCatalog, CatalogError> {
    match &config.catalog_path {
        Some(path) => AbilityCatalog::load_from_file(Path::new(path)),
        None => AbilityCatalog::builtin(),
    }
}

/// Run a headless encounter with the given configuration and save its log.
pub fn run_headless_match(config: HeadlessConfig) -> Result<MatchResult, HeadlessError> {
    println!("Starting headless encounter simulation...");
    for member in &config.party {
        println!(
            "  Party: {} ({} {}, {}, level {})",
            member.name,
            member.spec,
            member.class.name(),
            member.role.name(),
            member.level
        );
    }
    for enemy in &config.enemies {
        println!("  Enemy: {} ({:.0} HP)", enemy.name, enemy.max_health);
    }
    println!("  Strategy: {:?}", config.strategy);
    println!("  Max ticks: {}", config.max_ticks);

    let catalog = load_catalog(&config)?;
    config.check_specs(&catalog)?;

    let mut app = build_app(&config, catalog);
    app.add_plugins(LogPlugin::default());
    let run = run_app(app)?;

    let path = run
        .log
        .save_to_file(&run.result, config.output_path.as_deref().map(Path::new))?;
    println!("Encounter complete. Log saved to: {}", path.display());
    Ok(run.result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(json: &str) -> HeadlessConfig {
        HeadlessConfig::from_json(json).unwrap()
    }

    #[test]
    fn test_resource_pool_for_class() {
        let (kind, pool) = resource_pool_for(UnitClass::Warrior, 10);
        assert_eq!(kind, ResourceKind::Rage);
        assert_eq!(pool.current, 0.0);

        let (kind, pool) = resource_pool_for(UnitClass::Priest, 11);
        assert_eq!(kind, ResourceKind::Mana);
        assert_eq!(pool.max, MANA_POOL_BASE + 10.0 * MANA_PER_LEVEL);
        assert_eq!(pool.current, pool.max);

        assert_eq!(resource_pool_for(UnitClass::Rogue, 1).0, ResourceKind::Energy);
    }

    #[test]
    fn test_enemy_ids_follow_party_ids() {
        let config = config(
            r#"{
                "party": [{ "name": "A", "class": "Mage", "spec": "fire" }],
                "enemies": [
                    { "name": "Gnoll", "max_health": 50.0 },
                    { "name": "Gnoll Mystic", "max_health": 40.0, "cast_interval": 3, "cast_damage": 12.0 }
                ]
            }"#,
        );
        let party = build_party(&config);
        let enemies = build_enemies(&config);
        assert_eq!(party[0].id, UnitId(1));
        assert_eq!(enemies[0].id, UnitId(ENEMY_ID_BASE));
        assert_eq!(enemies[1].cast_interval, Some(3));
    }

    #[test]
    fn test_timeout_when_nobody_can_die() {
        let config = config(
            r#"{
                "party": [{ "name": "Vela", "class": "Priest", "spec": "holy", "role": "Healer" }],
                "enemies": [{ "name": "Training Dummy", "max_health": 100000.0 }],
                "max_ticks": 5,
                "random_seed": 3
            }"#,
        );
        let run = simulate(&config, AbilityCatalog::builtin().unwrap()).unwrap();
        assert_eq!(run.result.outcome, MatchOutcome::Timeout);
        assert_eq!(run.result.ticks, 5);
        assert!(!run.log.entries.is_empty());
    }
}
