//! Tick Driver Systems
//!
//! Reference ECS host for the decision engine. One `app.update()` advances the
//! encounter by one tick; the systems run in ordered phases:
//!
//! 1. **Regenerate** - advance the clock, regenerate resource pools
//! 2. **Cooldowns** - count down every cooldown by one tick
//! 3. **Dots** - advance DoT clocks, damage flows through the resolver
//! 4. **Expiry** - expire beacons and party buffs
//! 5. **Decide** - enemies begin casts, every living party member picks an ability
//! 6. **Resolve** - pay costs, apply effects, enemies act, deaths are processed
//! 7. **Dispatch** - drain ledger events into the combat log and the event bus
//!
//! ## Usage
//!
//! ```ignore
//! use partysim::combat::systems;
//!
//! systems::configure_tick_phases(&mut app);
//! systems::add_tick_systems(&mut app, || true);
//! ```

use bevy::prelude::*;
use std::collections::BTreeMap;

use super::ai::{AbilityAi, CombatContext};
use super::catalog::{AbilityCatalog, AbilityDefinition, AbilityEffectKind, AbilityRole, SpellSchool, BASIC_ATTACK};
use super::constants::{POWER_COEFFICIENT, TICK_SECONDS};
use super::cooldowns::CooldownTracker;
use super::encounter::{CombatStats, Enemy, EnemyRoster, TickClock};
use super::events::{AbilityChosenEvent, EngineEvent, RemovalReason};
use super::log::{CombatLog, CombatLogEventType};
use super::resolver::{DamageResolver, SimpleResolver};
use super::resources::ResourceLedger;
use super::rng::GameRng;
use super::status::{BeaconLedger, DotLedger, PartyBuffLedger};
use super::units::{AbilityId, PartyRoster, Role, StatKind, Unit, UnitId};

/// Label used for damage from a completed enemy cast.
pub const ENEMY_CAST: &str = "enemy_cast";

/// System set labels for tick ordering.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TickPhase {
    Regenerate,
    Cooldowns,
    Dots,
    Expiry,
    Decide,
    Resolve,
    /// Runs every update, so events raised at startup or on the final tick still reach the log
    Dispatch,
}

/// Abilities chosen in `Decide`, consumed by `Resolve` on the same tick.
#[derive(Resource, Debug, Default)]
pub struct PendingActions {
    pub actions: Vec<AbilityChosenEvent>,
}

/// Configures the ordering between tick phases.
///
/// Call this once during app setup before adding tick systems.
pub fn configure_tick_phases(app: &mut App) {
    app.configure_sets(
        Update,
        (
            TickPhase::Regenerate,
            TickPhase::Cooldowns,
            TickPhase::Dots,
            TickPhase::Expiry,
            TickPhase::Decide,
            TickPhase::Resolve,
            TickPhase::Dispatch,
        )
            .chain(),
    );
}

/// Adds the tick driver systems to the app.
///
/// # Arguments
/// * `app` - The Bevy App to add systems to
/// * `run_condition` - Gate for the simulation phases (e.g. "encounter still running")
pub fn add_tick_systems<M>(app: &mut App, run_condition: impl Condition<M> + Clone)
where
    M: 'static,
{
    app.add_systems(
        Update,
        regenerate_resources
            .in_set(TickPhase::Regenerate)
            .run_if(run_condition.clone()),
    );
    app.add_systems(
        Update,
        tick_cooldowns
            .in_set(TickPhase::Cooldowns)
            .run_if(run_condition.clone()),
    );
    app.add_systems(Update, tick_dots.in_set(TickPhase::Dots).run_if(run_condition.clone()));
    app.add_systems(
        Update,
        expire_statuses
            .in_set(TickPhase::Expiry)
            .run_if(run_condition.clone()),
    );
    app.add_systems(
        Update,
        (begin_enemy_casts, decide_actions)
            .chain()
            .in_set(TickPhase::Decide)
            .run_if(run_condition.clone()),
    );
    app.add_systems(
        Update,
        (resolve_actions, enemy_actions, process_deaths)
            .chain()
            .in_set(TickPhase::Resolve)
            .run_if(run_condition),
    );
    app.add_systems(Update, dispatch_engine_events.in_set(TickPhase::Dispatch));
}

// === Startup ===

/// Every living member's class auras become permanent party buffs.
pub fn apply_class_auras(catalog: Res<AbilityCatalog>, party: Res<PartyRoster>, mut buffs: ResMut<PartyBuffLedger>) {
    for unit in party.alive() {
        let Some(kit) = catalog.class_kit(unit.class) else {
            continue;
        };
        for aura in &kit.auras {
            if buffs.apply(aura, unit.id, None) {
                info!("{} raises {}", unit.name, aura);
            }
        }
    }
}

// === Phase 1-4: Clocks ===

pub fn regenerate_resources(
    mut clock: ResMut<TickClock>,
    mut resources: ResMut<ResourceLedger>,
    mut log: ResMut<CombatLog>,
) {
    clock.advance();
    log.set_time(clock.tick, clock.elapsed);
    resources.regenerate(TICK_SECONDS);
}

pub fn tick_cooldowns(mut cooldowns: ResMut<CooldownTracker>) {
    cooldowns.tick();
}

pub fn tick_dots(
    mut dots: ResMut<DotLedger>,
    mut party: ResMut<PartyRoster>,
    mut enemies: ResMut<EnemyRoster>,
    mut stats: ResMut<CombatStats>,
    mut resources: ResMut<ResourceLedger>,
) {
    let mut resolver = SimpleResolver {
        party: &mut party,
        enemies: &mut enemies,
        stats: &mut stats,
        resources: &mut resources,
    };
    dots.tick(TICK_SECONDS, &mut resolver);
}

pub fn expire_statuses(mut beacons: ResMut<BeaconLedger>, mut buffs: ResMut<PartyBuffLedger>) {
    beacons.tick(TICK_SECONDS);
    buffs.tick(TICK_SECONDS);
}

// === Phase 5: Decide ===

/// Enemies with a cast interval start casting on every multiple of it.
pub fn begin_enemy_casts(clock: Res<TickClock>, mut enemies: ResMut<EnemyRoster>, mut log: ResMut<CombatLog>) {
    for enemy in enemies.enemies_mut().iter_mut().filter(|e| e.is_alive()) {
        let Some(interval) = enemy.cast_interval.filter(|i| *i > 0) else {
            continue;
        };
        if !enemy.is_casting && clock.tick % interval == 0 {
            enemy.is_casting = true;
            log.log(
                CombatLogEventType::MatchEvent,
                format!("{} begins casting", enemy.name),
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn decide_actions(
    catalog: Res<AbilityCatalog>,
    cooldowns: Res<CooldownTracker>,
    resources: Res<ResourceLedger>,
    dots: Res<DotLedger>,
    beacons: Res<BeaconLedger>,
    buffs: Res<PartyBuffLedger>,
    party: Res<PartyRoster>,
    enemies: Res<EnemyRoster>,
    mut rng: ResMut<GameRng>,
    mut pending: ResMut<PendingActions>,
    mut chosen_events: EventWriter<AbilityChosenEvent>,
) {
    let enemy_snapshots = enemies.health_snapshots();
    let party_snapshots = party.health_snapshots();
    let mut ctx = CombatContext::new(&enemy_snapshots, &party_snapshots);
    if let Some(target) = enemies.focus_target() {
        ctx = ctx.with_target(target.id, target.is_casting);
    }

    let ai = AbilityAi::new(&catalog, &cooldowns)
        .with_resources(&resources)
        .with_status(&dots, &beacons, &buffs);

    for unit in party.alive() {
        let ability = ai.choose_ability(unit, &ctx, &mut rng);
        debug!("{} ({}) chose {}", unit.name, unit.role.name(), ability);
        let action = AbilityChosenEvent {
            caster: unit.id,
            ability,
            target: ctx.target.map(|t| t.id),
        };
        chosen_events.send(action.clone());
        pending.actions.push(action);
    }
}

// === Phase 6: Resolve ===

#[allow(clippy::too_many_arguments)]
pub fn resolve_actions(
    catalog: Res<AbilityCatalog>,
    mut pending: ResMut<PendingActions>,
    mut party: ResMut<PartyRoster>,
    mut enemies: ResMut<EnemyRoster>,
    mut stats: ResMut<CombatStats>,
    mut resources: ResMut<ResourceLedger>,
    mut cooldowns: ResMut<CooldownTracker>,
    mut dots: ResMut<DotLedger>,
    mut beacons: ResMut<BeaconLedger>,
    mut buffs: ResMut<PartyBuffLedger>,
    mut log: ResMut<CombatLog>,
) {
    let actions: Vec<AbilityChosenEvent> = pending.actions.drain(..).collect();
    let bonuses = buffs.aggregate_stat_modifiers();

    for action in actions {
        let Some(caster) = party.get(action.caster).filter(|u| u.is_alive()).cloned() else {
            continue;
        };
        let Some(def) = catalog.definition_for(caster.class, &action.ability) else {
            warn!(
                "{} chose `{}`, which is not part of the {} kit",
                caster.name,
                action.ability,
                caster.class.name()
            );
            continue;
        };
        if let Some(kind) = def.resource {
            if def.cost > 0.0 && !resources.consume(caster.id, kind, def.cost) {
                debug!("{} cannot afford {} ({:?} {})", caster.name, def.name, kind, def.cost);
                continue;
            }
        }
        cooldowns.start(caster.id, def);
        stats.entry(caster.id).casts += 1;
        log.log(
            CombatLogEventType::AbilityUsed,
            format!("{} uses {}", caster.name, def.name),
        );

        let amount = scaled_amount(&caster, def, &bonuses);
        let enemy_target = action
            .target
            .filter(|id| enemies.get(*id).is_some_and(Enemy::is_alive))
            .or_else(|| enemies.focus_target().map(|e| e.id));

        if def.has_role(AbilityRole::Interrupt) {
            if let Some(enemy) = enemy_target.and_then(|id| enemies.get_mut(id)) {
                if enemy.is_casting {
                    enemy.is_casting = false;
                    log.log(
                        CombatLogEventType::AbilityUsed,
                        format!("{} interrupts {}", caster.name, enemy.name),
                    );
                }
            }
        }

        let damage_targets: Vec<UnitId> = if !def.is_damage() || amount <= 0.0 {
            Vec::new()
        } else if def.has_role(AbilityRole::AoeThreat) {
            enemies.alive().map(|e| e.id).collect()
        } else {
            enemy_target.into_iter().collect()
        };
        let heal_targets: Vec<UnitId> = if amount <= 0.0 {
            Vec::new()
        } else {
            match def.kind {
                AbilityEffectKind::AoeHeal => party.alive().map(|u| u.id).collect(),
                AbilityEffectKind::Heal
                | AbilityEffectKind::HealAttack
                | AbilityEffectKind::DotHeal
                | AbilityEffectKind::Shield => lowest_health_member(&party).into_iter().collect(),
                _ => Vec::new(),
            }
        };

        {
            let mut resolver = SimpleResolver {
                party: &mut party,
                enemies: &mut enemies,
                stats: &mut stats,
                resources: &mut resources,
            };
            for target in &damage_targets {
                resolver.apply_damage(caster.id, *target, amount, &def.id);
            }
            for target in &heal_targets {
                resolver.apply_healing(caster.id, *target, amount, &def.id);
                let redirect = beacons.redirect_healing(*target, amount);
                if let (Some(source), Some(beacon_target)) = (redirect.beacon_caster, redirect.beacon_target) {
                    resolver.apply_healing(source, beacon_target, redirect.redirected_amount, &def.id);
                }
            }
        }

        if let (Some(dot), Some(target)) = (def.dot, enemy_target) {
            dots.apply_dot(target, &def.id, caster.id, dot.damage_per_tick, Some(dot.duration), None);
        }
        if let Some(beacon) = def.beacon {
            let target = beacon_target(&party, caster.id);
            beacons.apply(caster.id, target, beacon.redirect_percent, beacon.duration);
        }
        if let Some(buff) = &def.buff {
            buffs.apply(buff, caster.id, None);
        }
    }
}

/// Each living enemy swings at the party's tank (or first living member); finished casts hit everyone.
pub fn enemy_actions(
    mut party: ResMut<PartyRoster>,
    mut enemies: ResMut<EnemyRoster>,
    mut stats: ResMut<CombatStats>,
    mut resources: ResMut<ResourceLedger>,
    mut log: ResMut<CombatLog>,
) {
    let melee = AbilityId::from(BASIC_ATTACK);
    let cast = AbilityId::from(ENEMY_CAST);

    let mut swings = Vec::new();
    let mut casts = Vec::new();
    for enemy in enemies.enemies_mut().iter_mut().filter(|e| e.is_alive()) {
        swings.push((enemy.id, enemy.damage));
        if enemy.is_casting {
            enemy.is_casting = false;
            casts.push((enemy.id, enemy.cast_damage));
            log.log(
                CombatLogEventType::Damage,
                format!("{} completes a cast", enemy.name),
            );
        }
    }

    let mut resolver = SimpleResolver {
        party: &mut party,
        enemies: &mut enemies,
        stats: &mut stats,
        resources: &mut resources,
    };
    for (enemy, damage) in swings {
        let Some(target) = enemy_focus(resolver.party) else {
            break;
        };
        resolver.apply_damage(enemy, target, damage, &melee);
    }
    for (enemy, damage) in casts {
        let targets: Vec<UnitId> = resolver.party.alive().map(|u| u.id).collect();
        for target in targets {
            resolver.apply_damage(enemy, target, damage, &cast);
        }
    }
}

/// Drops engine state tied to units that died this tick.
#[allow(clippy::too_many_arguments)]
pub fn process_deaths(
    mut clock: ResMut<TickClock>,
    party: Res<PartyRoster>,
    enemies: Res<EnemyRoster>,
    mut dots: ResMut<DotLedger>,
    mut beacons: ResMut<BeaconLedger>,
    mut buffs: ResMut<PartyBuffLedger>,
    mut cooldowns: ResMut<CooldownTracker>,
    mut resources: ResMut<ResourceLedger>,
    mut log: ResMut<CombatLog>,
) {
    for enemy in enemies.enemies().iter().filter(|e| !e.is_alive()) {
        if !clock.fallen.insert(enemy.id) {
            continue;
        }
        let cleared = dots.clear_target(enemy.id);
        info!("{} dies ({} DoTs cleared)", enemy.name, cleared);
        log.log(CombatLogEventType::Death, format!("{} dies", enemy.name));
    }

    for unit in party.members().iter().filter(|u| !u.is_alive()) {
        if !clock.fallen.insert(unit.id) {
            continue;
        }
        beacons.remove_with_reason(unit.id, RemovalReason::CasterGone);
        beacons.clear_target(unit.id);
        let buffs_lost = buffs.clear_by_caster(unit.id);
        cooldowns.clear_unit(unit.id);
        resources.remove_unit(unit.id);
        info!("{} dies ({} party buffs lost)", unit.name, buffs_lost);
        log.log(CombatLogEventType::Death, format!("{} dies", unit.name));
    }
}

// === Phase 7: Dispatch ===

/// Moves queued engine events into the combat log and onto the event bus.
pub fn dispatch_engine_events(
    mut cooldowns: ResMut<CooldownTracker>,
    mut dots: ResMut<DotLedger>,
    mut beacons: ResMut<BeaconLedger>,
    mut buffs: ResMut<PartyBuffLedger>,
    mut log: ResMut<CombatLog>,
    mut writer: EventWriter<EngineEvent>,
) {
    let events: Vec<EngineEvent> = cooldowns
        .drain_events()
        .chain(dots.drain_events())
        .chain(beacons.drain_events())
        .chain(buffs.drain_events())
        .collect();
    if events.is_empty() {
        return;
    }
    for event in &events {
        log.record(event);
    }
    writer.send_batch(events);
}

// === Helpers ===

/// Base amount plus the caster's attack or spell power bonus.
fn scaled_amount(caster: &Unit, def: &AbilityDefinition, bonuses: &BTreeMap<StatKind, f32>) -> f32 {
    if def.amount <= 0.0 {
        return 0.0;
    }
    let stat = match def.school {
        SpellSchool::Physical => StatKind::AttackPower,
        _ => StatKind::SpellPower,
    };
    def.amount + caster.effective_stat(stat, bonuses).max(0.0) * POWER_COEFFICIENT
}

/// Living member with the lowest health fraction; first in roster order on ties.
fn lowest_health_member(party: &PartyRoster) -> Option<UnitId> {
    party
        .alive()
        .min_by(|a, b| a.health_pct().total_cmp(&b.health_pct()))
        .map(|u| u.id)
}

/// Beacons go on another living tank when there is one, otherwise on the most wounded member.
fn beacon_target(party: &PartyRoster, caster: UnitId) -> UnitId {
    party
        .alive()
        .find(|u| u.role == Role::Tank && u.id != caster)
        .map(|u| u.id)
        .or_else(|| lowest_health_member(party))
        .unwrap_or(caster)
}

fn enemy_focus(party: &PartyRoster) -> Option<UnitId> {
    party
        .alive()
        .find(|u| u.role == Role::Tank)
        .or_else(|| party.alive().next())
        .map(|u| u.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::catalog::ResourceKind;
    use crate::combat::resources::{ResourcePool, Strategy};
    use crate::combat::units::UnitClass;
    use crate::combat::CombatPlugin;

    const TANK: UnitId = UnitId(1);
    const WARLOCK: UnitId = UnitId(2);
    const OGRE: UnitId = UnitId(100);

    fn test_app(party: Vec<Unit>, enemies: Vec<Enemy>) -> App {
        let catalog = AbilityCatalog::builtin().unwrap();
        let mut app = App::new();
        app.add_plugins(CombatPlugin);
        crate::combat::install_catalog(app.world_mut(), catalog);

        let mut resources = ResourceLedger::new(Strategy::Active);
        for unit in &party {
            let (kind, pool) = match unit.class {
                UnitClass::Warrior => (ResourceKind::Rage, ResourcePool::new(50.0, 100.0, 0.0)),
                _ => (ResourceKind::Mana, ResourcePool::full(200.0, 5.0)),
            };
            resources.register(unit.id, kind, pool);
        }
        app.insert_resource(resources)
            .insert_resource(PartyRoster::new(party))
            .insert_resource(EnemyRoster::new(enemies))
            .insert_resource(GameRng::from_seed(7));

        app.add_systems(Startup, apply_class_auras);
        add_tick_systems(&mut app, || true);
        app
    }

    fn warlock() -> Unit {
        Unit::new(WARLOCK, "Morwen", UnitClass::Warlock, "affliction", Role::Damage).with_level(10)
    }

    #[test]
    fn test_tick_advances_clock_and_casts() {
        let mut app = test_app(vec![warlock()], vec![Enemy::new(OGRE, "Ogre", 500.0, 0.0)]);
        app.update();

        let world = app.world();
        assert_eq!(world.resource::<TickClock>().tick, 1);
        assert_eq!(world.resource::<CombatStats>().get(WARLOCK).casts, 1);
        // Affliction opens with Corruption on the focus target.
        assert!(world.resource::<DotLedger>().has_dot(OGRE, &AbilityId::from("corruption")));
        assert!(world.resource::<PendingActions>().actions.is_empty());
    }

    #[test]
    fn test_dot_ticks_damage_enemy_over_time() {
        let mut app = test_app(vec![warlock()], vec![Enemy::new(OGRE, "Ogre", 5000.0, 0.0)]);
        for _ in 0..4 {
            app.update();
        }
        let world = app.world();
        let ogre = world.resource::<EnemyRoster>().get(OGRE).unwrap().health;
        assert!(ogre < 5000.0);
        let log = world.resource::<CombatLog>();
        assert!(log
            .engine_events()
            .any(|e| matches!(e, EngineEvent::DotTicked { dot, .. } if dot.as_str() == "corruption")));
    }

    #[test]
    fn test_interrupt_cancels_enemy_cast() {
        let tank = Unit::new(TANK, "Brakka", UnitClass::Warrior, "protection", Role::Tank).with_level(20);
        let caster = Enemy::new(OGRE, "Ogre Mage", 5000.0, 0.0).with_cast(1, 40.0);
        let mut app = test_app(vec![tank], vec![caster]);
        app.update();

        let world = app.world();
        assert!(!world.resource::<EnemyRoster>().get(OGRE).unwrap().is_casting);
        // Pummel landed, so the cast never hit the tank.
        assert_eq!(world.resource::<CombatStats>().get(TANK).damage_taken, 0.0);
        assert!(world.resource::<CooldownTracker>().remaining(TANK, &AbilityId::from("pummel")) > 0);
    }

    #[test]
    fn test_enemy_death_clears_dots() {
        let mut app = test_app(vec![warlock()], vec![Enemy::new(OGRE, "Ogre", 500.0, 0.0)]);
        app.update();
        assert!(app.world().resource::<DotLedger>().has_dot(OGRE, &AbilityId::from("corruption")));

        app.world_mut()
            .resource_mut::<EnemyRoster>()
            .get_mut(OGRE)
            .unwrap()
            .health = 0.0;
        app.update();

        let world = app.world();
        assert!(!world.resource::<DotLedger>().has_dot(OGRE, &AbilityId::from("corruption")));
        assert!(world.resource::<TickClock>().fallen.contains(&OGRE));
        assert_eq!(world.resource::<CombatLog>().filter_by_type(CombatLogEventType::Death).len(), 1);
    }

    #[test]
    fn test_party_death_drops_caster_state() {
        let mut app = test_app(vec![warlock()], vec![Enemy::new(OGRE, "Ogre", 5000.0, 0.0)]);
        app.update();
        assert!(app
            .world()
            .resource::<PartyBuffLedger>()
            .is_active(&"blood_pact".into()));

        app.world_mut()
            .resource_mut::<PartyRoster>()
            .get_mut(WARLOCK)
            .unwrap()
            .health = 0.0;
        app.update();

        let world = app.world();
        assert!(!world.resource::<PartyBuffLedger>().is_active(&"blood_pact".into()));
        assert!(world.resource::<ResourceLedger>().pool(WARLOCK, ResourceKind::Mana).is_none());
        let removed = world.resource::<CombatLog>().engine_events().any(|e| {
            matches!(e, EngineEvent::BuffRemoved { reason: RemovalReason::CasterGone, .. })
        });
        assert!(removed);
    }

    #[test]
    fn test_enemy_attacks_tank_first() {
        let tank = Unit::new(TANK, "Brakka", UnitClass::Warrior, "protection", Role::Tank);
        let mut app = test_app(vec![warlock(), tank], vec![Enemy::new(OGRE, "Ogre", 5000.0, 10.0)]);
        app.update();
        let stats = app.world().resource::<CombatStats>();
        assert_eq!(stats.get(TANK).damage_taken, 10.0);
        assert_eq!(stats.get(WARLOCK).damage_taken, 0.0);
    }

    #[test]
    fn test_lowest_health_member_prefers_roster_order_on_ties() {
        let party = PartyRoster::new(vec![
            Unit::new(UnitId(1), "A", UnitClass::Priest, "holy", Role::Healer).with_health(50.0, 100.0),
            Unit::new(UnitId(2), "B", UnitClass::Rogue, "combat", Role::Damage).with_health(50.0, 100.0),
        ]);
        assert_eq!(lowest_health_member(&party), Some(UnitId(1)));
        assert_eq!(beacon_target(&party, UnitId(1)), UnitId(1));
    }
}
