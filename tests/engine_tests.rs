//! Integration tests for the decision engine ledgers and AI
//!
//! These tests verify that:
//! - DoT re-application follows the strength-first refresh policy
//! - Resource pools stay within bounds
//! - Beacons stay exclusive per caster and redirect the right amount
//! - Cooldowns decay back to eligibility
//! - Healers never attack while the party is in danger
//! - A unique best score wins under every seed

use partysim::combat::ai::{AbilityAi, CombatContext};
use partysim::combat::catalog::{AbilityCatalog, AbilityRole, ResourceKind};
use partysim::combat::cooldowns::CooldownTracker;
use partysim::combat::eligibility::EligibilityResolver;
use partysim::combat::events::{DotApplyOutcome, EngineEvent};
use partysim::combat::resolver::RecordingResolver;
use partysim::combat::resources::{ResourceLedger, ResourcePool, Strategy};
use partysim::combat::rng::GameRng;
use partysim::combat::constants::SCORE_EPSILON;
use partysim::combat::status::{BeaconLedger, DotLedger, DotSchedule, PartyBuffLedger};
use partysim::combat::units::{AbilityId, HealthSnapshot, Role, Unit, UnitClass, UnitId};
use partysim::headless::runner::resource_pool_for;

const CASTER: UnitId = UnitId(1);
const TARGET: UnitId = UnitId(100);

fn dot_a() -> AbilityId {
    AbilityId::from("dot_a")
}

fn ledger_with_dot_a() -> DotLedger {
    let mut ledger = DotLedger::new();
    ledger.register(
        dot_a(),
        DotSchedule {
            duration: 6.0,
            tick_interval: 1.0,
        },
    );
    ledger
}

// =============================================================================
// Damage Over Time
// =============================================================================

#[test]
fn test_dot_refresh_then_weaker_noop_scenario() {
    let mut ledger = ledger_with_dot_a();

    assert!(ledger.apply_dot(TARGET, &dot_a(), CASTER, 10.0, Some(6.0), None));
    assert_eq!(ledger.get(TARGET, &dot_a()).unwrap().remaining_ticks, 6);

    // Equal strength, longer duration: refreshed, not summed
    assert!(ledger.apply_dot(TARGET, &dot_a(), CASTER, 10.0, Some(10.0), None));
    assert_eq!(ledger.get(TARGET, &dot_a()).unwrap().remaining_ticks, 10);

    // Weaker: pure no-op
    let before = ledger.snapshot();
    assert!(!ledger.apply_dot(TARGET, &dot_a(), CASTER, 5.0, Some(10.0), None));
    assert_eq!(ledger.snapshot(), before);
    let stored = ledger.get(TARGET, &dot_a()).unwrap();
    assert_eq!(stored.damage_per_tick, 10.0);
    assert_eq!(stored.remaining_ticks, 10);

    let outcomes: Vec<DotApplyOutcome> = ledger
        .drain_events()
        .filter_map(|e| match e {
            EngineEvent::DotApplied { outcome, .. } => Some(outcome),
            _ => None,
        })
        .collect();
    assert_eq!(outcomes, vec![DotApplyOutcome::Created, DotApplyOutcome::Refreshed]);
}

#[test]
fn test_dot_strength_never_decreases() {
    let mut ledger = ledger_with_dot_a();
    let mut resolver = RecordingResolver::default();
    let mut strongest: f32 = 0.0;
    for (step, damage) in [4.0, 9.0, 3.0, 9.0, 12.0, 1.0, 12.0].into_iter().enumerate() {
        ledger.apply_dot(TARGET, &dot_a(), CASTER, damage, Some(3.0 + step as f32), None);
        strongest = strongest.max(damage);
        assert_eq!(ledger.get(TARGET, &dot_a()).unwrap().damage_per_tick, strongest);
        ledger.tick(1.0, &mut resolver);
    }
}

#[test]
fn test_dot_damage_reaches_resolver_once_per_tick() {
    let mut ledger = ledger_with_dot_a();
    let mut resolver = RecordingResolver::default();
    ledger.apply_dot(TARGET, &dot_a(), CASTER, 10.0, Some(3.0), None);
    for _ in 0..5 {
        ledger.tick(1.0, &mut resolver);
    }
    assert_eq!(resolver.damage_to(TARGET), 30.0);
    assert!(!ledger.has_dot(TARGET, &dot_a()));
}

// =============================================================================
// Resources
// =============================================================================

#[test]
fn test_resource_bounds_hold_for_mixed_sequences() {
    let mut ledger = ResourceLedger::new(Strategy::Burst);
    ledger.register(CASTER, ResourceKind::Mana, ResourcePool::new(40.0, 100.0, 7.0));
    let mut rng = GameRng::from_seed(99);

    for _ in 0..500 {
        let roll = rng.random_f32();
        let amount = rng.random_f32() * 60.0;
        if roll < 0.5 {
            let before = ledger.pool(CASTER, ResourceKind::Mana).unwrap().current;
            let spent = ledger.consume(CASTER, ResourceKind::Mana, amount);
            let after = ledger.pool(CASTER, ResourceKind::Mana).unwrap().current;
            if amount > before {
                assert!(!spent);
                assert_eq!(before, after);
            }
        } else {
            ledger.regenerate(rng.random_f32() * 5.0);
        }
        let pool = ledger.pool(CASTER, ResourceKind::Mana).unwrap();
        assert!(pool.current >= 0.0 && pool.current <= pool.max);
    }
}

// =============================================================================
// Beacons
// =============================================================================

#[test]
fn test_beacon_exclusive_per_caster_and_follows_latest_target() {
    let mut ledger = BeaconLedger::new();
    let targets = [UnitId(2), UnitId(3), UnitId(2), UnitId(4)];
    for target in targets {
        ledger.apply(CASTER, target, 0.5, 30.0);
        let owned: Vec<_> = ledger.beacons().iter().filter(|b| b.caster == CASTER).collect();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].target, target);
    }
}

#[test]
fn test_beacon_redirects_percent_of_heal() {
    let mut ledger = BeaconLedger::new();
    ledger.apply(CASTER, UnitId(2), 0.4, 30.0);

    let redirect = ledger.redirect_healing(UnitId(2), 50.0);
    assert!((redirect.redirected_amount - 20.0).abs() < 1e-4);
    assert_eq!(redirect.beacon_caster, Some(CASTER));
    assert_eq!(redirect.beacon_target, Some(UnitId(2)));

    let missed = ledger.redirect_healing(UnitId(3), 50.0);
    assert_eq!(missed.redirected_amount, 0.0);
    assert_eq!(missed.beacon_target, None);
}

// =============================================================================
// Cooldowns
// =============================================================================

#[test]
fn test_cooldown_decays_back_to_eligibility() {
    let catalog = AbilityCatalog::builtin().unwrap();
    let warrior = Unit::new(CASTER, "Brakka", UnitClass::Warrior, "protection", Role::Tank).with_level(20);
    let pummel = AbilityId::from("pummel");
    let def = catalog.get(&pummel).unwrap();
    let ticks = def.cooldown;
    assert!(ticks > 0);

    let mut cooldowns = CooldownTracker::new();
    cooldowns.start(CASTER, def);
    for _ in 0..ticks - 1 {
        cooldowns.tick();
    }
    let eligible = EligibilityResolver::new(&catalog, &cooldowns, None).eligible_abilities(&warrior);
    assert!(!eligible.contains(&pummel));

    cooldowns.tick();
    let eligible = EligibilityResolver::new(&catalog, &cooldowns, None).eligible_abilities(&warrior);
    assert!(eligible.contains(&pummel));
}

// =============================================================================
// AI
// =============================================================================

/// Scores a healer's decision with every ledger wired up the way the tick driver does.
fn healer_choices(healer: &Unit, seeds: std::ops::Range<u64>) -> Vec<AbilityId> {
    let catalog = AbilityCatalog::builtin().unwrap();
    let cooldowns = CooldownTracker::new();
    let dots = DotLedger::from_catalog(&catalog);
    let beacons = BeaconLedger::new();
    let buffs = PartyBuffLedger::from_catalog(&catalog);
    let mut resources = ResourceLedger::new(Strategy::Passive);
    let (kind, pool) = resource_pool_for(healer.class, healer.level);
    resources.register(healer.id, kind, pool);

    let party = [HealthSnapshot::new(CASTER, 10.0, 100.0), HealthSnapshot::from(healer)];
    let enemies = [HealthSnapshot::new(TARGET, 500.0, 500.0)];
    let ctx = CombatContext::new(&enemies, &party).with_target(TARGET, false);
    let ai = AbilityAi::new(&catalog, &cooldowns)
        .with_resources(&resources)
        .with_status(&dots, &beacons, &buffs);

    seeds
        .map(|seed| ai.choose_ability(healer, &ctx, &mut GameRng::from_seed(seed)))
        .collect()
}

fn assert_restores_health(choices: &[AbilityId]) {
    let catalog = AbilityCatalog::builtin().unwrap();
    for choice in choices {
        let def = catalog.get(choice).unwrap();
        let protective = def.is_heal()
            || def.has_role(AbilityRole::Shield)
            || def.has_role(AbilityRole::EmergencyDefensive);
        assert!(protective && def.amount > 0.0, "picked {} (amount {})", choice, def.amount);
    }
}

#[test]
fn test_healer_never_attacks_when_party_is_critical() {
    let priest = Unit::new(UnitId(2), "Vela", UnitClass::Priest, "holy", Role::Healer).with_level(10);
    let catalog = AbilityCatalog::builtin().unwrap();
    let cooldowns = CooldownTracker::new();
    let eligible = AbilityAi::new(&catalog, &cooldowns).eligible_abilities(&priest);
    assert!(eligible.contains(&AbilityId::from("smite")));
    assert!(eligible.contains(&AbilityId::from("flash_heal")));

    assert_restores_health(&healer_choices(&priest, 0..20));
}

#[test]
fn test_holy_priest_heals_critical_ally_at_max_level() {
    let priest = Unit::new(UnitId(2), "Vela", UnitClass::Priest, "holy", Role::Healer).with_level(60);
    assert_restores_health(&healer_choices(&priest, 0..20));
}

#[test]
fn test_holy_paladin_heals_before_placing_beacon() {
    let paladin = Unit::new(UnitId(3), "Aldric", UnitClass::Paladin, "holy", Role::Healer).with_level(60);
    let choices = healer_choices(&paladin, 0..20);
    assert!(!choices.contains(&AbilityId::from("beacon_of_light")));
    assert_restores_health(&choices);
}

#[test]
fn test_unique_best_score_wins_for_every_seed() {
    let catalog = AbilityCatalog::builtin().unwrap();
    let cooldowns = CooldownTracker::new();
    let tank = Unit::new(CASTER, "Brakka", UnitClass::Warrior, "protection", Role::Tank).with_level(30);
    let party = [HealthSnapshot::from(&tank)];
    let enemies = [
        HealthSnapshot::new(UnitId(100), 300.0, 300.0),
        HealthSnapshot::new(UnitId(101), 300.0, 300.0),
        HealthSnapshot::new(UnitId(102), 300.0, 300.0),
    ];
    let ctx = CombatContext::new(&enemies, &party).with_target(UnitId(100), false);
    let ai = AbilityAi::new(&catalog, &cooldowns);

    // Three enemies: the area threat ability leads every other candidate by well over epsilon
    let eligible = ai.eligible_abilities(&tank);
    let scored = ai.score_all(&tank, &ctx, &eligible);
    let best = scored.iter().map(|s| s.score).fold(f32::MIN, f32::max);
    let leaders: Vec<_> = scored.iter().filter(|s| best - s.score <= SCORE_EPSILON).collect();
    assert_eq!(leaders.len(), 1);
    assert_eq!(leaders[0].ability, AbilityId::from("thunder_clap"));

    for seed in 0..50 {
        assert_eq!(ai.choose_ability(&tank, &ctx, &mut GameRng::from_seed(seed)), leaders[0].ability);
    }
}
