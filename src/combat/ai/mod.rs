//! Utility Scoring AI
//!
//! Picks the ability a unit casts this tick. The AI holds no state of its own: it
//! borrows the catalog, the cooldown tracker and, when wired up, the resource
//! and status ledgers for the duration of one decision.
//!
//! ## Decision surface
//!
//! - **Tank / Healer**: every eligible ability is scored (see `scoring`), and the
//!   best one wins. Candidates within `SCORE_EPSILON` of the best are tied and
//!   one is picked with the injected RNG.
//! - **Damage / Unassigned**: ordered priority (see `priority`).

pub mod priority;
pub mod scoring;
pub mod signals;

use bevy::prelude::*;

use super::catalog::{AbilityCatalog, AbilityDefinition};
use super::constants::SCORE_EPSILON;
use super::cooldowns::CooldownTracker;
use super::eligibility::EligibilityResolver;
use super::resources::ResourceLedger;
use super::rng::GameRng;
use super::status::{BeaconLedger, DotLedger, PartyBuffLedger};
use super::units::{AbilityId, HealthSnapshot, Role, Unit, UnitId};

pub use signals::{EncounterMetrics, PartyMetrics, Signals};

/// The unit's current target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetInfo {
    pub id: UnitId,
    pub is_casting: bool,
}

/// Ephemeral view of the fight for one decision.
#[derive(Clone, Copy, Debug)]
pub struct CombatContext<'a> {
    pub enemies: &'a [HealthSnapshot],
    pub party: &'a [HealthSnapshot],
    pub target: Option<TargetInfo>,
}

impl<'a> CombatContext<'a> {
    pub fn new(enemies: &'a [HealthSnapshot], party: &'a [HealthSnapshot]) -> Self {
        Self {
            enemies,
            party,
            target: None,
        }
    }

    pub fn with_target(mut self, id: UnitId, is_casting: bool) -> Self {
        self.target = Some(TargetInfo { id, is_casting });
        self
    }
}

/// A candidate and its utility score.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredAbility {
    pub ability: AbilityId,
    pub score: f32,
}

/// Borrowed collaborators for one round of decisions.
#[derive(Clone, Copy)]
pub struct AbilityAi<'a> {
    catalog: &'a AbilityCatalog,
    cooldowns: &'a CooldownTracker,
    resources: Option<&'a ResourceLedger>,
    dots: Option<&'a DotLedger>,
    beacons: Option<&'a BeaconLedger>,
    buffs: Option<&'a PartyBuffLedger>,
}

impl<'a> AbilityAi<'a> {
    pub fn new(catalog: &'a AbilityCatalog, cooldowns: &'a CooldownTracker) -> Self {
        Self {
            catalog,
            cooldowns,
            resources: None,
            dots: None,
            beacons: None,
            buffs: None,
        }
    }

    pub fn with_resources(mut self, resources: &'a ResourceLedger) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn with_status(
        mut self,
        dots: &'a DotLedger,
        beacons: &'a BeaconLedger,
        buffs: &'a PartyBuffLedger,
    ) -> Self {
        self.dots = Some(dots);
        self.beacons = Some(beacons);
        self.buffs = Some(buffs);
        self
    }

    /// Eligible abilities for `unit` under the wired-up collaborators.
    pub fn eligible_abilities(&self, unit: &Unit) -> Vec<AbilityId> {
        EligibilityResolver::new(self.catalog, self.cooldowns, self.resources).eligible_abilities(unit)
    }

    /// Decide what `unit` casts this tick. Always returns an ability.
    pub fn choose_ability(&self, unit: &Unit, ctx: &CombatContext, rng: &mut GameRng) -> AbilityId {
        let eligible = self.eligible_abilities(unit);
        self.select(unit, ctx, &eligible, rng)
    }

    /// Decide among an explicit candidate list.
    pub fn select(&self, unit: &Unit, ctx: &CombatContext, eligible: &[AbilityId], rng: &mut GameRng) -> AbilityId {
        let candidates = self.definitions(unit, eligible);
        let signals = Signals::gather(unit, ctx);

        let chosen = match unit.role {
            Role::Tank | Role::Healer => {
                let scored = self.score_definitions(unit, ctx, &signals, &candidates);
                pick_best(&scored, rng)
            }
            Role::Damage | Role::Unassigned => self.choose_by_priority(unit, ctx, &signals, &candidates),
        };

        match chosen {
            Some(id) => {
                debug!("{} ({}) chose {}", unit.name, unit.role.name(), id);
                id
            }
            None => self.catalog.basic_attack().clone(),
        }
    }

    /// Score every candidate with the full utility function, regardless of role.
    pub fn score_all(&self, unit: &Unit, ctx: &CombatContext, eligible: &[AbilityId]) -> Vec<ScoredAbility> {
        let candidates = self.definitions(unit, eligible);
        let signals = Signals::gather(unit, ctx);
        self.score_definitions(unit, ctx, &signals, &candidates)
    }

    fn score_definitions(
        &self,
        unit: &Unit,
        ctx: &CombatContext,
        signals: &Signals,
        candidates: &[&AbilityDefinition],
    ) -> Vec<ScoredAbility> {
        candidates
            .iter()
            .map(|def| {
                let score = self.score(unit, ctx, signals, def);
                debug!("  {} {}: {:.1}", unit.name, def.id, score);
                ScoredAbility {
                    ability: def.id.clone(),
                    score,
                }
            })
            .collect()
    }

    /// Definitions for the candidates, skipping ids the unit's class cannot resolve.
    fn definitions(&self, unit: &Unit, eligible: &[AbilityId]) -> Vec<&'a AbilityDefinition> {
        eligible
            .iter()
            .filter_map(|id| {
                let def = self.catalog.definition_for(unit.class, id);
                if def.is_none() {
                    warn!("No definition of `{}` for {}; skipping", id, unit.class.name());
                }
                def
            })
            .collect()
    }
}

/// Highest score, with uniform random choice among candidates within `SCORE_EPSILON`.
pub fn pick_best(scored: &[ScoredAbility], rng: &mut GameRng) -> Option<AbilityId> {
    let best = scored
        .iter()
        .map(|s| s.score)
        .filter(|s| s.is_finite())
        .fold(f32::NEG_INFINITY, f32::max);
    if !best.is_finite() {
        return None;
    }

    let tied: Vec<&ScoredAbility> = scored
        .iter()
        .filter(|s| s.score.is_finite() && s.score >= best - SCORE_EPSILON)
        .collect();
    let index = if tied.len() > 1 { rng.pick_index(tied.len()) } else { 0 };
    tied.get(index).map(|s| s.ability.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::catalog::{AbilityRole, ResourceKind};
    use crate::combat::resources::{ResourcePool, Strategy};
    use crate::combat::units::UnitClass;

    const TANK: UnitId = UnitId(1);
    const PRIEST: UnitId = UnitId(3);
    const ROGUE: UnitId = UnitId(4);
    const ENEMY: UnitId = UnitId(100);

    fn enemies(n: usize) -> Vec<HealthSnapshot> {
        (0..n as u32)
            .map(|i| HealthSnapshot::new(UnitId(100 + i), 500.0, 500.0))
            .collect()
    }

    fn priest() -> Unit {
        Unit::new(PRIEST, "Mirelle", UnitClass::Priest, "holy", Role::Healer).with_level(60)
    }

    fn warrior() -> Unit {
        Unit::new(TANK, "Brakka", UnitClass::Warrior, "protection", Role::Tank).with_level(60)
    }

    fn rogue() -> Unit {
        Unit::new(ROGUE, "Vex", UnitClass::Rogue, "combat", Role::Damage).with_level(60)
    }

    fn ids(names: &[&str]) -> Vec<AbilityId> {
        names.iter().map(|n| AbilityId::from(*n)).collect()
    }

    #[test]
    fn test_pick_best_unique_maximum_is_deterministic() {
        let scored = vec![
            ScoredAbility { ability: "a".into(), score: 10.0 },
            ScoredAbility { ability: "b".into(), score: 12.0 },
            ScoredAbility { ability: "c".into(), score: 3.0 },
        ];
        for seed in 0..50 {
            let mut rng = GameRng::from_seed(seed);
            assert_eq!(pick_best(&scored, &mut rng), Some("b".into()));
        }
    }

    #[test]
    fn test_pick_best_ties_stay_within_epsilon() {
        let scored = vec![
            ScoredAbility { ability: "a".into(), score: 10.0 },
            ScoredAbility { ability: "b".into(), score: 10.0 + SCORE_EPSILON * 0.5 },
            ScoredAbility { ability: "c".into(), score: 5.0 },
        ];
        let mut seen_a = false;
        let mut seen_b = false;
        for seed in 0..100 {
            let mut rng = GameRng::from_seed(seed);
            match pick_best(&scored, &mut rng).unwrap().as_str() {
                "a" => seen_a = true,
                "b" => seen_b = true,
                other => panic!("picked {} outside the tie band", other),
            }
        }
        assert!(seen_a && seen_b);
    }

    #[test]
    fn test_pick_best_empty() {
        let mut rng = GameRng::from_seed(1);
        assert_eq!(pick_best(&[], &mut rng), None);
    }

    #[test]
    fn test_healer_heals_when_party_in_danger() {
        let catalog = AbilityCatalog::builtin().unwrap();
        let cooldowns = CooldownTracker::new();
        let ai = AbilityAi::new(&catalog, &cooldowns);
        let party = vec![
            HealthSnapshot::new(TANK, 20.0, 100.0),
            HealthSnapshot::new(PRIEST, 100.0, 100.0),
        ];
        let foes = enemies(1);
        let ctx = CombatContext::new(&foes, &party).with_target(ENEMY, false);
        let eligible = ids(&["smite", "flash_heal", "basic_attack"]);

        for seed in 0..50 {
            let mut rng = GameRng::from_seed(seed);
            let chosen = ai.select(&priest(), &ctx, &eligible, &mut rng);
            assert_eq!(chosen, AbilityId::from("flash_heal"));
        }
    }

    #[test]
    fn test_healer_never_picks_pure_damage_when_unsafe() {
        let catalog = AbilityCatalog::builtin().unwrap();
        let cooldowns = CooldownTracker::new();
        let ai = AbilityAi::new(&catalog, &cooldowns);
        let party = vec![
            HealthSnapshot::new(TANK, 24.0, 100.0),
            HealthSnapshot::new(PRIEST, 90.0, 100.0),
        ];
        let foes = enemies(3);
        let ctx = CombatContext::new(&foes, &party).with_target(ENEMY, true);
        let eligible = ai.eligible_abilities(&priest());

        for seed in 0..50 {
            let mut rng = GameRng::from_seed(seed);
            let chosen = ai.select(&priest(), &ctx, &eligible, &mut rng);
            let def = catalog.get(&chosen).unwrap();
            let pure_damage = def.has_role(AbilityRole::Damage) && !def.is_heal();
            assert!(!pure_damage, "picked {}", chosen);
        }
    }

    #[test]
    fn test_tank_uses_emergency_when_critical() {
        let catalog = AbilityCatalog::builtin().unwrap();
        let cooldowns = CooldownTracker::new();
        let ai = AbilityAi::new(&catalog, &cooldowns);
        let tank = warrior().with_health(10.0, 100.0);
        let party = vec![HealthSnapshot::from(&tank)];
        let foes = enemies(1);
        let ctx = CombatContext::new(&foes, &party).with_target(ENEMY, false);
        let eligible = ids(&["heroic_strike", "shield_wall", "basic_attack"]);

        let mut rng = GameRng::from_seed(7);
        assert_eq!(ai.select(&tank, &ctx, &eligible, &mut rng), AbilityId::from("shield_wall"));
    }

    #[test]
    fn test_tank_interrupts_casting_target() {
        let catalog = AbilityCatalog::builtin().unwrap();
        let cooldowns = CooldownTracker::new();
        let ai = AbilityAi::new(&catalog, &cooldowns);
        let tank = warrior();
        let party = vec![HealthSnapshot::from(&tank)];
        let foes = enemies(1);
        let eligible = ids(&["heroic_strike", "pummel", "basic_attack"]);

        let casting = CombatContext::new(&foes, &party).with_target(ENEMY, true);
        let mut rng = GameRng::from_seed(7);
        assert_eq!(ai.select(&tank, &casting, &eligible, &mut rng), AbilityId::from("pummel"));

        let idle = CombatContext::new(&foes, &party).with_target(ENEMY, false);
        assert_ne!(ai.select(&tank, &idle, &eligible, &mut rng), AbilityId::from("pummel"));
    }

    #[test]
    fn test_tank_prefers_aoe_threat_on_big_pulls() {
        let catalog = AbilityCatalog::builtin().unwrap();
        let cooldowns = CooldownTracker::new();
        let ai = AbilityAi::new(&catalog, &cooldowns);
        let tank = warrior();
        let party = vec![HealthSnapshot::from(&tank)];
        let foes = enemies(5);
        let ctx = CombatContext::new(&foes, &party).with_target(ENEMY, false);
        let eligible = ids(&["heroic_strike", "thunder_clap", "basic_attack"]);

        let mut rng = GameRng::from_seed(3);
        assert_eq!(ai.select(&tank, &ctx, &eligible, &mut rng), AbilityId::from("thunder_clap"));
    }

    #[test]
    fn test_damage_role_priority_order() {
        let catalog = AbilityCatalog::builtin().unwrap();
        let cooldowns = CooldownTracker::new();
        let ai = AbilityAi::new(&catalog, &cooldowns);
        let unit = rogue();
        let party = vec![HealthSnapshot::from(&unit)];
        let foes = enemies(1);
        let eligible = ai.eligible_abilities(&unit);
        let kit = catalog.class_kit(UnitClass::Rogue).unwrap();

        let idle = CombatContext::new(&foes, &party).with_target(ENEMY, false);
        let mut rng = GameRng::from_seed(1);
        let chosen = ai.select(&unit, &idle, &eligible, &mut rng);
        let first_usable = kit
            .priority
            .iter()
            .find(|id| {
                eligible.contains(id)
                    && !catalog.get(id).unwrap().has_role(AbilityRole::Interrupt)
                    && !catalog.get(id).unwrap().has_role(AbilityRole::EmergencyDefensive)
            })
            .unwrap();
        assert_eq!(&chosen, first_usable);

        let casting = CombatContext::new(&foes, &party).with_target(ENEMY, true);
        assert_eq!(ai.select(&unit, &casting, &eligible, &mut rng), AbilityId::from("kick"));
    }

    #[test]
    fn test_damage_role_survival_first() {
        let catalog = AbilityCatalog::builtin().unwrap();
        let cooldowns = CooldownTracker::new();
        let ai = AbilityAi::new(&catalog, &cooldowns);
        let unit = rogue().with_health(10.0, 100.0);
        let party = vec![HealthSnapshot::from(&unit)];
        let foes = enemies(1);
        let ctx = CombatContext::new(&foes, &party).with_target(ENEMY, true);
        let eligible = ai.eligible_abilities(&unit);
        let mut rng = GameRng::from_seed(1);
        assert_eq!(ai.select(&unit, &ctx, &eligible, &mut rng), AbilityId::from("evasion"));
    }

    #[test]
    fn test_unknown_candidates_are_skipped() {
        let catalog = AbilityCatalog::builtin().unwrap();
        let cooldowns = CooldownTracker::new();
        let ai = AbilityAi::new(&catalog, &cooldowns);
        let foes = enemies(1);
        let ctx = CombatContext::new(&foes, &[]);
        let eligible = ids(&["meteor_swarm", "basic_attack"]);
        let mut rng = GameRng::from_seed(1);
        assert_eq!(ai.select(&warrior(), &ctx, &eligible, &mut rng), AbilityId::from("basic_attack"));
        assert_eq!(ai.score_all(&warrior(), &ctx, &eligible).len(), 1);

        // Nothing resolvable at all still yields the fallback
        let nothing = ids(&["meteor_swarm"]);
        assert_eq!(ai.select(&rogue(), &ctx, &nothing, &mut rng), AbilityId::from("basic_attack"));
    }

    #[test]
    fn test_resource_discipline_and_missing_ledger() {
        let catalog = AbilityCatalog::builtin().unwrap();
        let cooldowns = CooldownTracker::new();
        let unit = priest();
        let party = vec![HealthSnapshot::new(TANK, 80.0, 100.0)];
        let foes = enemies(1);
        let ctx = CombatContext::new(&foes, &party);
        let eligible = ids(&["flash_heal", "basic_attack"]);

        let without = AbilityAi::new(&catalog, &cooldowns).score_all(&unit, &ctx, &eligible);

        let mut ledger = ResourceLedger::new(Strategy::Passive);
        ledger.register(PRIEST, ResourceKind::Mana, ResourcePool::new(100.0, 1000.0, 0.0));
        let with = AbilityAi::new(&catalog, &cooldowns)
            .with_resources(&ledger)
            .score_all(&unit, &ctx, &eligible);

        // Low pool: the heal pays a penalty, the fallback earns a bonus
        assert!(with[0].score < without[0].score);
        assert!(with[1].score > without[1].score);
    }

    #[test]
    fn test_active_buff_and_beacon_are_not_recast() {
        let catalog = AbilityCatalog::builtin().unwrap();
        let cooldowns = CooldownTracker::new();
        let dots = DotLedger::from_catalog(&catalog);
        let mut beacons = BeaconLedger::new();
        let mut buffs = PartyBuffLedger::from_catalog(&catalog);
        let paladin = Unit::new(UnitId(2), "Aldric", UnitClass::Paladin, "holy", Role::Healer).with_level(60);
        let party = vec![HealthSnapshot::new(TANK, 100.0, 100.0)];
        let foes = enemies(1);
        let ctx = CombatContext::new(&foes, &party);
        let eligible = ids(&["beacon_of_light", "blessing_of_might"]);

        let fresh = AbilityAi::new(&catalog, &cooldowns)
            .with_status(&dots, &beacons, &buffs)
            .score_all(&paladin, &ctx, &eligible);

        beacons.apply(paladin.id, TANK, 0.5, 60.0);
        buffs.apply(&"might".into(), paladin.id, None);
        let applied = AbilityAi::new(&catalog, &cooldowns)
            .with_status(&dots, &beacons, &buffs)
            .score_all(&paladin, &ctx, &eligible);

        assert!(applied[0].score < fresh[0].score);
        assert!(applied[1].score < fresh[1].score);
    }

    #[test]
    fn test_ticking_dot_is_not_refreshed_by_priority() {
        let catalog = AbilityCatalog::builtin().unwrap();
        let cooldowns = CooldownTracker::new();
        let mut dots = DotLedger::from_catalog(&catalog);
        let beacons = BeaconLedger::new();
        let buffs = PartyBuffLedger::from_catalog(&catalog);
        let warlock = Unit::new(UnitId(5), "Nyx", UnitClass::Warlock, "affliction", Role::Damage).with_level(60);
        let party = vec![HealthSnapshot::from(&warlock)];
        let foes = enemies(1);
        let ctx = CombatContext::new(&foes, &party).with_target(ENEMY, false);
        let eligible = ids(&["corruption", "shadow_bolt", "basic_attack"]);
        let mut rng = GameRng::from_seed(1);

        let ai = AbilityAi::new(&catalog, &cooldowns).with_status(&dots, &beacons, &buffs);
        assert_eq!(ai.select(&warlock, &ctx, &eligible, &mut rng), AbilityId::from("corruption"));

        dots.apply_dot(ENEMY, &"corruption".into(), warlock.id, 10.0, None, None);
        let ai = AbilityAi::new(&catalog, &cooldowns).with_status(&dots, &beacons, &buffs);
        assert_eq!(ai.select(&warlock, &ctx, &eligible, &mut rng), AbilityId::from("shadow_bolt"));
    }
}
