//! Damage Resolver interface
//!
//! The engine never writes health. DoT ticks and redirected heals are handed to a
//! `DamageResolver`, which owns the actual health pools.

use bevy::prelude::*;

use super::catalog::ResourceKind;
use super::constants::{RAGE_PER_DAMAGE_DEALT, RAGE_PER_DAMAGE_TAKEN};
use super::encounter::{CombatStats, EnemyRoster};
use super::resources::ResourceLedger;
use super::units::{AbilityId, PartyRoster, UnitId};

/// Collaborator that turns computed amounts into health changes.
pub trait DamageResolver {
    fn apply_damage(&mut self, source: UnitId, target: UnitId, amount: f32, ability: &AbilityId);

    fn apply_healing(&mut self, source: UnitId, target: UnitId, amount: f32, ability: &AbilityId);
}

/// A health change handed to a resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum HealthChange {
    Damage {
        source: UnitId,
        target: UnitId,
        amount: f32,
        ability: AbilityId,
    },
    Healing {
        source: UnitId,
        target: UnitId,
        amount: f32,
        ability: AbilityId,
    },
}

/// Resolver that only records what it was asked to do, for deferred application.
#[derive(Debug, Default)]
pub struct RecordingResolver {
    pub changes: Vec<HealthChange>,
}

impl RecordingResolver {
    /// Total damage recorded against `target`.
    pub fn damage_to(&self, target: UnitId) -> f32 {
        self.changes
            .iter()
            .filter_map(|change| match change {
                HealthChange::Damage { target: t, amount, .. } if *t == target => Some(*amount),
                _ => None,
            })
            .sum()
    }
}

/// Reference resolver used by the tick driver: writes health on the party and
/// enemy rosters, keeps statistics and generates rage from damage.
pub struct SimpleResolver<'w> {
    pub party: &'w mut PartyRoster,
    pub enemies: &'w mut EnemyRoster,
    pub stats: &'w mut CombatStats,
    pub resources: &'w mut ResourceLedger,
}

impl SimpleResolver<'_> {
    /// Health pool of any participant as (current, max).
    fn health_mut(&mut self, unit: UnitId) -> Option<(&mut f32, f32)> {
        if let Some(member) = self.party.get_mut(unit) {
            let max = member.max_health;
            return Some((&mut member.health, max));
        }
        self.enemies.get_mut(unit).map(|enemy| {
            let max = enemy.max_health;
            (&mut enemy.health, max)
        })
    }
}

impl DamageResolver for SimpleResolver<'_> {
    fn apply_damage(&mut self, source: UnitId, target: UnitId, amount: f32, ability: &AbilityId) {
        if !amount.is_finite() || amount <= 0.0 {
            return;
        }
        let Some((health, _)) = self.health_mut(target) else {
            warn!("{} hit unknown unit {} with {}", source, target, ability);
            return;
        };
        if *health <= 0.0 {
            return;
        }
        let dealt = amount.min(*health);
        *health -= dealt;

        self.stats.entry(source).damage_dealt += dealt;
        self.stats.entry(target).damage_taken += dealt;
        self.resources.gain(source, ResourceKind::Rage, dealt * RAGE_PER_DAMAGE_DEALT);
        self.resources.gain(target, ResourceKind::Rage, dealt * RAGE_PER_DAMAGE_TAKEN);
    }

    fn apply_healing(&mut self, source: UnitId, target: UnitId, amount: f32, ability: &AbilityId) {
        if !amount.is_finite() || amount <= 0.0 {
            return;
        }
        let Some((health, max)) = self.health_mut(target) else {
            warn!("{} healed unknown unit {} with {}", source, target, ability);
            return;
        };
        if *health <= 0.0 {
            return;
        }
        let healed = amount.min(max - *health).max(0.0);
        *health += healed;

        self.stats.entry(source).healing_done += healed;
        self.stats.entry(target).healing_received += healed;
    }
}

impl DamageResolver for RecordingResolver {
    fn apply_damage(&mut self, source: UnitId, target: UnitId, amount: f32, ability: &AbilityId) {
        self.changes.push(HealthChange::Damage {
            source,
            target,
            amount,
            ability: ability.clone(),
        });
    }

    fn apply_healing(&mut self, source: UnitId, target: UnitId, amount: f32, ability: &AbilityId) {
        self.changes.push(HealthChange::Healing {
            source,
            target,
            amount,
            ability: ability.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::encounter::Enemy;
    use crate::combat::resources::{ResourcePool, Strategy};
    use crate::combat::units::{Role, Unit, UnitClass};

    fn fixtures() -> (PartyRoster, EnemyRoster, CombatStats, ResourceLedger) {
        let tank = Unit::new(UnitId(1), "Brakka", UnitClass::Warrior, "protection", Role::Tank)
            .with_health(80.0, 100.0);
        let party = PartyRoster::new(vec![tank]);
        let enemies = EnemyRoster::new(vec![Enemy::new(UnitId(100), "Ogre", 30.0, 10.0)]);
        let mut resources = ResourceLedger::new(Strategy::Passive);
        resources.register(UnitId(1), ResourceKind::Rage, ResourcePool::new(0.0, 100.0, 0.0));
        (party, enemies, CombatStats::default(), resources)
    }

    #[test]
    fn test_simple_resolver_clamps_damage_and_healing() {
        let (mut party, mut enemies, mut stats, mut resources) = fixtures();
        let strike = AbilityId::from("heroic_strike");
        {
            let mut resolver = SimpleResolver {
                party: &mut party,
                enemies: &mut enemies,
                stats: &mut stats,
                resources: &mut resources,
            };
            resolver.apply_damage(UnitId(1), UnitId(100), 50.0, &strike);
            resolver.apply_healing(UnitId(1), UnitId(1), 50.0, &"flash_heal".into());
            resolver.apply_damage(UnitId(100), UnitId(1), 10.0, &"basic_attack".into());
        }
        assert_eq!(enemies.get(UnitId(100)).unwrap().health, 0.0);
        assert_eq!(party.get(UnitId(1)).unwrap().health, 90.0);
        assert_eq!(stats.get(UnitId(1)).damage_dealt, 30.0);
        assert_eq!(stats.get(UnitId(1)).healing_done, 20.0);
        let rage = resources.pool(UnitId(1), ResourceKind::Rage).unwrap().current;
        assert_eq!(rage, 30.0 * RAGE_PER_DAMAGE_DEALT + 10.0 * RAGE_PER_DAMAGE_TAKEN);
    }

    #[test]
    fn test_recording_resolver_sums_damage() {
        let mut recorder = RecordingResolver::default();
        let dot = AbilityId::from("corruption");
        recorder.apply_damage(UnitId(1), UnitId(2), 10.0, &dot);
        recorder.apply_damage(UnitId(1), UnitId(2), 5.0, &dot);
        recorder.apply_healing(UnitId(1), UnitId(2), 7.0, &dot);
        assert_eq!(recorder.damage_to(UnitId(2)), 15.0);
        assert_eq!(recorder.damage_to(UnitId(3)), 0.0);
    }
}
