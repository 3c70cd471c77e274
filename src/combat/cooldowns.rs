//! Cooldown Tracker
//!
//! Remaining cooldowns are counted in whole ticks. An entry only exists while
//! its cooldown is running; a missing entry means the ability is ready.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use super::catalog::AbilityDefinition;
use super::constants::USAGE_HISTORY_LEN;
use super::events::EngineEvent;
use super::units::{AbilityId, UnitId};

/// A running cooldown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownEntry {
    pub remaining: u32,
    /// Base cooldown the entry was started with
    pub max: u32,
}

/// Per-unit cooldowns and recent cast history.
#[derive(Resource, Debug, Default)]
pub struct CooldownTracker {
    cooldowns: BTreeMap<UnitId, BTreeMap<AbilityId, CooldownEntry>>,
    history: BTreeMap<UnitId, VecDeque<AbilityId>>,
    events: Vec<EngineEvent>,
}

/// Serializable view of the tracker.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CooldownSnapshot {
    pub cooldowns: BTreeMap<UnitId, BTreeMap<AbilityId, CooldownEntry>>,
    pub history: BTreeMap<UnitId, Vec<AbilityId>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful cast: start the cooldown (if any) and append to history.
    pub fn start(&mut self, unit: UnitId, ability: &AbilityDefinition) {
        if ability.cooldown > 0 {
            self.cooldowns.entry(unit).or_default().insert(
                ability.id.clone(),
                CooldownEntry {
                    remaining: ability.cooldown,
                    max: ability.cooldown,
                },
            );
        }

        let history = self.history.entry(unit).or_default();
        if history.len() == USAGE_HISTORY_LEN {
            history.pop_front();
        }
        history.push_back(ability.id.clone());
    }

    /// Advance one tick: every running cooldown loses one tick and reports its new value.
    pub fn tick(&mut self) {
        for (unit, abilities) in self.cooldowns.iter_mut() {
            for (ability, entry) in abilities.iter_mut() {
                entry.remaining = entry.remaining.saturating_sub(1);
                self.events.push(EngineEvent::CooldownUpdated {
                    unit: *unit,
                    ability: ability.clone(),
                    remaining: entry.remaining,
                    max_cooldown: entry.max,
                });
            }
            abilities.retain(|_, entry| entry.remaining > 0);
        }
        self.cooldowns.retain(|_, abilities| !abilities.is_empty());
    }

    /// Remaining ticks, 0 when ready.
    pub fn remaining(&self, unit: UnitId, ability: &AbilityId) -> u32 {
        self.cooldowns
            .get(&unit)
            .and_then(|abilities| abilities.get(ability))
            .map(|entry| entry.remaining)
            .unwrap_or(0)
    }

    pub fn is_ready(&self, unit: UnitId, ability: &AbilityId) -> bool {
        self.remaining(unit, ability) == 0
    }

    /// Most recent casts, oldest first.
    pub fn recent_uses(&self, unit: UnitId) -> impl Iterator<Item = &AbilityId> {
        self.history.get(&unit).into_iter().flatten()
    }

    /// How often `ability` appears among the last `window` casts.
    pub fn recent_use_count(&self, unit: UnitId, ability: &AbilityId, window: usize) -> usize {
        self.history
            .get(&unit)
            .map(|history| history.iter().rev().take(window).filter(|id| *id == ability).count())
            .unwrap_or(0)
    }

    /// Forget everything about a unit (death, party leave).
    pub fn clear_unit(&mut self, unit: UnitId) {
        self.cooldowns.remove(&unit);
        self.history.remove(&unit);
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, EngineEvent> {
        self.events.drain(..)
    }

    pub fn snapshot(&self) -> CooldownSnapshot {
        CooldownSnapshot {
            cooldowns: self.cooldowns.clone(),
            history: self
                .history
                .iter()
                .map(|(unit, history)| (*unit, history.iter().cloned().collect()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::catalog::AbilityCatalog;

    fn ability(id: &str) -> AbilityDefinition {
        AbilityCatalog::builtin().unwrap().get(&id.into()).unwrap().clone()
    }

    #[test]
    fn test_zero_cooldown_starts_nothing_but_records_history() {
        let mut tracker = CooldownTracker::new();
        let basic = ability("basic_attack");
        assert_eq!(basic.cooldown, 0);
        tracker.start(UnitId(1), &basic);
        assert!(tracker.is_ready(UnitId(1), &basic.id));
        assert_eq!(tracker.recent_uses(UnitId(1)).count(), 1);
        assert!(tracker.snapshot().cooldowns.is_empty());
    }

    #[test]
    fn test_tick_decrements_and_emits_updates() {
        let mut tracker = CooldownTracker::new();
        let shield_wall = ability("shield_wall");
        tracker.start(UnitId(1), &shield_wall);
        assert_eq!(tracker.remaining(UnitId(1), &shield_wall.id), shield_wall.cooldown);

        tracker.tick();
        let events: Vec<_> = tracker.drain_events().collect();
        assert_eq!(
            events,
            vec![EngineEvent::CooldownUpdated {
                unit: UnitId(1),
                ability: shield_wall.id.clone(),
                remaining: shield_wall.cooldown - 1,
                max_cooldown: shield_wall.cooldown,
            }]
        );
    }

    #[test]
    fn test_entry_removed_when_reaching_zero() {
        let mut tracker = CooldownTracker::new();
        let shield_wall = ability("shield_wall");
        tracker.start(UnitId(1), &shield_wall);
        for _ in 0..shield_wall.cooldown {
            tracker.tick();
        }
        assert!(tracker.is_ready(UnitId(1), &shield_wall.id));
        assert!(tracker.snapshot().cooldowns.is_empty());

        // Nothing left to report
        tracker.drain_events().for_each(drop);
        tracker.tick();
        assert_eq!(tracker.drain_events().count(), 0);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut tracker = CooldownTracker::new();
        let basic = ability("basic_attack");
        let strike = ability("heroic_strike");
        tracker.start(UnitId(1), &strike);
        for _ in 0..USAGE_HISTORY_LEN {
            tracker.start(UnitId(1), &basic);
        }
        let history: Vec<_> = tracker.recent_uses(UnitId(1)).collect();
        assert_eq!(history.len(), USAGE_HISTORY_LEN);
        assert!(history.iter().all(|id| **id == basic.id));
    }

    #[test]
    fn test_recent_use_count_looks_at_window() {
        let mut tracker = CooldownTracker::new();
        let basic = ability("basic_attack");
        let strike = ability("heroic_strike");
        tracker.start(UnitId(1), &strike);
        tracker.start(UnitId(1), &basic);
        tracker.start(UnitId(1), &basic);
        assert_eq!(tracker.recent_use_count(UnitId(1), &strike.id, 2), 0);
        assert_eq!(tracker.recent_use_count(UnitId(1), &strike.id, 3), 1);
        assert_eq!(tracker.recent_use_count(UnitId(2), &strike.id, 3), 0);
    }

    #[test]
    fn test_clear_unit_resets_state() {
        let mut tracker = CooldownTracker::new();
        let shield_wall = ability("shield_wall");
        tracker.start(UnitId(1), &shield_wall);
        tracker.clear_unit(UnitId(1));
        assert!(tracker.is_ready(UnitId(1), &shield_wall.id));
        assert_eq!(tracker.recent_uses(UnitId(1)).count(), 0);
    }
}
