//! Encounter state owned by the tick driver: hostiles, the clock, per-unit stats.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::constants::TICK_SECONDS;
use super::units::{HealthSnapshot, UnitId};

/// A hostile unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Enemy {
    pub id: UnitId,
    pub name: String,
    pub health: f32,
    pub max_health: f32,
    /// Melee damage dealt to its target each tick
    pub damage: f32,
    /// Starts a cast every N ticks (None = never casts)
    pub cast_interval: Option<u32>,
    /// Damage dealt to every party member when a cast completes
    pub cast_damage: f32,
    /// A cast is in progress and can be interrupted
    pub is_casting: bool,
}

impl Enemy {
    pub fn new(id: UnitId, name: impl Into<String>, max_health: f32, damage: f32) -> Self {
        let max_health = max_health.max(0.0);
        Self {
            id,
            name: name.into(),
            health: max_health,
            max_health,
            damage,
            cast_interval: None,
            cast_damage: 0.0,
            is_casting: false,
        }
    }

    pub fn with_cast(mut self, interval: u32, damage: f32) -> Self {
        self.cast_interval = (interval > 0).then_some(interval);
        self.cast_damage = damage;
        self
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }
}

impl From<&Enemy> for HealthSnapshot {
    fn from(enemy: &Enemy) -> Self {
        HealthSnapshot::new(enemy.id, enemy.health, enemy.max_health)
    }
}

/// All hostiles in the encounter.
#[derive(Resource, Clone, Debug, Default, Serialize, Deserialize)]
pub struct EnemyRoster {
    enemies: Vec<Enemy>,
}

impl EnemyRoster {
    pub fn new(enemies: Vec<Enemy>) -> Self {
        Self { enemies }
    }

    pub fn get(&self, id: UnitId) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|e| e.id == id)
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn enemies_mut(&mut self) -> &mut [Enemy] {
        &mut self.enemies
    }

    pub fn alive(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.iter().filter(|e| e.is_alive())
    }

    pub fn any_alive(&self) -> bool {
        self.enemies.iter().any(Enemy::is_alive)
    }

    /// The party focuses the first living enemy.
    pub fn focus_target(&self) -> Option<&Enemy> {
        self.alive().next()
    }

    pub fn health_snapshots(&self) -> Vec<HealthSnapshot> {
        self.alive().map(HealthSnapshot::from).collect()
    }
}

/// Running totals for one unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub healing_done: f32,
    pub healing_received: f32,
    pub casts: u32,
}

/// Per-unit statistics for the whole encounter.
#[derive(Resource, Clone, Debug, Default)]
pub struct CombatStats {
    units: BTreeMap<UnitId, UnitStats>,
}

impl CombatStats {
    pub fn get(&self, unit: UnitId) -> UnitStats {
        self.units.get(&unit).copied().unwrap_or_default()
    }

    pub fn entry(&mut self, unit: UnitId) -> &mut UnitStats {
        self.units.entry(unit).or_default()
    }
}

/// Simulation clock of the tick driver.
#[derive(Resource, Clone, Debug, Default)]
pub struct TickClock {
    pub tick: u32,
    pub elapsed: f32,
    /// Units whose death has already been processed
    pub fallen: BTreeSet<UnitId>,
}

impl TickClock {
    pub fn advance(&mut self) {
        self.tick += 1;
        self.elapsed += TICK_SECONDS;
    }
}
