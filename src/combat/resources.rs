//! Resource Ledger
//!
//! Per-unit mana / energy / rage pools. Every mutation clamps into `[0, max]`,
//! so no sequence of calls can leave a pool negative or overfull.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::catalog::ResourceKind;
use super::units::UnitId;

/// Party-wide pacing setting that scales regeneration for every unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    #[default]
    Passive,
    Active,
    Burst,
}

impl Strategy {
    pub fn multiplier(&self) -> f32 {
        match self {
            Strategy::Passive => 1.0,
            Strategy::Active => 1.5,
            Strategy::Burst => 2.0,
        }
    }

    /// Parse a strategy name (case-sensitive, as written in configs)
    pub fn from_name(name: &str) -> Option<Strategy> {
        match name {
            "Passive" => Some(Strategy::Passive),
            "Active" => Some(Strategy::Active),
            "Burst" => Some(Strategy::Burst),
            _ => None,
        }
    }
}

/// One resource pool.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourcePool {
    pub current: f32,
    pub max: f32,
    /// Points regenerated per second before the strategy multiplier
    pub base_rate: f32,
}

impl ResourcePool {
    /// Pool clamped into a valid state.
    pub fn new(current: f32, max: f32, base_rate: f32) -> Self {
        let max = if max.is_finite() { max.max(0.0) } else { 0.0 };
        let current = if current.is_finite() { current.clamp(0.0, max) } else { 0.0 };
        let base_rate = if base_rate.is_finite() { base_rate } else { 0.0 };
        Self { current, max, base_rate }
    }

    /// A full pool.
    pub fn full(max: f32, base_rate: f32) -> Self {
        Self::new(max, max, base_rate)
    }

    /// Fill fraction (0.0 to 1.0)
    pub fn ratio(&self) -> f32 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }
}

/// Resource pools for every unit.
#[derive(Resource, Debug, Default)]
pub struct ResourceLedger {
    pools: BTreeMap<UnitId, BTreeMap<ResourceKind, ResourcePool>>,
    strategy: Strategy,
}

/// Serializable view of the ledger.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub strategy: Strategy,
    pub pools: BTreeMap<UnitId, BTreeMap<ResourceKind, ResourcePool>>,
}

impl ResourceLedger {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            pools: BTreeMap::new(),
            strategy,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.strategy = strategy;
    }

    /// Add or replace a pool for a unit.
    pub fn register(&mut self, unit: UnitId, kind: ResourceKind, pool: ResourcePool) {
        self.pools.entry(unit).or_default().insert(kind, pool);
    }

    /// Regenerate every pool by `base_rate * strategy * delta`, clamped to `[0, max]`.
    pub fn regenerate(&mut self, delta: f32) {
        if !delta.is_finite() || delta <= 0.0 {
            return;
        }
        let multiplier = self.strategy.multiplier();
        for pool in self.pools.values_mut().flat_map(|pools| pools.values_mut()) {
            pool.current = (pool.current + pool.base_rate * multiplier * delta).clamp(0.0, pool.max);
        }
    }

    /// Spend `amount`. Succeeds only if the full amount is available; never partially deducts.
    pub fn consume(&mut self, unit: UnitId, kind: ResourceKind, amount: f32) -> bool {
        if !amount.is_finite() || amount < 0.0 {
            warn!("Rejected resource spend of {} {:?} for unit {}", amount, kind, unit);
            return false;
        }
        let Some(pool) = self.pool_mut(unit, kind) else {
            return false;
        };
        if pool.current < amount {
            return false;
        }
        pool.current = (pool.current - amount).max(0.0);
        true
    }

    /// Add `amount` (rage from damage taken, mana potions), capped at max.
    pub fn gain(&mut self, unit: UnitId, kind: ResourceKind, amount: f32) {
        if !amount.is_finite() || amount <= 0.0 {
            return;
        }
        if let Some(pool) = self.pool_mut(unit, kind) {
            pool.current = (pool.current + amount).min(pool.max);
        }
    }

    pub fn can_afford(&self, unit: UnitId, kind: ResourceKind, amount: f32) -> bool {
        self.pool(unit, kind).is_some_and(|pool| pool.current >= amount)
    }

    pub fn pool(&self, unit: UnitId, kind: ResourceKind) -> Option<&ResourcePool> {
        self.pools.get(&unit).and_then(|pools| pools.get(&kind))
    }

    fn pool_mut(&mut self, unit: UnitId, kind: ResourceKind) -> Option<&mut ResourcePool> {
        self.pools.get_mut(&unit).and_then(|pools| pools.get_mut(&kind))
    }

    /// Fill fraction of a pool, `None` when the unit has no such pool.
    pub fn ratio(&self, unit: UnitId, kind: ResourceKind) -> Option<f32> {
        self.pool(unit, kind).map(ResourcePool::ratio)
    }

    /// The unit's first pool (units normally have exactly one).
    pub fn primary_pool(&self, unit: UnitId) -> Option<(ResourceKind, &ResourcePool)> {
        self.pools
            .get(&unit)
            .and_then(|pools| pools.iter().next())
            .map(|(kind, pool)| (*kind, pool))
    }

    pub fn remove_unit(&mut self, unit: UnitId) {
        self.pools.remove(&unit);
    }

    pub fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            strategy: self.strategy,
            pools: self.pools.clone(),
        }
    }
}
