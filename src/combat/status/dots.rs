//! Damage-over-time ledger
//!
//! At most one instance exists per (target, dot id). Re-application follows a
//! strength-first refresh policy:
//!
//! 1. no instance: create it
//! 2. incoming is stronger (higher damage per tick): replace entirely
//! 3. equal strength: extend only if the new tick count is strictly greater
//! 4. incoming is weaker: no-op
//!
//! The stored damage per tick therefore never decreases while an instance lives.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::combat::catalog::AbilityCatalog;
use crate::combat::constants::{
    DEFAULT_DOT_DURATION, DEFAULT_DOT_TICK_INTERVAL, DOT_STRENGTH_EPSILON, TIME_EPSILON,
};
use crate::combat::events::{DotApplyOutcome, EngineEvent, RemovalReason};
use crate::combat::resolver::DamageResolver;
use crate::combat::units::{AbilityId, UnitId};

/// Tick schedule of a DoT effect.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DotSchedule {
    /// Default duration in seconds
    pub duration: f32,
    /// Seconds between ticks
    pub tick_interval: f32,
}

impl Default for DotSchedule {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DOT_DURATION,
            tick_interval: DEFAULT_DOT_TICK_INTERVAL,
        }
    }
}

impl DotSchedule {
    /// Whole ticks that fit in `duration`, at least one.
    pub fn tick_count(&self, duration: f32) -> u32 {
        (((duration / self.tick_interval) + TIME_EPSILON).floor() as u32).max(1)
    }
}

/// An active DoT on a target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DotInstance {
    pub caster: UnitId,
    pub damage_per_tick: f32,
    pub total_duration: f32,
    pub remaining_ticks: u32,
    pub tick_interval: f32,
    /// Ledger time of the last application or refresh
    pub applied_at: f32,
    /// Ledger time of the last tick (or of application, before the first tick)
    pub last_tick: f32,
}

/// DoT instances keyed by target, then by dot id.
#[derive(Resource, Debug, Default)]
pub struct DotLedger {
    schedules: BTreeMap<AbilityId, DotSchedule>,
    instances: BTreeMap<UnitId, BTreeMap<AbilityId, DotInstance>>,
    now: f32,
    events: Vec<EngineEvent>,
}

/// Serializable view of the ledger.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DotSnapshot {
    pub now: f32,
    pub instances: BTreeMap<UnitId, BTreeMap<AbilityId, DotInstance>>,
}

impl DotLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger with every DoT schedule declared in the catalog.
    pub fn from_catalog(catalog: &AbilityCatalog) -> Self {
        let mut ledger = Self::new();
        for (id, dot) in catalog.dot_definitions() {
            ledger.register(
                id.clone(),
                DotSchedule {
                    duration: dot.duration,
                    tick_interval: dot.tick_interval,
                },
            );
        }
        ledger
    }

    pub fn register(&mut self, dot: AbilityId, schedule: DotSchedule) {
        self.schedules.insert(dot, schedule);
    }

    pub fn with_schedule(mut self, dot: impl Into<AbilityId>, duration: f32, tick_interval: f32) -> Self {
        self.register(dot.into(), DotSchedule { duration, tick_interval });
        self
    }

    /// Ledger clock in seconds.
    pub fn now(&self) -> f32 {
        self.now
    }

    /// Apply or refresh a DoT. Returns whether the ledger changed.
    ///
    /// `duration` defaults to the registered schedule. When `total_damage` is given,
    /// the per-tick damage is derived from it instead of `damage_per_tick`.
    pub fn apply_dot(
        &mut self,
        target: UnitId,
        dot: &AbilityId,
        caster: UnitId,
        damage_per_tick: f32,
        duration: Option<f32>,
        total_damage: Option<f32>,
    ) -> bool {
        let schedule = match self.schedules.get(dot) {
            Some(schedule) => *schedule,
            None => {
                warn!("No tick schedule registered for DoT `{}`; using defaults", dot);
                DotSchedule::default()
            }
        };

        let duration = duration.unwrap_or(schedule.duration);
        if !duration.is_finite() || duration <= 0.0 {
            warn!("Rejected DoT `{}` on {} with duration {}", dot, target, duration);
            return false;
        }
        let ticks = schedule.tick_count(duration);
        let damage = match total_damage {
            Some(total) => total / ticks as f32,
            None => damage_per_tick,
        };
        if !damage.is_finite() || damage < 0.0 {
            warn!("Rejected DoT `{}` on {} with damage {}", dot, target, damage);
            return false;
        }

        let now = self.now;
        let fresh = DotInstance {
            caster,
            damage_per_tick: damage,
            total_duration: duration,
            remaining_ticks: ticks,
            tick_interval: schedule.tick_interval,
            applied_at: now,
            last_tick: now,
        };

        let outcome = match self.instances.get_mut(&target).and_then(|dots| dots.get_mut(dot)) {
            None => {
                self.instances.entry(target).or_default().insert(dot.clone(), fresh);
                DotApplyOutcome::Created
            }
            Some(existing) if damage > existing.damage_per_tick + DOT_STRENGTH_EPSILON => {
                *existing = fresh;
                DotApplyOutcome::Replaced
            }
            Some(existing) if (damage - existing.damage_per_tick).abs() <= DOT_STRENGTH_EPSILON => {
                if ticks <= existing.remaining_ticks {
                    return false;
                }
                existing.remaining_ticks = ticks;
                existing.total_duration = duration;
                existing.applied_at = now;
                existing.caster = caster;
                DotApplyOutcome::Refreshed
            }
            Some(_) => return false,
        };

        let stored = self.instances[&target][dot];
        self.events.push(EngineEvent::DotApplied {
            target,
            dot: dot.clone(),
            caster: stored.caster,
            damage_per_tick: stored.damage_per_tick,
            ticks: stored.remaining_ticks,
            outcome,
        });
        true
    }

    /// Advance the clock and fire every DoT whose interval has elapsed (one tick each).
    pub fn tick(&mut self, delta: f32, resolver: &mut dyn DamageResolver) {
        if delta.is_finite() && delta > 0.0 {
            self.now += delta;
        }
        let now = self.now;

        for (target, dots) in self.instances.iter_mut() {
            for (id, instance) in dots.iter_mut() {
                if now - instance.last_tick + TIME_EPSILON < instance.tick_interval {
                    continue;
                }
                resolver.apply_damage(instance.caster, *target, instance.damage_per_tick, id);
                instance.remaining_ticks = instance.remaining_ticks.saturating_sub(1);
                instance.last_tick += instance.tick_interval;
                self.events.push(EngineEvent::DotTicked {
                    target: *target,
                    dot: id.clone(),
                    caster: instance.caster,
                    damage: instance.damage_per_tick,
                    remaining_ticks: instance.remaining_ticks,
                });
            }

            let events = &mut self.events;
            dots.retain(|id, instance| {
                if instance.remaining_ticks > 0 {
                    return true;
                }
                events.push(EngineEvent::DotRemoved {
                    target: *target,
                    dot: id.clone(),
                    reason: RemovalReason::Expired,
                });
                false
            });
        }
        self.instances.retain(|_, dots| !dots.is_empty());
    }

    /// Remove one DoT (dispel). Returns whether it existed.
    pub fn remove(&mut self, target: UnitId, dot: &AbilityId) -> bool {
        let Some(dots) = self.instances.get_mut(&target) else {
            return false;
        };
        let removed = dots.remove(dot).is_some();
        if dots.is_empty() {
            self.instances.remove(&target);
        }
        if removed {
            self.events.push(EngineEvent::DotRemoved {
                target,
                dot: dot.clone(),
                reason: RemovalReason::Explicit,
            });
        }
        removed
    }

    /// Remove every DoT on a target (death). Returns how many were removed.
    pub fn clear_target(&mut self, target: UnitId) -> usize {
        let Some(dots) = self.instances.remove(&target) else {
            return 0;
        };
        let count = dots.len();
        for dot in dots.into_keys() {
            self.events.push(EngineEvent::DotRemoved {
                target,
                dot,
                reason: RemovalReason::TargetDied,
            });
        }
        count
    }

    pub fn get(&self, target: UnitId, dot: &AbilityId) -> Option<&DotInstance> {
        self.instances.get(&target).and_then(|dots| dots.get(dot))
    }

    pub fn has_dot(&self, target: UnitId, dot: &AbilityId) -> bool {
        self.get(target, dot).is_some()
    }

    pub fn dots_on(&self, target: UnitId) -> impl Iterator<Item = (&AbilityId, &DotInstance)> {
        self.instances.get(&target).into_iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, EngineEvent> {
        self.events.drain(..)
    }

    pub fn snapshot(&self) -> DotSnapshot {
        DotSnapshot {
            now: self.now,
            instances: self.instances.clone(),
        }
    }
}
