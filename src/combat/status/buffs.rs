//! Party-wide buffs
//!
//! One entry per buff id, shared by the whole party. Re-applying a buff
//! overwrites the previous entry (caster and expiry). Entries with no expiry are
//! permanent auras; they only go away through `clear_by_caster`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::combat::catalog::{AbilityCatalog, BuffDefinition};
use crate::combat::constants::TIME_EPSILON;
use crate::combat::events::{EngineEvent, RemovalReason};
use crate::combat::units::{BuffId, StatKind, UnitId};

/// An active party buff.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartyBuff {
    pub caster: UnitId,
    pub modifiers: BTreeMap<StatKind, f32>,
    /// Ledger time of expiry, `None` when permanent
    pub expires_at: Option<f32>,
}

impl PartyBuff {
    fn is_live(&self, now: f32) -> bool {
        self.expires_at.map_or(true, |at| at > now + TIME_EPSILON)
    }
}

#[derive(Resource, Debug, Default)]
pub struct PartyBuffLedger {
    definitions: BTreeMap<BuffId, BuffDefinition>,
    active: BTreeMap<BuffId, PartyBuff>,
    now: f32,
    events: Vec<EngineEvent>,
}

/// Serializable view of the ledger.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BuffSnapshot {
    pub now: f32,
    pub active: BTreeMap<BuffId, PartyBuff>,
}

impl PartyBuffLedger {
    pub fn new(definitions: BTreeMap<BuffId, BuffDefinition>) -> Self {
        Self {
            definitions,
            ..Default::default()
        }
    }

    pub fn from_catalog(catalog: &AbilityCatalog) -> Self {
        Self::new(
            catalog
                .buffs()
                .map(|(id, def)| (id.clone(), def.clone()))
                .collect(),
        )
    }

    pub fn now(&self) -> f32 {
        self.now
    }

    /// Apply `buff` from `caster`. A negative effective duration makes it permanent.
    pub fn apply(&mut self, buff: &BuffId, caster: UnitId, duration: Option<f32>) -> bool {
        let Some(def) = self.definitions.get(buff) else {
            warn!("Unknown party buff `{}` applied by unit {}", buff, caster);
            return false;
        };

        let duration = duration.unwrap_or(def.duration);
        let expires_at = if duration < 0.0 {
            None
        } else if duration.is_finite() {
            Some(self.now + duration)
        } else {
            warn!("Party buff `{}` has non-finite duration; ignoring", buff);
            return false;
        };

        self.active.insert(
            buff.clone(),
            PartyBuff {
                caster,
                modifiers: def.modifiers.clone(),
                expires_at,
            },
        );
        self.events.push(EngineEvent::BuffApplied {
            buff: buff.clone(),
            caster,
            permanent: expires_at.is_none(),
        });
        true
    }

    /// Active buffs, expiring stale entries first.
    pub fn get_active(&mut self) -> impl Iterator<Item = (&BuffId, &PartyBuff)> {
        self.expire();
        self.active.iter()
    }

    /// Whether `buff` is applied and not yet expired.
    pub fn is_active(&self, buff: &BuffId) -> bool {
        self.active.get(buff).is_some_and(|entry| entry.is_live(self.now))
    }

    pub fn get(&self, buff: &BuffId) -> Option<&PartyBuff> {
        self.active.get(buff).filter(|entry| entry.is_live(self.now))
    }

    /// Sum of every live buff's modifiers, per stat.
    pub fn aggregate_stat_modifiers(&self) -> BTreeMap<StatKind, f32> {
        let mut totals = BTreeMap::new();
        for entry in self.active.values().filter(|entry| entry.is_live(self.now)) {
            for (stat, value) in &entry.modifiers {
                *totals.entry(*stat).or_insert(0.0) += value;
            }
        }
        totals
    }

    /// Drop every buff cast by `caster`. Returns how many were removed.
    pub fn clear_by_caster(&mut self, caster: UnitId) -> usize {
        let events = &mut self.events;
        let before = self.active.len();
        self.active.retain(|buff, entry| {
            if entry.caster != caster {
                return true;
            }
            events.push(EngineEvent::BuffRemoved {
                buff: buff.clone(),
                caster,
                reason: RemovalReason::CasterGone,
            });
            false
        });
        before - self.active.len()
    }

    /// Advance the clock and expire timed buffs.
    pub fn tick(&mut self, delta: f32) {
        if delta.is_finite() && delta > 0.0 {
            self.now += delta;
        }
        self.expire();
    }

    fn expire(&mut self) {
        let now = self.now;
        let events = &mut self.events;
        self.active.retain(|buff, entry| {
            if entry.is_live(now) {
                return true;
            }
            events.push(EngineEvent::BuffRemoved {
                buff: buff.clone(),
                caster: entry.caster,
                reason: RemovalReason::Expired,
            });
            false
        });
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, EngineEvent> {
        self.events.drain(..)
    }

    pub fn snapshot(&self) -> BuffSnapshot {
        BuffSnapshot {
            now: self.now,
            active: self.active.clone(),
        }
    }
}
