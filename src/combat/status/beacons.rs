//! Beacon healing redirection
//!
//! A beacon binds a caster to one ally. Healing landing on that ally is copied,
//! scaled by the redirect percent, onto the beacon's target. Each caster owns at
//! most one beacon; casting a new one supersedes the old one.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::combat::constants::TIME_EPSILON;
use crate::combat::events::{EngineEvent, RemovalReason};
use crate::combat::units::UnitId;

/// An active beacon.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Beacon {
    pub caster: UnitId,
    pub target: UnitId,
    /// Fraction of healing redirected (0.0 to 1.0)
    pub redirect_percent: f32,
    /// Ledger time at which the beacon expires
    pub expires_at: f32,
}

/// Result of routing one heal through the beacons.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HealRedirect {
    pub redirected_amount: f32,
    pub beacon_caster: Option<UnitId>,
    pub beacon_target: Option<UnitId>,
}

impl HealRedirect {
    pub fn none() -> Self {
        Self {
            redirected_amount: 0.0,
            beacon_caster: None,
            beacon_target: None,
        }
    }
}

/// Active beacons in caster-insertion order.
#[derive(Resource, Debug, Default)]
pub struct BeaconLedger {
    beacons: Vec<Beacon>,
    now: f32,
    events: Vec<EngineEvent>,
}

/// Serializable view of the ledger.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BeaconSnapshot {
    pub now: f32,
    pub beacons: Vec<Beacon>,
}

impl BeaconLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f32 {
        self.now
    }

    /// Install a beacon from `caster` on `target`. Always succeeds.
    pub fn apply(&mut self, caster: UnitId, target: UnitId, redirect_percent: f32, duration: f32) -> bool {
        let redirect_percent = if redirect_percent.is_finite() {
            redirect_percent.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let expires_at = self.now + if duration.is_finite() { duration.max(0.0) } else { 0.0 };

        if let Some(index) = self.beacons.iter().position(|b| b.caster == caster) {
            if self.beacons[index].target == target {
                let beacon = &mut self.beacons[index];
                beacon.redirect_percent = redirect_percent;
                beacon.expires_at = expires_at;
                self.events.push(EngineEvent::BeaconApplied {
                    caster,
                    target,
                    redirect_percent,
                });
                return true;
            }
            let old = self.beacons.remove(index);
            self.events.push(EngineEvent::BeaconRemoved {
                caster,
                target: old.target,
                reason: RemovalReason::Replaced,
            });
        }

        self.beacons.push(Beacon {
            caster,
            target,
            redirect_percent,
            expires_at,
        });
        self.events.push(EngineEvent::BeaconApplied {
            caster,
            target,
            redirect_percent,
        });
        true
    }

    /// Route a heal landing on `original_target`. At most one beacon redirects.
    pub fn redirect_healing(&mut self, original_target: UnitId, amount: f32) -> HealRedirect {
        if !amount.is_finite() || amount <= 0.0 {
            return HealRedirect::none();
        }
        let Some(beacon) = self.beacons.iter().find(|b| b.target == original_target) else {
            return HealRedirect::none();
        };

        let redirect = HealRedirect {
            redirected_amount: amount * beacon.redirect_percent,
            beacon_caster: Some(beacon.caster),
            beacon_target: Some(beacon.target),
        };
        self.events.push(EngineEvent::HealingRedirected {
            caster: beacon.caster,
            from: original_target,
            to: beacon.target,
            amount: redirect.redirected_amount,
        });
        redirect
    }

    /// Advance the clock and drop expired beacons.
    pub fn tick(&mut self, delta: f32) {
        if delta.is_finite() && delta > 0.0 {
            self.now += delta;
        }
        let now = self.now;
        let events = &mut self.events;
        self.beacons.retain(|beacon| {
            if beacon.expires_at > now + TIME_EPSILON {
                return true;
            }
            events.push(EngineEvent::BeaconRemoved {
                caster: beacon.caster,
                target: beacon.target,
                reason: RemovalReason::Expired,
            });
            false
        });
    }

    /// Explicitly remove a caster's beacon.
    pub fn remove(&mut self, caster: UnitId) -> bool {
        self.remove_with_reason(caster, RemovalReason::Explicit)
    }

    /// Remove a caster's beacon, tagging the removal (caster death, party leave).
    pub fn remove_with_reason(&mut self, caster: UnitId, reason: RemovalReason) -> bool {
        let Some(index) = self.beacons.iter().position(|b| b.caster == caster) else {
            return false;
        };
        let old = self.beacons.remove(index);
        self.events.push(EngineEvent::BeaconRemoved {
            caster,
            target: old.target,
            reason,
        });
        true
    }

    /// Drop every beacon bound to `target` (target death). Returns how many were removed.
    pub fn clear_target(&mut self, target: UnitId) -> usize {
        let events = &mut self.events;
        let before = self.beacons.len();
        self.beacons.retain(|beacon| {
            if beacon.target != target {
                return true;
            }
            events.push(EngineEvent::BeaconRemoved {
                caster: beacon.caster,
                target,
                reason: RemovalReason::TargetDied,
            });
            false
        });
        before - self.beacons.len()
    }

    pub fn beacon_of(&self, caster: UnitId) -> Option<&Beacon> {
        self.beacons.iter().find(|b| b.caster == caster)
    }

    pub fn beacons(&self) -> &[Beacon] {
        &self.beacons
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, EngineEvent> {
        self.events.drain(..)
    }

    pub fn snapshot(&self) -> BeaconSnapshot {
        BeaconSnapshot {
            now: self.now,
            beacons: self.beacons.clone(),
        }
    }
}
