//! Engine events
//!
//! Every ledger queues typed events instead of talking to a UI bus. The tick
//! driver drains them once per tick and forwards them to the combat log and to
//! Bevy's event queue.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::units::{AbilityId, BuffId, UnitId};

/// Reason a status effect was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalReason {
    /// Duration expired (or ran out of ticks)
    Expired,
    /// Replaced by a new application
    Replaced,
    /// Removed by an explicit call (dispel, cancel)
    Explicit,
    /// The affected unit died
    TargetDied,
    /// The caster died or left the party
    CasterGone,
}

/// How an `apply_dot` call changed the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DotApplyOutcome {
    Created,
    Replaced,
    Refreshed,
}

/// Event emitted by the decision engine's ledgers.
#[derive(Event, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    CooldownUpdated {
        unit: UnitId,
        ability: AbilityId,
        remaining: u32,
        max_cooldown: u32,
    },
    DotApplied {
        target: UnitId,
        dot: AbilityId,
        caster: UnitId,
        damage_per_tick: f32,
        ticks: u32,
        outcome: DotApplyOutcome,
    },
    DotTicked {
        target: UnitId,
        dot: AbilityId,
        caster: UnitId,
        damage: f32,
        remaining_ticks: u32,
    },
    DotRemoved {
        target: UnitId,
        dot: AbilityId,
        reason: RemovalReason,
    },
    BeaconApplied {
        caster: UnitId,
        target: UnitId,
        redirect_percent: f32,
    },
    BeaconRemoved {
        caster: UnitId,
        target: UnitId,
        reason: RemovalReason,
    },
    HealingRedirected {
        caster: UnitId,
        from: UnitId,
        to: UnitId,
        amount: f32,
    },
    BuffApplied {
        buff: BuffId,
        caster: UnitId,
        permanent: bool,
    },
    BuffRemoved {
        buff: BuffId,
        caster: UnitId,
        reason: RemovalReason,
    },
}

/// Event fired when the AI picks an ability for a unit
#[derive(Event, Debug, Clone, PartialEq)]
pub struct AbilityChosenEvent {
    pub caster: UnitId,
    pub ability: AbilityId,
    /// Current target when the decision was made
    pub target: Option<UnitId>,
}
