//! Ordered-priority decisions for damage dealers and unassigned units.

use bevy::prelude::*;

use crate::combat::catalog::{AbilityDefinition, AbilityRole};
use crate::combat::units::{AbilityId, Unit};

use super::signals::Signals;
use super::{AbilityAi, CombatContext};

impl<'a> AbilityAi<'a> {
    /// Emergency survival, then interrupt-if-casting, then the class priority list,
    /// then the first damage ability, then the fallback.
    pub(super) fn choose_by_priority(
        &self,
        unit: &Unit,
        ctx: &CombatContext,
        signals: &Signals,
        candidates: &[&AbilityDefinition],
    ) -> Option<AbilityId> {
        if signals.self_critical() {
            if let Some(def) = candidates.iter().find(|d| d.has_role(AbilityRole::EmergencyDefensive)) {
                debug!("{} uses emergency {}", unit.name, def.id);
                return Some(def.id.clone());
            }
        }

        if signals.target_casting {
            if let Some(def) = candidates.iter().find(|d| d.has_role(AbilityRole::Interrupt)) {
                debug!("{} interrupts with {}", unit.name, def.id);
                return Some(def.id.clone());
            }
        }

        if let Some(kit) = self.catalog.class_kit(unit.class) {
            for id in &kit.priority {
                let Some(def) = candidates.iter().find(|d| d.id == *id) else {
                    continue;
                };
                if self.situational_only(def) || self.redundant(unit, ctx, def) {
                    continue;
                }
                return Some(def.id.clone());
            }
        }

        candidates
            .iter()
            .find(|d| {
                d.has_role(AbilityRole::Damage)
                    && !d.is_fallback()
                    && !self.situational_only(d)
                    && !self.redundant(unit, ctx, d)
            })
            .or_else(|| candidates.iter().find(|d| d.is_fallback()))
            .map(|d| d.id.clone())
    }

    /// Emergency and interrupt abilities are only taken through their own triggers.
    fn situational_only(&self, def: &AbilityDefinition) -> bool {
        def.has_role(AbilityRole::EmergencyDefensive) || def.has_role(AbilityRole::Interrupt)
    }

    /// Casting would only refresh something already in place.
    fn redundant(&self, unit: &Unit, ctx: &CombatContext, def: &AbilityDefinition) -> bool {
        if def.dot.is_some() {
            if let (Some(dots), Some(target)) = (self.dots, ctx.target) {
                if dots.get(target.id, &def.id).is_some_and(|dot| dot.remaining_ticks > 1) {
                    return true;
                }
            }
        }
        if def.beacon.is_some() && self.beacons.is_some_and(|b| b.beacon_of(unit.id).is_some()) {
            return true;
        }
        if let (Some(buff), Some(buffs)) = (&def.buff, self.buffs) {
            if buffs.is_active(buff) {
                return true;
            }
        }
        false
    }
}
