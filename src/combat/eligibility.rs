//! Eligibility Resolver
//!
//! Turns a unit's class kit into the list of abilities it may cast this tick.
//! The universal fallback is appended last and is never gated, so the list is
//! never empty.

use bevy::prelude::*;
use smallvec::SmallVec;

use super::catalog::{AbilityCatalog, AbilityDefinition};
use super::cooldowns::CooldownTracker;
use super::resources::ResourceLedger;
use super::units::{AbilityId, Unit};

/// Why a candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
    OnCooldown,
    LevelTooLow,
    WrongSpec,
    CannotAfford,
}

/// Read-only view over the collaborators needed to gate abilities.
#[derive(Clone, Copy)]
pub struct EligibilityResolver<'a> {
    catalog: &'a AbilityCatalog,
    cooldowns: &'a CooldownTracker,
    resources: Option<&'a ResourceLedger>,
}

impl<'a> EligibilityResolver<'a> {
    pub fn new(
        catalog: &'a AbilityCatalog,
        cooldowns: &'a CooldownTracker,
        resources: Option<&'a ResourceLedger>,
    ) -> Self {
        Self {
            catalog,
            cooldowns,
            resources,
        }
    }

    /// Castable ability ids for `unit`, in kit order with the fallback last.
    pub fn eligible_abilities(&self, unit: &Unit) -> Vec<AbilityId> {
        let basic_attack = self.catalog.basic_attack();

        let mut candidates: SmallVec<[&AbilityId; 16]> = SmallVec::new();
        match self.catalog.class_kit(unit.class) {
            Some(kit) => {
                let spec_list = kit.specs.get(&unit.spec).map(Vec::as_slice).unwrap_or(&[]);
                for id in kit.core.iter().chain(spec_list) {
                    if id != basic_attack && !candidates.contains(&id) {
                        candidates.push(id);
                    }
                }
            }
            None => warn!("No class kit for {:?}; unit {} only has the fallback", unit.class, unit.id),
        }

        let mut eligible: Vec<AbilityId> = candidates
            .into_iter()
            .filter(|id| match self.catalog.get(id) {
                Some(def) => self.check(unit, def).is_ok(),
                None => {
                    warn!("Unknown ability `{}` in {:?} kit", id, unit.class);
                    false
                }
            })
            .cloned()
            .collect();
        eligible.push(basic_attack.clone());
        eligible
    }

    /// Gate a single definition for a unit. The fallback always passes.
    pub fn check(&self, unit: &Unit, def: &AbilityDefinition) -> Result<(), Ineligibility> {
        if def.id == *self.catalog.basic_attack() {
            return Ok(());
        }
        if !self.cooldowns.is_ready(unit.id, &def.id) {
            return Err(Ineligibility::OnCooldown);
        }
        if unit.level < def.min_level {
            return Err(Ineligibility::LevelTooLow);
        }
        if !def.spec_requirements.is_empty() && !def.spec_requirements.contains(&unit.spec) {
            return Err(Ineligibility::WrongSpec);
        }
        if let (Some(ledger), Some(kind)) = (self.resources, def.resource) {
            if def.cost > 0.0 && !ledger.can_afford(unit.id, kind, def.cost) {
                return Err(Ineligibility::CannotAfford);
            }
        }
        Ok(())
    }
}
