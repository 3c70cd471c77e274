//! Contextual signals read by the scoring functions.

use crate::combat::constants::{
    AOE_ENEMY_THRESHOLD, CRITICAL_HP_THRESHOLD, DANGER_CRITICAL_HP, DANGER_HIGH_HP, SAFE_ATTACK_MIN_HP,
    WOUNDED_HP_THRESHOLD,
};
use crate::combat::units::{HealthSnapshot, Unit, UnitId};

use super::CombatContext;

/// Linear danger ramp: 0.0 at or above `DANGER_HIGH_HP`, 1.0 at or below `DANGER_CRITICAL_HP`.
pub fn danger(health_pct: f32) -> f32 {
    ((DANGER_HIGH_HP - health_pct) / (DANGER_HIGH_HP - DANGER_CRITICAL_HP)).clamp(0.0, 1.0)
}

/// Health picture of the party, as a healer sees it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PartyMetrics {
    pub lowest_hp: f32,
    pub lowest: Option<UnitId>,
    pub average_hp: f32,
    /// Members below `WOUNDED_HP_THRESHOLD`
    pub wounded: usize,
    /// Members below `CRITICAL_HP_THRESHOLD`
    pub critical: usize,
    pub safe_to_attack: bool,
}

impl PartyMetrics {
    pub fn from_party(party: &[HealthSnapshot]) -> Self {
        let living: Vec<&HealthSnapshot> = party.iter().filter(|m| m.health > 0.0).collect();
        if living.is_empty() {
            return Self {
                lowest_hp: 1.0,
                lowest: None,
                average_hp: 1.0,
                wounded: 0,
                critical: 0,
                safe_to_attack: true,
            };
        }

        let mut lowest_hp = f32::INFINITY;
        let mut lowest = None;
        let mut total = 0.0;
        let mut wounded = 0;
        let mut critical = 0;
        for member in &living {
            let pct = member.health_pct();
            if pct < lowest_hp {
                lowest_hp = pct;
                lowest = Some(member.id);
            }
            total += pct;
            if pct < WOUNDED_HP_THRESHOLD {
                wounded += 1;
            }
            if pct < CRITICAL_HP_THRESHOLD {
                critical += 1;
            }
        }

        Self {
            lowest_hp,
            lowest,
            average_hp: total / living.len() as f32,
            wounded,
            critical,
            safe_to_attack: critical == 0 && lowest_hp >= SAFE_ATTACK_MIN_HP,
        }
    }
}

/// Size of the fight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncounterMetrics {
    pub enemy_count: usize,
    pub aoe_warranted: bool,
}

impl EncounterMetrics {
    pub fn from_enemies(enemies: &[HealthSnapshot]) -> Self {
        let enemy_count = enemies.iter().filter(|e| e.health > 0.0).count();
        Self {
            enemy_count,
            aoe_warranted: enemy_count >= AOE_ENEMY_THRESHOLD,
        }
    }
}

/// Everything a decision looks at, computed once per decision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Signals {
    pub self_hp: f32,
    pub danger: f32,
    pub target_casting: bool,
    pub party: PartyMetrics,
    pub encounter: EncounterMetrics,
}

impl Signals {
    pub fn gather(unit: &Unit, ctx: &CombatContext) -> Self {
        let self_hp = unit.health_pct();
        Self {
            self_hp,
            danger: danger(self_hp),
            target_casting: ctx.target.is_some_and(|t| t.is_casting),
            party: PartyMetrics::from_party(ctx.party),
            encounter: EncounterMetrics::from_enemies(ctx.enemies),
        }
    }

    /// Self HP is in the critical band.
    pub fn self_critical(&self) -> bool {
        self.self_hp < DANGER_CRITICAL_HP
    }
}
