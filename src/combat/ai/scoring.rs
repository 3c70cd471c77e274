//! Utility scoring for tank and healer decisions.
//!
//! A score is the sum of the contributions of every role tag on the ability,
//! minus resource discipline, adjusted for status effects already in place.

use crate::combat::catalog::{AbilityDefinition, AbilityRole};
use crate::combat::constants::*;
use crate::combat::units::{Role, Unit};

use super::signals::{danger, Signals};
use super::{AbilityAi, CombatContext};

impl<'a> AbilityAi<'a> {
    /// Full utility score of one candidate.
    pub(super) fn score(&self, unit: &Unit, ctx: &CombatContext, signals: &Signals, def: &AbilityDefinition) -> f32 {
        let mut score: f32 = def
            .roles
            .iter()
            .map(|role| role_contribution(*role, unit, signals, def))
            .sum();

        score -= self.resource_penalty(unit, def);
        if def.is_fallback() && self.resources_low(unit) {
            score += FALLBACK_LOW_RESOURCE_BONUS;
        }
        score += self.status_adjustment(unit, ctx, signals, def);

        if !def.is_fallback() {
            let recent = self.cooldowns.recent_use_count(unit.id, &def.id, VARIETY_WINDOW);
            score -= VARIETY_PENALTY * recent as f32;
        }
        score
    }

    /// Cost as a fraction of the pool, plus a flat penalty when the pool is low.
    fn resource_penalty(&self, unit: &Unit, def: &AbilityDefinition) -> f32 {
        if def.ignores_resource_penalty() || def.cost <= 0.0 {
            return 0.0;
        }
        let (Some(ledger), Some(kind)) = (self.resources, def.resource) else {
            return 0.0;
        };
        let Some(pool) = ledger.pool(unit.id, kind) else {
            return 0.0;
        };
        if pool.max <= 0.0 {
            return 0.0;
        }

        let mut penalty = RESOURCE_COST_WEIGHT * (def.cost / pool.max).min(1.0);
        if pool.ratio() < LOW_RESOURCE_THRESHOLD {
            penalty += LOW_RESOURCE_PENALTY;
        }
        penalty
    }

    fn resources_low(&self, unit: &Unit) -> bool {
        self.resources
            .and_then(|ledger| ledger.primary_pool(unit.id))
            .is_some_and(|(_, pool)| pool.ratio() < LOW_RESOURCE_THRESHOLD)
    }

    /// Rewards and penalties from DoTs, beacons and buffs already in place.
    ///
    /// Setup bonuses for a missing beacon or buff are withheld while an ally is critical.
    pub(super) fn status_adjustment(
        &self,
        unit: &Unit,
        ctx: &CombatContext,
        signals: &Signals,
        def: &AbilityDefinition,
    ) -> f32 {
        let mut adjustment = 0.0;
        let setup_bonus = |bonus: f32| if signals.party.critical > 0 { 0.0 } else { bonus };

        if def.dot.is_some() {
            if let (Some(dots), Some(target)) = (self.dots, ctx.target) {
                if dots.get(target.id, &def.id).is_some_and(|dot| dot.remaining_ticks > 1) {
                    adjustment -= DOT_ALREADY_TICKING_PENALTY;
                }
            }
        }

        if def.beacon.is_some() {
            if let Some(beacons) = self.beacons {
                adjustment += if beacons.beacon_of(unit.id).is_some() {
                    -BEACON_ACTIVE_PENALTY
                } else {
                    setup_bonus(BEACON_MISSING_BONUS)
                };
            }
        }

        if let (Some(buff), Some(buffs)) = (&def.buff, self.buffs) {
            adjustment += if buffs.is_active(buff) {
                -BUFF_ACTIVE_PENALTY
            } else {
                setup_bonus(BUFF_MISSING_BONUS)
            };
        }

        adjustment
    }
}

fn role_contribution(role: AbilityRole, unit: &Unit, signals: &Signals, def: &AbilityDefinition) -> f32 {
    let party = &signals.party;
    let encounter = &signals.encounter;

    match role {
        AbilityRole::EmergencyDefensive => {
            let critical = if signals.self_critical() { EMERGENCY_CRITICAL_BONUS } else { 0.0 };
            EMERGENCY_WEIGHT * signals.danger + critical
        }
        AbilityRole::Interrupt => {
            if signals.target_casting {
                INTERRUPT_WEIGHT
            } else {
                -INTERRUPT_IDLE_PENALTY
            }
        }
        AbilityRole::Mitigation => MITIGATION_WEIGHT * (0.5 + 0.5 * signals.danger),
        AbilityRole::AoeThreat => {
            if encounter.aoe_warranted {
                let extra = encounter.enemy_count - AOE_ENEMY_THRESHOLD;
                AOE_THREAT_WEIGHT + AOE_THREAT_PER_EXTRA_ENEMY * extra as f32
            } else if encounter.enemy_count > 1 {
                AOE_THREAT_SMALL_PULL
            } else {
                0.0
            }
        }
        AbilityRole::Threat => {
            if unit.role == Role::Tank && encounter.enemy_count > 0 {
                THREAT_WEIGHT
            } else {
                0.0
            }
        }
        AbilityRole::SingleHeal => {
            SINGLE_HEAL_WEIGHT * (1.0 - party.lowest_hp) + SINGLE_HEAL_PER_CRITICAL * party.critical as f32
        }
        AbilityRole::AoeHeal => {
            AOE_HEAL_WEIGHT * (1.0 - party.average_hp)
                + AOE_HEAL_PER_WOUNDED * party.wounded.saturating_sub(1) as f32
        }
        AbilityRole::Shield => SHIELD_WEIGHT * danger(party.lowest_hp).max(signals.danger),
        AbilityRole::Damage => {
            if encounter.enemy_count == 0 {
                0.0
            } else if unit.role == Role::Healer && !party.safe_to_attack && !def.is_heal() {
                DAMAGE_WEIGHT - UNSAFE_DAMAGE_PENALTY
            } else {
                DAMAGE_WEIGHT
            }
        }
        AbilityRole::Fallback => FALLBACK_BASELINE,
    }
}
