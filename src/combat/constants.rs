//! Combat Constants
//!
//! Centralized location for the tuning numbers used by the decision engine.
//! Weights are additive utility points; thresholds are fractions of a pool.

// ============================================================================
// Ticks
// ============================================================================

/// Seconds of simulated time per tick in the reference driver.
pub const TICK_SECONDS: f32 = 1.0;

/// Usage history kept per unit by the cooldown tracker.
pub const USAGE_HISTORY_LEN: usize = 10;

/// Tolerance for clock comparisons so accumulated float deltas still land on tick boundaries.
pub const TIME_EPSILON: f32 = 1e-4;

// ============================================================================
// Damage Over Time
// ============================================================================

/// Tick interval used for DoTs that have no registered definition.
pub const DEFAULT_DOT_TICK_INTERVAL: f32 = 3.0;

/// Duration used for DoTs that have no registered definition and no explicit duration.
pub const DEFAULT_DOT_DURATION: f32 = 12.0;

/// Two DoTs whose per-tick damage differs by less than this are the same strength.
pub const DOT_STRENGTH_EPSILON: f32 = 1e-4;

// ============================================================================
// Health Thresholds
// ============================================================================

/// Self-HP at or above which danger is zero.
pub const DANGER_HIGH_HP: f32 = 0.7;

/// Self-HP at or below which danger is one.
pub const DANGER_CRITICAL_HP: f32 = 0.3;

/// Party member HP fraction below which a member counts as wounded.
pub const WOUNDED_HP_THRESHOLD: f32 = 0.6;

/// Party member HP fraction below which a member counts as critical.
pub const CRITICAL_HP_THRESHOLD: f32 = 0.35;

/// Lowest party HP below which a healer never considers attacking.
pub const SAFE_ATTACK_MIN_HP: f32 = 0.5;

/// Enemy count at which area abilities become worthwhile.
pub const AOE_ENEMY_THRESHOLD: usize = 3;

// ============================================================================
// Scoring Weights
// ============================================================================

/// Ties within this many points of the best score are broken randomly.
pub const SCORE_EPSILON: f32 = 0.5;

pub const EMERGENCY_WEIGHT: f32 = 100.0;
/// Extra emergency weight once self-HP is at or below the critical threshold.
pub const EMERGENCY_CRITICAL_BONUS: f32 = 60.0;
pub const INTERRUPT_WEIGHT: f32 = 80.0;
/// Applied to interrupts when nothing is being cast.
pub const INTERRUPT_IDLE_PENALTY: f32 = 10.0;
pub const MITIGATION_WEIGHT: f32 = 40.0;
pub const AOE_THREAT_WEIGHT: f32 = 45.0;
pub const AOE_THREAT_PER_EXTRA_ENEMY: f32 = 5.0;
pub const AOE_THREAT_SMALL_PULL: f32 = 8.0;
pub const THREAT_WEIGHT: f32 = 35.0;
pub const DAMAGE_WEIGHT: f32 = 20.0;
pub const SINGLE_HEAL_WEIGHT: f32 = 70.0;
pub const SINGLE_HEAL_PER_CRITICAL: f32 = 15.0;
pub const AOE_HEAL_WEIGHT: f32 = 40.0;
pub const AOE_HEAL_PER_WOUNDED: f32 = 12.0;
pub const SHIELD_WEIGHT: f32 = 50.0;
/// Healer damage contribution when the party is judged unsafe.
pub const UNSAFE_DAMAGE_PENALTY: f32 = 100.0;

pub const FALLBACK_BASELINE: f32 = 5.0;
pub const FALLBACK_LOW_RESOURCE_BONUS: f32 = 12.0;

// ============================================================================
// Resource Discipline
// ============================================================================

/// Penalty per unit of cost/max-pool fraction.
pub const RESOURCE_COST_WEIGHT: f32 = 20.0;

/// Pool ratio below which spending is additionally penalized.
pub const LOW_RESOURCE_THRESHOLD: f32 = 0.25;

pub const LOW_RESOURCE_PENALTY: f32 = 15.0;

// ============================================================================
// Status Awareness
// ============================================================================

pub const DOT_ALREADY_TICKING_PENALTY: f32 = 30.0;
pub const BEACON_MISSING_BONUS: f32 = 35.0;
pub const BEACON_ACTIVE_PENALTY: f32 = 60.0;
pub const BUFF_ACTIVE_PENALTY: f32 = 60.0;
pub const BUFF_MISSING_BONUS: f32 = 30.0;

/// Penalty per appearance in the last few casts, for rotation variety.
pub const VARIETY_PENALTY: f32 = 1.5;
pub const VARIETY_WINDOW: usize = 3;

// ============================================================================
// Reference Host
// ============================================================================

/// Mana pool size at level 1, plus `MANA_PER_LEVEL` per level.
pub const MANA_POOL_BASE: f32 = 200.0;
pub const MANA_PER_LEVEL: f32 = 10.0;
/// Mana regenerated per second (before strategy).
pub const MANA_REGEN_PER_SECOND: f32 = 6.0;

pub const ENERGY_POOL: f32 = 100.0;
pub const ENERGY_REGEN_PER_SECOND: f32 = 10.0;

pub const RAGE_POOL: f32 = 100.0;
/// Rage gained per point of damage taken.
pub const RAGE_PER_DAMAGE_TAKEN: f32 = 0.5;
/// Rage gained per point of damage dealt.
pub const RAGE_PER_DAMAGE_DEALT: f32 = 0.25;

/// Bonus damage or healing per point of attack/spell power.
pub const POWER_COEFFICIENT: f32 = 0.1;
