//! Data-Driven Ability Catalog
//!
//! Ability, class kit and party buff definitions are loaded from
//! `assets/config/abilities.ron`. Every optional field is resolved once at load
//! time (ids filled in, classification tags derived from the effect kind when the
//! data does not list them) so nothing downstream re-applies defaults per read.
//!
//! ## Usage
//! ```ignore
//! let catalog = AbilityCatalog::builtin()?;
//! let def = catalog.definition_for(UnitClass::Priest, &"flash_heal".into());
//! ```

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::units::{AbilityId, BuffId, StatKind, UnitClass};

/// Catalog embedded at compile time, used by [`AbilityCatalog::builtin`].
const BUILTIN_CATALOG: &str = include_str!("../../assets/config/abilities.ron");

/// Default on-disk location of the catalog.
pub const DEFAULT_CATALOG_PATH: &str = "assets/config/abilities.ron";

/// Id of the universal fallback ability every unit can always use.
pub const BASIC_ATTACK: &str = "basic_attack";

/// What an ability does when it resolves.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum AbilityEffectKind {
    Attack,
    Heal,
    AoeHeal,
    HealAttack,
    Shield,
    Interrupt,
    Dot,
    DotAttack,
    DotHeal,
}

/// Resource pools a unit can spend.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Regenerates steadily. Casters start full.
    Mana,
    /// Regenerates quickly, small pool.
    Energy,
    /// Starts empty, generated by taking damage.
    Rage,
}

/// Spell schools
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SpellSchool {
    Physical,
    Holy,
    Shadow,
    Fire,
    Frost,
    Arcane,
    Nature,
    /// No spell school
    None,
}

/// Classification tag used by the utility AI.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum AbilityRole {
    /// Survival cooldowns (Shield Wall, Divine Shield, Ice Block)
    EmergencyDefensive,
    Interrupt,
    /// Single-target damage reduction (Shield Block)
    Mitigation,
    AoeThreat,
    Threat,
    SingleHeal,
    AoeHeal,
    Shield,
    Damage,
    Fallback,
}

impl AbilityRole {
    /// Roles inferred from the effect kind when the data lists none.
    pub fn defaults_for(kind: AbilityEffectKind) -> Vec<AbilityRole> {
        match kind {
            AbilityEffectKind::Attack | AbilityEffectKind::Dot | AbilityEffectKind::DotAttack => {
                vec![AbilityRole::Damage]
            }
            AbilityEffectKind::Heal | AbilityEffectKind::DotHeal => vec![AbilityRole::SingleHeal],
            AbilityEffectKind::AoeHeal => vec![AbilityRole::AoeHeal],
            AbilityEffectKind::HealAttack => vec![AbilityRole::SingleHeal, AbilityRole::Damage],
            AbilityEffectKind::Shield => vec![AbilityRole::Shield],
            AbilityEffectKind::Interrupt => vec![AbilityRole::Interrupt],
        }
    }
}

/// DoT payload of an ability.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DotEffect {
    pub damage_per_tick: f32,
    /// Total duration in seconds
    pub duration: f32,
    /// Seconds between ticks
    pub tick_interval: f32,
}

/// Beacon payload of an ability.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeaconEffect {
    /// Fraction of other healing redirected (0.0 to 1.0)
    pub redirect_percent: f32,
    /// Duration in seconds
    pub duration: f32,
}

fn default_min_level() -> u32 {
    1
}

fn default_school() -> SpellSchool {
    SpellSchool::None
}

/// Complete ability definition loaded from RON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AbilityDefinition {
    /// Filled from the map key at load time
    #[serde(skip)]
    pub id: AbilityId,
    /// Display name of the ability
    pub name: String,
    pub kind: AbilityEffectKind,

    // === Cost & Gating ===
    /// Pool the cost is paid from (None = free)
    #[serde(default)]
    pub resource: Option<ResourceKind>,
    #[serde(default)]
    pub cost: f32,
    /// Cooldown after cast in ticks
    #[serde(default)]
    pub cooldown: u32,
    #[serde(default = "default_min_level")]
    pub min_level: u32,
    /// Specs allowed to use this ability (empty = any spec)
    #[serde(default)]
    pub spec_requirements: Vec<String>,
    #[serde(default = "default_school")]
    pub school: SpellSchool,

    // === Classification ===
    /// Explicit AI tags; derived from `kind` when empty
    #[serde(default)]
    pub roles: Vec<AbilityRole>,

    // === Effects ===
    /// Base damage or healing
    #[serde(default)]
    pub amount: f32,
    #[serde(default)]
    pub dot: Option<DotEffect>,
    #[serde(default)]
    pub beacon: Option<BeaconEffect>,
    /// Party buff applied on cast
    #[serde(default)]
    pub buff: Option<BuffId>,
}

impl AbilityDefinition {
    pub fn has_role(&self, role: AbilityRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_fallback(&self) -> bool {
        self.id.as_str() == BASIC_ATTACK || self.has_role(AbilityRole::Fallback)
    }

    /// Emergency and interrupt abilities ignore resource discipline.
    pub fn ignores_resource_penalty(&self) -> bool {
        self.has_role(AbilityRole::EmergencyDefensive) || self.has_role(AbilityRole::Interrupt)
    }

    /// Returns true if this ability deals damage on cast
    pub fn is_damage(&self) -> bool {
        matches!(
            self.kind,
            AbilityEffectKind::Attack
                | AbilityEffectKind::HealAttack
                | AbilityEffectKind::DotAttack
                | AbilityEffectKind::Interrupt
        )
    }

    /// Returns true if this ability heals on cast
    pub fn is_heal(&self) -> bool {
        matches!(
            self.kind,
            AbilityEffectKind::Heal
                | AbilityEffectKind::AoeHeal
                | AbilityEffectKind::HealAttack
                | AbilityEffectKind::DotHeal
        )
    }

    fn resolve_defaults(&mut self, id: &AbilityId) {
        self.id = id.clone();
        if self.roles.is_empty() {
            self.roles = AbilityRole::defaults_for(self.kind);
        }
        if id.as_str() == BASIC_ATTACK && !self.roles.contains(&AbilityRole::Fallback) {
            self.roles.push(AbilityRole::Fallback);
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("name is empty".to_string());
        }
        if !self.cost.is_finite() || self.cost < 0.0 {
            return Err(format!("cost must be a non-negative number, got {}", self.cost));
        }
        if self.cost > 0.0 && self.resource.is_none() {
            return Err("has a cost but no resource type".to_string());
        }
        if matches!(self.kind, AbilityEffectKind::Dot | AbilityEffectKind::DotAttack) && self.dot.is_none() {
            return Err("DoT ability has no dot payload".to_string());
        }
        if let Some(dot) = &self.dot {
            let finite = dot.tick_interval.is_finite() && dot.duration.is_finite() && dot.damage_per_tick.is_finite();
            if !finite || dot.tick_interval <= 0.0 || dot.duration <= 0.0 || dot.damage_per_tick < 0.0 {
                return Err("dot payload needs positive duration/interval and non-negative damage".to_string());
            }
        }
        if let Some(beacon) = &self.beacon {
            if !(0.0..=1.0).contains(&beacon.redirect_percent) {
                return Err(format!("beacon redirect_percent {} outside [0, 1]", beacon.redirect_percent));
            }
        }
        Ok(())
    }
}

/// Abilities available to one class.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClassKit {
    /// Abilities every spec of the class has
    #[serde(default)]
    pub core: Vec<AbilityId>,
    /// Additional abilities per spec
    #[serde(default)]
    pub specs: BTreeMap<String, Vec<AbilityId>>,
    /// Ordered priority list for priority-driven roles
    #[serde(default)]
    pub priority: Vec<AbilityId>,
    /// Permanent party auras the class brings into combat
    #[serde(default)]
    pub auras: Vec<BuffId>,
}

impl ClassKit {
    fn contains(&self, ability: &AbilityId) -> bool {
        self.core.contains(ability) || self.specs.values().any(|list| list.contains(ability))
    }

    fn referenced_abilities(&self) -> impl Iterator<Item = &AbilityId> {
        self.core
            .iter()
            .chain(self.specs.values().flatten())
            .chain(self.priority.iter())
    }
}

/// Static party buff definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuffDefinition {
    pub name: String,
    /// Seconds; negative means permanent
    pub duration: f32,
    #[serde(default)]
    pub modifiers: BTreeMap<StatKind, f32>,
}

/// Root structure for the abilities.ron file
#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub abilities: BTreeMap<AbilityId, AbilityDefinition>,
    #[serde(default)]
    pub classes: BTreeMap<UnitClass, ClassKit>,
    #[serde(default)]
    pub buffs: BTreeMap<BuffId, BuffDefinition>,
}

/// Errors raised while loading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("catalog has no `basic_attack` fallback ability")]
    MissingFallback,
    #[error("class {class:?} references unknown ability `{ability}`")]
    UnknownAbility { class: UnitClass, ability: AbilityId },
    #[error("`{owner}` references unknown buff `{buff}`")]
    UnknownBuff { owner: String, buff: BuffId },
    #[error("ability `{ability}` is invalid: {reason}")]
    InvalidAbility { ability: AbilityId, reason: String },
}

/// Resource containing all ability, class and buff definitions.
#[derive(Resource, Debug)]
pub struct AbilityCatalog {
    abilities: BTreeMap<AbilityId, AbilityDefinition>,
    classes: BTreeMap<UnitClass, ClassKit>,
    buffs: BTreeMap<BuffId, BuffDefinition>,
    basic_attack: AbilityId,
}

impl AbilityCatalog {
    /// Build from a parsed config, resolving defaults and validating references.
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        let CatalogConfig {
            mut abilities,
            classes,
            buffs,
        } = config;

        for (id, def) in abilities.iter_mut() {
            def.resolve_defaults(id);
        }

        let catalog = Self {
            abilities,
            classes,
            buffs,
            basic_attack: AbilityId::from(BASIC_ATTACK),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_ron_str(contents: &str) -> Result<Self, CatalogError> {
        let config: CatalogConfig = ron::from_str(contents)?;
        Self::new(config)
    }

    /// Load from a RON file on disk.
    pub fn load_from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_ron_str(&contents)?;
        info!(
            "Loaded {} ability definitions for {} classes from {}",
            catalog.abilities.len(),
            catalog.classes.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_ron_str(BUILTIN_CATALOG)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if !self.abilities.contains_key(&self.basic_attack) {
            return Err(CatalogError::MissingFallback);
        }

        for (id, def) in &self.abilities {
            def.validate().map_err(|reason| CatalogError::InvalidAbility {
                ability: id.clone(),
                reason,
            })?;
            if let Some(buff) = &def.buff {
                if !self.buffs.contains_key(buff) {
                    return Err(CatalogError::UnknownBuff {
                        owner: id.to_string(),
                        buff: buff.clone(),
                    });
                }
            }
        }

        for (class, kit) in &self.classes {
            if let Some(missing) = kit.referenced_abilities().find(|id| !self.abilities.contains_key(id)) {
                return Err(CatalogError::UnknownAbility {
                    class: *class,
                    ability: missing.clone(),
                });
            }
            if let Some(missing) = kit.auras.iter().find(|id| !self.buffs.contains_key(id)) {
                return Err(CatalogError::UnknownBuff {
                    owner: class.name().to_string(),
                    buff: missing.clone(),
                });
            }
        }

        Ok(())
    }

    /// Get a definition regardless of class.
    pub fn get(&self, ability: &AbilityId) -> Option<&AbilityDefinition> {
        self.abilities.get(ability)
    }

    /// Get a definition as seen by a class: the ability must be in the class kit,
    /// or be the universal fallback.
    pub fn definition_for(&self, class: UnitClass, ability: &AbilityId) -> Option<&AbilityDefinition> {
        if *ability == self.basic_attack {
            return self.abilities.get(ability);
        }
        let kit = self.classes.get(&class)?;
        if kit.contains(ability) {
            self.abilities.get(ability)
        } else {
            None
        }
    }

    pub fn basic_attack(&self) -> &AbilityId {
        &self.basic_attack
    }

    pub fn class_kit(&self, class: UnitClass) -> Option<&ClassKit> {
        self.classes.get(&class)
    }

    pub fn buff(&self, buff: &BuffId) -> Option<&BuffDefinition> {
        self.buffs.get(buff)
    }

    pub fn buffs(&self) -> impl Iterator<Item = (&BuffId, &BuffDefinition)> {
        self.buffs.iter()
    }

    /// Every ability with a DoT payload, for registering tick schedules.
    pub fn dot_definitions(&self) -> impl Iterator<Item = (&AbilityId, &DotEffect)> {
        self.abilities
            .iter()
            .filter_map(|(id, def)| def.dot.as_ref().map(|dot| (id, dot)))
    }

    /// Get all ability ids that are defined
    pub fn ability_ids(&self) -> impl Iterator<Item = &AbilityId> {
        self.abilities.keys()
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }
}
