//! JSON configuration parsing for headless mode
//!
//! Describes one encounter: the party, the enemies, the resource strategy and the
//! tick budget.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::combat::catalog::AbilityCatalog;
use crate::combat::resources::Strategy;
use crate::combat::units::{Role, StatKind, UnitClass};

/// Largest supported party.
pub const MAX_PARTY_SIZE: usize = 5;

/// Failure while loading or validating a headless config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One party member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyMemberConfig {
    pub name: String,
    pub class: UnitClass,
    /// Specialization name as used by the class kit (e.g. "holy")
    #[serde(default)]
    pub spec: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default = "default_max_health")]
    pub max_health: f32,
    /// Base attribute values (attack power, spell power, ...)
    #[serde(default)]
    pub attributes: BTreeMap<StatKind, f32>,
}

/// One hostile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyConfig {
    pub name: String,
    pub max_health: f32,
    /// Melee damage per tick against the party's tank
    #[serde(default)]
    pub damage: f32,
    /// Begin an interruptible cast every N ticks
    #[serde(default)]
    pub cast_interval: Option<u32>,
    /// Damage to every party member when a cast completes
    #[serde(default)]
    pub cast_damage: f32,
}

/// Headless encounter configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlessConfig {
    /// Party composition (1-5 members)
    pub party: Vec<PartyMemberConfig>,
    /// Hostiles (at least one)
    pub enemies: Vec<EnemyConfig>,
    /// Regeneration pacing for the whole party
    #[serde(default)]
    pub strategy: Strategy,
    /// Tick budget before the encounter times out (default: 300)
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u32,
    /// Random seed for deterministic reproduction
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Custom output path for the combat log (optional)
    #[serde(default)]
    pub output_path: Option<String>,
    /// Custom ability catalog (RON); the built-in catalog is used otherwise
    #[serde(default)]
    pub catalog_path: Option<String>,
}

fn default_level() -> u32 {
    1
}

fn default_max_health() -> f32 {
    100.0
}

fn default_max_ticks() -> u32 {
    300
}

impl HeadlessConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Parse and validate a JSON document
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: HeadlessConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.party.is_empty() || self.party.len() > MAX_PARTY_SIZE {
            return Err(invalid(format!("party must have 1-{} members", MAX_PARTY_SIZE)));
        }
        if self.enemies.is_empty() {
            return Err(invalid("at least one enemy is required".to_string()));
        }

        for member in &self.party {
            if member.name.trim().is_empty() {
                return Err(invalid("party member with an empty name".to_string()));
            }
            if member.level == 0 {
                return Err(invalid(format!("{}: level must be at least 1", member.name)));
            }
            check_health(&member.name, member.max_health)?;
        }

        for enemy in &self.enemies {
            if enemy.name.trim().is_empty() {
                return Err(invalid("enemy with an empty name".to_string()));
            }
            check_health(&enemy.name, enemy.max_health)?;
            if !enemy.damage.is_finite() || enemy.damage < 0.0 {
                return Err(invalid(format!("{}: damage must be non-negative", enemy.name)));
            }
            if !enemy.cast_damage.is_finite() || enemy.cast_damage < 0.0 {
                return Err(invalid(format!("{}: cast_damage must be non-negative", enemy.name)));
            }
        }

        if self.max_ticks == 0 {
            return Err(invalid("max_ticks must be positive".to_string()));
        }

        Ok(())
    }

    /// Check every member's spec against the class kits of `catalog`.
    ///
    /// Classes without specializations accept any spec.
    pub fn check_specs(&self, catalog: &AbilityCatalog) -> Result<(), ConfigError> {
        for member in &self.party {
            let Some(kit) = catalog.class_kit(member.class) else {
                continue;
            };
            if !kit.specs.is_empty() && !kit.specs.contains_key(&member.spec) {
                let valid: Vec<&str> = kit.specs.keys().map(String::as_str).collect();
                return Err(invalid(format!(
                    "{}: unknown {} spec '{}'. Valid specs: {}",
                    member.name,
                    member.class.name(),
                    member.spec,
                    valid.join(", ")
                )));
            }
        }
        Ok(())
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid(message)
}

fn check_health(name: &str, max_health: f32) -> Result<(), ConfigError> {
    if !max_health.is_finite() || max_health <= 0.0 {
        return Err(invalid(format!("{}: max_health must be positive", name)));
    }
    Ok(())
}
