//! Units, identifiers and the party roster
//!
//! The roster is the "Unit/Party accessor" collaborator: it owns the party's stat
//! snapshots. The decision engine only ever reads it; health is changed by a
//! [`DamageResolver`](super::resolver::DamageResolver).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies any combat participant (party member or hostile).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies an ability in the catalog. DoTs are keyed by the ability that applies them.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityId(String);

impl AbilityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AbilityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a party buff definition. Buff ids are unique across the whole party.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuffId(String);

impl BuffId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BuffId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for BuffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Combat role. Tanks and healers are driven by full utility scoring; everyone
/// else uses the ordered priority list.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Role {
    Tank,
    Healer,
    Damage,
    #[default]
    Unassigned,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Tank => "Tank",
            Role::Healer => "Healer",
            Role::Damage => "Damage",
            Role::Unassigned => "Unassigned",
        }
    }
}

/// Available unit classes
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum UnitClass {
    Warrior,
    Paladin,
    Priest,
    Rogue,
    Mage,
    Warlock,
}

impl UnitClass {
    /// Get all available classes
    pub fn all() -> &'static [UnitClass] {
        &[
            UnitClass::Warrior,
            UnitClass::Paladin,
            UnitClass::Priest,
            UnitClass::Rogue,
            UnitClass::Mage,
            UnitClass::Warlock,
        ]
    }

    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            UnitClass::Warrior => "Warrior",
            UnitClass::Paladin => "Paladin",
            UnitClass::Priest => "Priest",
            UnitClass::Rogue => "Rogue",
            UnitClass::Mage => "Mage",
            UnitClass::Warlock => "Warlock",
        }
    }

    /// Parse a display name back into a class.
    pub fn from_name(name: &str) -> Option<UnitClass> {
        Self::all().iter().copied().find(|class| class.name() == name)
    }
}

/// Stats that party buffs can modify.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum StatKind {
    Strength,
    Agility,
    Intellect,
    Stamina,
    Spirit,
    Armor,
    AttackPower,
    SpellPower,
    CritChance,
    Haste,
}

/// A party member and its current stat snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub role: Role,
    pub class: UnitClass,
    pub spec: String,
    pub level: u32,
    pub health: f32,
    pub max_health: f32,
    #[serde(default)]
    pub attributes: BTreeMap<StatKind, f32>,
}

impl Unit {
    pub fn new(id: UnitId, name: impl Into<String>, class: UnitClass, spec: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            class,
            spec: spec.into(),
            level: 1,
            health: 100.0,
            max_health: 100.0,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_health(mut self, health: f32, max_health: f32) -> Self {
        self.max_health = max_health.max(0.0);
        self.health = health.clamp(0.0, self.max_health);
        self
    }

    /// Health as a fraction (0.0 to 1.0)
    pub fn health_pct(&self) -> f32 {
        if self.max_health > 0.0 {
            (self.health / self.max_health).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Attribute value including the supplied buff bonuses.
    pub fn effective_stat(&self, stat: StatKind, bonuses: &BTreeMap<StatKind, f32>) -> f32 {
        self.attributes.get(&stat).copied().unwrap_or(0.0) + bonuses.get(&stat).copied().unwrap_or(0.0)
    }
}

/// The party roster resource.
#[derive(Resource, Clone, Debug, Default, Serialize, Deserialize)]
pub struct PartyRoster {
    members: Vec<Unit>,
}

impl PartyRoster {
    pub fn new(members: Vec<Unit>) -> Self {
        Self { members }
    }

    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.members.iter().find(|unit| unit.id == id)
    }

    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.members.iter_mut().find(|unit| unit.id == id)
    }

    pub fn members(&self) -> &[Unit] {
        &self.members
    }

    pub fn alive(&self) -> impl Iterator<Item = &Unit> {
        self.members.iter().filter(|unit| unit.is_alive())
    }

    pub fn any_alive(&self) -> bool {
        self.members.iter().any(Unit::is_alive)
    }

    /// Health snapshots of every living member, in roster order.
    pub fn health_snapshots(&self) -> Vec<HealthSnapshot> {
        self.alive().map(HealthSnapshot::from).collect()
    }

    /// Remove a member (party leave). Returns the removed unit.
    pub fn remove(&mut self, id: UnitId) -> Option<Unit> {
        let index = self.members.iter().position(|unit| unit.id == id)?;
        Some(self.members.remove(index))
    }
}

/// Read-only health view of a combat participant, used in decision contexts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HealthSnapshot {
    pub id: UnitId,
    pub health: f32,
    pub max_health: f32,
}

impl HealthSnapshot {
    pub fn new(id: UnitId, health: f32, max_health: f32) -> Self {
        Self { id, health, max_health }
    }

    /// Health as a fraction (0.0 to 1.0)
    pub fn health_pct(&self) -> f32 {
        if self.max_health > 0.0 {
            (self.health / self.max_health).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl From<&Unit> for HealthSnapshot {
    fn from(unit: &Unit) -> Self {
        Self::new(unit.id, unit.health, unit.max_health)
    }
}
