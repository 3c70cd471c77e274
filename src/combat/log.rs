//! Combat logging
//!
//! Records engine events and host actions for post-run analysis. Each entry keeps
//! a human-readable message and, for engine events, the typed event itself.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::events::EngineEvent;
use super::units::UnitId;

/// Directory used when no output path is given.
pub const DEFAULT_LOG_DIR: &str = "match_logs";

/// A single entry in the combat log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatLogEntry {
    /// Tick on which the entry was recorded
    pub tick: u32,
    /// Simulated seconds since the start of the encounter
    pub timestamp: f32,
    pub event_type: CombatLogEventType,
    pub message: String,
    /// The engine event behind this entry, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<EngineEvent>,
}

/// Types of combat log events for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatLogEventType {
    Damage,
    Healing,
    AbilityUsed,
    Cooldown,
    /// DoT, beacon or buff applied
    StatusApplied,
    /// DoT, beacon or buff removed
    StatusRemoved,
    Death,
    /// Encounter start, end, etc.
    MatchEvent,
}

/// Failure while writing the log to disk.
#[derive(Debug, Error)]
pub enum LogSaveError {
    #[error("failed to write combat log to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize combat log: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct CombatLogFile<'a, M: Serialize> {
    summary: &'a M,
    entries: &'a [CombatLogEntry],
}

/// The combat log resource storing all events
#[derive(Resource, Default, Debug)]
pub struct CombatLog {
    /// All log entries in chronological order
    pub entries: Vec<CombatLogEntry>,
    pub tick: u32,
    pub match_time: f32,
    names: BTreeMap<UnitId, String>,
}

impl CombatLog {
    /// Clear the log for a new encounter
    pub fn clear(&mut self) {
        self.entries.clear();
        self.tick = 0;
        self.match_time = 0.0;
    }

    /// Remember a display name for messages.
    pub fn register_unit(&mut self, id: UnitId, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    /// Display name of a unit, falling back to its id.
    pub fn name_of(&self, id: UnitId) -> String {
        self.names.get(&id).cloned().unwrap_or_else(|| id.to_string())
    }

    pub fn set_time(&mut self, tick: u32, match_time: f32) {
        self.tick = tick;
        self.match_time = match_time;
    }

    /// Add a new entry to the log
    pub fn log(&mut self, event_type: CombatLogEventType, message: String) {
        self.push(event_type, message, None);
    }

    fn push(&mut self, event_type: CombatLogEventType, message: String, event: Option<EngineEvent>) {
        self.entries.push(CombatLogEntry {
            tick: self.tick,
            timestamp: self.match_time,
            event_type,
            message,
            event,
        });
    }

    /// Record an engine event with a generated message.
    pub fn record(&mut self, event: &EngineEvent) {
        let (event_type, message) = match event {
            EngineEvent::CooldownUpdated {
                unit,
                ability,
                remaining,
                ..
            } => (
                CombatLogEventType::Cooldown,
                format!("{}'s {} ready in {}", self.name_of(*unit), ability, remaining),
            ),
            EngineEvent::DotApplied {
                target,
                dot,
                caster,
                damage_per_tick,
                ticks,
                outcome,
            } => (
                CombatLogEventType::StatusApplied,
                format!(
                    "{}'s {} on {} ({:?}): {:.0} x {} ticks",
                    self.name_of(*caster),
                    dot,
                    self.name_of(*target),
                    outcome,
                    damage_per_tick,
                    ticks
                ),
            ),
            EngineEvent::DotTicked {
                target,
                dot,
                caster,
                damage,
                ..
            } => (
                CombatLogEventType::Damage,
                format!(
                    "{}'s {} ticks on {} for {:.0}",
                    self.name_of(*caster),
                    dot,
                    self.name_of(*target),
                    damage
                ),
            ),
            EngineEvent::DotRemoved { target, dot, reason } => (
                CombatLogEventType::StatusRemoved,
                format!("{} fades from {} ({:?})", dot, self.name_of(*target), reason),
            ),
            EngineEvent::BeaconApplied {
                caster,
                target,
                redirect_percent,
            } => (
                CombatLogEventType::StatusApplied,
                format!(
                    "{} places a beacon on {} ({:.0}%)",
                    self.name_of(*caster),
                    self.name_of(*target),
                    redirect_percent * 100.0
                ),
            ),
            EngineEvent::BeaconRemoved { caster, target, reason } => (
                CombatLogEventType::StatusRemoved,
                format!(
                    "{}'s beacon on {} ends ({:?})",
                    self.name_of(*caster),
                    self.name_of(*target),
                    reason
                ),
            ),
            EngineEvent::HealingRedirected {
                caster,
                from,
                to,
                amount,
            } => (
                CombatLogEventType::Healing,
                format!(
                    "{}'s beacon copies {:.0} healing from {} to {}",
                    self.name_of(*caster),
                    amount,
                    self.name_of(*from),
                    self.name_of(*to)
                ),
            ),
            EngineEvent::BuffApplied {
                buff,
                caster,
                permanent,
            } => (
                CombatLogEventType::StatusApplied,
                format!(
                    "{} grants {}{}",
                    self.name_of(*caster),
                    buff,
                    if *permanent { " (aura)" } else { "" }
                ),
            ),
            EngineEvent::BuffRemoved { buff, caster, reason } => (
                CombatLogEventType::StatusRemoved,
                format!("{}'s {} ends ({:?})", self.name_of(*caster), buff, reason),
            ),
        };
        self.push(event_type, message, Some(event.clone()));
    }

    /// Get entries filtered by event type
    pub fn filter_by_type(&self, event_type: CombatLogEventType) -> Vec<&CombatLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Get only HP-changing events (damage and healing)
    pub fn hp_changes_only(&self) -> Vec<&CombatLogEntry> {
        self.entries
            .iter()
            .filter(|e| {
                matches!(
                    e.event_type,
                    CombatLogEventType::Damage | CombatLogEventType::Healing
                )
            })
            .collect()
    }

    /// Typed engine events in recording order.
    pub fn engine_events(&self) -> impl Iterator<Item = &EngineEvent> {
        self.entries.iter().filter_map(|e| e.event.as_ref())
    }

    /// Get the last N entries
    pub fn recent(&self, count: usize) -> Vec<&CombatLogEntry> {
        self.entries.iter().rev().take(count).rev().collect()
    }

    /// Write the log plus a summary as pretty JSON. Returns the path written.
    pub fn save_to_file<M: Serialize>(&self, summary: &M, path: Option<&Path>) -> Result<PathBuf, LogSaveError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_log_path(),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| LogSaveError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = CombatLogFile {
            summary,
            entries: &self.entries,
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(&path, json).map_err(|source| LogSaveError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

fn default_log_path() -> PathBuf {
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    Path::new(DEFAULT_LOG_DIR).join(format!("encounter_{}.json", stamp))
}
