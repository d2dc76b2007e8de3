use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use storyline_protocol::{Character, SharedStr, TimeRange, TimelineEvent};
use thiserror::Error;

use crate::config::TimelineConfig;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("invalid project JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate character id {0:?}")]
    DuplicateCharacter(SharedStr),
    #[error("characters {first:?} and {second:?} share order {order}")]
    DuplicateOrder {
        order: i64,
        first: SharedStr,
        second: SharedStr,
    },
    #[error("duplicate event id {0:?}")]
    DuplicateEvent(SharedStr),
    #[error("event {event_id:?} has invalid range {start}..{end}")]
    InvalidRange {
        event_id: SharedStr,
        start: f64,
        end: f64,
    },
    #[error("event {0:?} has no participants")]
    NoParticipants(SharedStr),
    #[error("no event with id {0:?}")]
    UnknownEvent(SharedStr),
    #[error("config field {field} has invalid value {value}")]
    InvalidConfig { field: &'static str, value: f64 },
}

/// A timeline document: the characters, their events, and layout tuning.
///
/// Stands in for the remote store. Participants may reference characters
/// that do not exist; those are filtered out when lanes are laid out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub events: Vec<TimelineEvent>,
    #[serde(default)]
    pub config: TimelineConfig,
}

impl Project {
    /// Parse and validate a project document.
    pub fn from_json(data: &[u8]) -> Result<Self, ProjectError> {
        let project: Project = serde_json::from_slice(data)?;
        project.validate()?;
        Ok(project)
    }

    pub fn to_json_pretty(&self) -> Result<String, ProjectError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ProjectError> {
        if let Some((field, value)) = self.config.invalid_field() {
            return Err(ProjectError::InvalidConfig { field, value });
        }

        let mut ids = HashSet::new();
        let mut orders: HashMap<i64, &SharedStr> = HashMap::new();
        for character in &self.characters {
            if !ids.insert(&character.id) {
                return Err(ProjectError::DuplicateCharacter(character.id.clone()));
            }
            if let Some(first) = orders.insert(character.order, &character.id) {
                return Err(ProjectError::DuplicateOrder {
                    order: character.order,
                    first: first.clone(),
                    second: character.id.clone(),
                });
            }
        }

        let mut event_ids = HashSet::new();
        for event in &self.events {
            if !event_ids.insert(&event.id) {
                return Err(ProjectError::DuplicateEvent(event.id.clone()));
            }
            check_range(&event.id, event.range(), self.config.min_duration)?;
            if event.participant_ids.is_empty() {
                return Err(ProjectError::NoParticipants(event.id.clone()));
            }
        }
        Ok(())
    }

    pub fn event(&self, event_id: &str) -> Option<&TimelineEvent> {
        self.events.iter().find(|e| e.id.as_str() == event_id)
    }

    /// Store a committed range on an event.
    pub fn apply_commit(&mut self, event_id: &str, range: TimeRange) -> Result<(), ProjectError> {
        let min_duration = self.config.min_duration;
        let event = self
            .events
            .iter_mut()
            .find(|e| e.id.as_str() == event_id)
            .ok_or_else(|| ProjectError::UnknownEvent(event_id.into()))?;
        check_range(&event.id, range, min_duration)?;
        event.set_range(range);
        Ok(())
    }

    /// Latest end time across all events, or 0 for an empty project.
    pub fn end_time(&self) -> f64 {
        self.events.iter().map(|e| e.end_time).fold(0.0, f64::max)
    }

    /// Earliest start time across all events, or 0 for an empty project.
    pub fn start_time(&self) -> f64 {
        self.events
            .iter()
            .map(|e| e.start_time)
            .reduce(f64::min)
            .unwrap_or(0.0)
    }
}

/// Ranges must be finite, non-negative, and at least `min_duration` long.
///
/// The length check allows a few ulps at the range's magnitude, since a
/// resize clamped to exactly `min_duration` rounds when added to a large
/// start time.
fn check_range(
    event_id: &SharedStr,
    range: TimeRange,
    min_duration: f64,
) -> Result<(), ProjectError> {
    let slack = 4.0 * f64::EPSILON * range.end.abs();
    let valid = range.start.is_finite()
        && range.end.is_finite()
        && range.start >= 0.0
        && range.start < range.end
        && range.end - range.start + slack >= min_duration;
    if valid {
        Ok(())
    } else {
        Err(ProjectError::InvalidRange {
            event_id: event_id.clone(),
            start: range.start,
            end: range.end,
        })
    }
}
