use serde::{Deserialize, Serialize};

use crate::shared_str::SharedStr;

/// Seconds since the calendar epoch (year 0, January 1, 00:00:00).
///
/// The only time unit in the system. Values are never negative.
pub type TimeValue = f64;

/// A character owning one lane on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: SharedStr,
    pub name: SharedStr,
    /// Unique sort key; visible characters are laid out by ascending order.
    pub order: i64,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl Character {
    pub fn new(id: impl Into<SharedStr>, name: impl Into<SharedStr>, order: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            order,
            visible: true,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// A narrative event placed on the time axis.
///
/// An event spans one or more characters. Participants that are hidden or
/// unknown simply do not contribute geometry when the timeline is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: SharedStr,
    pub title: SharedStr,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: TimeValue,
    pub end_time: TimeValue,
    pub participant_ids: Vec<SharedStr>,
}

impl TimelineEvent {
    pub fn new(
        id: impl Into<SharedStr>,
        title: impl Into<SharedStr>,
        range: TimeRange,
        participant_ids: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            start_time: range.start,
            end_time: range.end,
            participant_ids: participant_ids.iter().map(|&p| SharedStr::from(p)).collect(),
        }
    }

    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }

    pub fn set_range(&mut self, range: TimeRange) {
        self.start_time = range.start;
        self.end_time = range.end;
    }

    pub fn duration(&self) -> TimeValue {
        self.end_time - self.start_time
    }
}

/// A `[start, end]` pair of time values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: TimeValue,
    pub end: TimeValue,
}

impl TimeRange {
    pub fn new(start: TimeValue, end: TimeValue) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> TimeValue {
        self.end - self.start
    }

    /// Shift both ends by `delta`.
    pub fn shifted(&self, delta: TimeValue) -> Self {
        Self::new(self.start + delta, self.end + delta)
    }
}
