//! Pointer gestures on event blocks: move, resize, or click.
//!
//! Each event owns a [`DragController`]. A press starts a gesture, pointer
//! moves update a preview range, and the release ends it with exactly one
//! outcome: a commit of the new range when the pointer travelled past the
//! drag threshold, otherwise a selection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use storyline_protocol::{SharedStr, TimeRange, TimelineEvent};

use crate::config::TimelineConfig;

/// Which part of an event block the gesture grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragKind {
    /// The body: shifts both ends.
    Move,
    /// The left handle: moves the start.
    ResizeStart,
    /// The right handle: moves the end.
    ResizeEnd,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gesture {
    pub kind: DragKind,
    pub anchor_x: f64,
    pub anchor: TimeRange,
    pub candidate: TimeRange,
    /// Latched once the pointer passes the drag threshold.
    pub moved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(Gesture),
}

/// Result of a finished gesture.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GestureOutcome {
    Commit { event_id: SharedStr, range: TimeRange },
    Select { event_id: SharedStr },
}

/// Receives the outcome of each gesture.
///
/// `commit` is fire-and-forget: the caller has already drawn the candidate
/// geometry and does not wait on the sink.
pub trait GestureSink {
    fn commit(&mut self, event_id: &SharedStr, range: TimeRange);
    fn select(&mut self, event_id: &SharedStr);
}

impl GestureSink for Vec<GestureOutcome> {
    fn commit(&mut self, event_id: &SharedStr, range: TimeRange) {
        self.push(GestureOutcome::Commit {
            event_id: event_id.clone(),
            range,
        });
    }

    fn select(&mut self, event_id: &SharedStr) {
        self.push(GestureOutcome::Select {
            event_id: event_id.clone(),
        });
    }
}

/// Gesture state for a single event.
#[derive(Debug, Clone)]
pub struct DragController {
    event_id: SharedStr,
    min_duration: f64,
    threshold_px: f64,
    state: DragState,
}

impl DragController {
    pub fn new(event_id: impl Into<SharedStr>, config: &TimelineConfig) -> Self {
        Self {
            event_id: event_id.into(),
            min_duration: config.min_duration,
            threshold_px: config.drag_threshold_px,
            state: DragState::Idle,
        }
    }

    pub fn event_id(&self) -> &SharedStr {
        &self.event_id
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// The range to draw while a gesture is in progress.
    pub fn preview(&self) -> Option<TimeRange> {
        match self.state {
            DragState::Dragging(gesture) => Some(gesture.candidate),
            DragState::Idle => None,
        }
    }

    /// Start a gesture anchored at `pointer_x` and the event's `current`
    /// range. Ignored while a gesture is already running.
    pub fn on_pointer_down(&mut self, kind: DragKind, pointer_x: f64, current: TimeRange) -> bool {
        if self.is_dragging() {
            tracing::trace!(event_id = %self.event_id, "pointer down ignored during gesture");
            return false;
        }
        self.state = DragState::Dragging(Gesture {
            kind,
            anchor_x: pointer_x,
            anchor: current,
            candidate: current,
            moved: false,
        });
        true
    }

    /// Recompute the candidate range for a pointer at `pointer_x`, with the
    /// view at `scale` pixels per second.
    pub fn on_pointer_move(&mut self, pointer_x: f64, scale: f64) {
        let DragState::Dragging(gesture) = &mut self.state else {
            return;
        };
        if !scale.is_finite() || scale <= 0.0 {
            tracing::trace!(scale, "pointer move ignored at invalid scale");
            return;
        }

        let dx = pointer_x - gesture.anchor_x;
        if dx.abs() > self.threshold_px {
            gesture.moved = true;
        }
        gesture.candidate =
            candidate_range(gesture.kind, gesture.anchor, dx / scale, self.min_duration);
    }

    /// Finish the gesture and report exactly one outcome to `sink`.
    ///
    /// Returns `None` when no gesture was running.
    pub fn on_pointer_up<S: GestureSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Option<GestureOutcome> {
        let DragState::Dragging(gesture) = std::mem::take(&mut self.state) else {
            return None;
        };

        if gesture.moved {
            tracing::debug!(
                event_id = %self.event_id,
                kind = ?gesture.kind,
                start = gesture.candidate.start,
                end = gesture.candidate.end,
                "committing event range"
            );
            sink.commit(&self.event_id, gesture.candidate);
            Some(GestureOutcome::Commit {
                event_id: self.event_id.clone(),
                range: gesture.candidate,
            })
        } else {
            tracing::debug!(event_id = %self.event_id, "selecting event");
            sink.select(&self.event_id);
            Some(GestureOutcome::Select {
                event_id: self.event_id.clone(),
            })
        }
    }
}

/// Apply a time delta to the anchored range for the given gesture kind.
///
/// Resizes never bring the ends closer than `min_duration`, and no edge is
/// moved before time zero.
fn candidate_range(kind: DragKind, anchor: TimeRange, delta: f64, min_duration: f64) -> TimeRange {
    match kind {
        DragKind::Move => anchor.shifted(delta.max(-anchor.start)),
        DragKind::ResizeStart => {
            let start = (anchor.start + delta)
                .min(anchor.end - min_duration)
                .max(0.0);
            TimeRange::new(start, anchor.end)
        }
        DragKind::ResizeEnd => {
            let end = (anchor.end + delta).max(anchor.start + min_duration);
            TimeRange::new(anchor.start, end)
        }
    }
}

/// One [`DragController`] per event, created on first touch.
#[derive(Debug, Clone, Default)]
pub struct DragControllers {
    config: TimelineConfig,
    controllers: HashMap<SharedStr, DragController>,
}

impl DragControllers {
    pub fn new(config: &TimelineConfig) -> Self {
        Self {
            config: config.clone(),
            controllers: HashMap::new(),
        }
    }

    pub fn controller_mut(&mut self, event_id: &SharedStr) -> &mut DragController {
        let config = &self.config;
        self.controllers
            .entry(event_id.clone())
            .or_insert_with(|| DragController::new(event_id, config))
    }

    /// The controller whose gesture is in progress, if any.
    pub fn active(&self) -> Option<&DragController> {
        self.controllers.values().find(|c| c.is_dragging())
    }

    pub fn active_mut(&mut self) -> Option<&mut DragController> {
        self.controllers.values_mut().find(|c| c.is_dragging())
    }

    /// Copy of `events` with any in-progress preview range substituted.
    pub fn with_previews(&self, events: &[TimelineEvent]) -> Vec<TimelineEvent> {
        events
            .iter()
            .map(|event| {
                let mut event = event.clone();
                if let Some(range) = self
                    .controllers
                    .get(&event.id)
                    .and_then(DragController::preview)
                {
                    event.set_range(range);
                }
                event
            })
            .collect()
    }
}
