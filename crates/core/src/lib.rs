//! Core of the storyline timeline: calendar arithmetic, the viewport,
//! ruler tick planning, character-lane layout, and drag gestures.
//!
//! Everything here is renderer-agnostic. Views produce
//! [`storyline_protocol::RenderCommand`] lists that the terminal, web, and
//! SVG front ends draw.

pub mod calendar;
pub mod config;
pub mod drag;
pub mod model;
pub mod svg;
pub mod viewport;
pub mod views;

pub use calendar::{CalendarDate, CalendarError};
pub use config::TimelineConfig;
pub use drag::{DragController, DragKind, DragState, GestureOutcome, GestureSink};
pub use model::{Project, ProjectError, TimelineSession};
pub use viewport::{TimeWindow, ViewportController, ViewportError};
