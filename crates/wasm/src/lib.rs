use std::sync::Mutex;

use serde::Serialize;
use storyline_core::calendar::{self, CalendarDate};
use storyline_core::model::TimelineSession;
use storyline_core::views::ruler;
use wasm_bindgen::prelude::*;

static SESSIONS: Mutex<Vec<TimelineSession>> = Mutex::new(Vec::new());

fn js_err(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(js_err)
}

/// Run `f` against the session behind `handle`.
fn with_session<T>(
    handle: usize,
    f: impl FnOnce(&mut TimelineSession) -> Result<T, JsError>,
) -> Result<T, JsError> {
    let mut sessions = SESSIONS
        .lock()
        .map_err(|_| JsError::new("session registry poisoned"))?;
    let session = sessions
        .get_mut(handle)
        .ok_or_else(|| JsError::new("invalid session handle"))?;
    f(session)
}

/// Decode seconds since year 0 into a calendar date, as JSON.
#[wasm_bindgen]
pub fn decode_time(seconds: f64) -> Result<String, JsError> {
    let date = calendar::decode(seconds).map_err(js_err)?;
    to_json(&date)
}

/// Encode a JSON calendar date. Out-of-range fields are clamped first.
#[wasm_bindgen]
pub fn encode_time(date_json: &str) -> Result<f64, JsError> {
    let date: CalendarDate = serde_json::from_str(date_json).map_err(js_err)?;
    Ok(calendar::encode(date.normalized()))
}

/// Weekday of a date, 0 = Sunday.
#[wasm_bindgen]
pub fn day_of_week(year: u32, month: u32, day: u32) -> u32 {
    calendar::day_of_week(year, month, day)
}

/// Plan ruler ticks for a window, returned as JSON.
#[wasm_bindgen]
pub fn plan_ticks(start: f64, end: f64, scale: f64) -> Result<String, JsError> {
    let plan = ruler::plan_ticks(start, end, scale).map_err(js_err)?;
    to_json(&plan)
}

/// Parse and validate a project (JSON). Returns a handle for later calls.
#[wasm_bindgen]
pub fn load_project(data: &[u8]) -> Result<usize, JsError> {
    let session = TimelineSession::from_json(data).map_err(js_err)?;
    let mut sessions = SESSIONS
        .lock()
        .map_err(|_| JsError::new("session registry poisoned"))?;
    sessions.push(session);
    Ok(sessions.len() - 1)
}

/// The project behind a handle, including committed edits, as JSON.
#[wasm_bindgen]
pub fn project_json(handle: usize) -> Result<String, JsError> {
    with_session(handle, |s| to_json(s.project()))
}

/// Set the visible window: start time, pixels per second, and surface width.
#[wasm_bindgen]
pub fn set_view(handle: usize, start: f64, scale: f64, width: f64) -> Result<(), JsError> {
    with_session(handle, |s| {
        let viewport = s.viewport_mut();
        viewport.on_resize(width);
        viewport.set_scale(scale).map_err(js_err)?;
        viewport.set_start_time(start).map_err(js_err)
    })
}

/// Fit every event into a surface `width` pixels wide. Returns the window as
/// JSON.
#[wasm_bindgen]
pub fn fit_view(handle: usize, width: f64) -> Result<String, JsError> {
    with_session(handle, |s| {
        s.viewport_mut().on_resize(width);
        s.fit_to_events().map_err(js_err)?;
        to_json(&s.viewport().window())
    })
}

/// Event blocks for the current view, as JSON.
#[wasm_bindgen]
pub fn layout_events(handle: usize) -> Result<String, JsError> {
    with_session(handle, |s| to_json(&s.layout()))
}

/// Render commands for the ruler and lanes, as JSON.
#[wasm_bindgen]
pub fn render_timeline(handle: usize, height: f64) -> Result<String, JsError> {
    with_session(handle, |s| {
        let commands = s.render(height).map_err(js_err)?;
        to_json(&commands)
    })
}

/// Press at surface coordinates. Returns the hit (or `null`) as JSON.
#[wasm_bindgen]
pub fn pointer_down(handle: usize, x: f64, y: f64) -> Result<String, JsError> {
    with_session(handle, |s| to_json(&s.pointer_down(x, y)))
}

#[wasm_bindgen]
pub fn pointer_move(handle: usize, x: f64) -> Result<(), JsError> {
    with_session(handle, |s| {
        s.pointer_move(x);
        Ok(())
    })
}

/// Release the pointer. Returns the gesture outcome (or `null`) as JSON, or
/// an error when the project refuses the edit.
#[wasm_bindgen]
pub fn pointer_up(handle: usize) -> Result<String, JsError> {
    with_session(handle, |s| {
        let outcome = s.pointer_up().map_err(js_err)?;
        to_json(&outcome)
    })
}

/// Scroll the lanes by `dy` pixels on a surface `height` tall. Returns the
/// new offset.
#[wasm_bindgen]
pub fn scroll_lanes(handle: usize, dy: f64, height: f64) -> Result<f64, JsError> {
    with_session(handle, |s| Ok(s.scroll_lanes(dy, height)))
}
