//! Zoom and pan state for one timeline surface.

use serde::Serialize;
use storyline_protocol::TimeValue;
use thiserror::Error;

use crate::calendar::SECONDS_PER_DAY;

/// Default zoom: 100 pixels per 30 days.
pub const DEFAULT_SCALE: f64 = 100.0 / (30.0 * SECONDS_PER_DAY as f64);
/// Most zoomed-out scale reachable by `zoom_by`: about 3,000 years per 100px.
pub const MIN_SCALE: f64 = 1e-9;
/// Most zoomed-in scale reachable by `zoom_by`: 1000 pixels per second.
pub const MAX_SCALE: f64 = 1e3;
/// Latest start time reachable by panning, about 30 million years.
pub const MAX_START_TIME: TimeValue = 1e15;

#[derive(Debug, Error, PartialEq)]
pub enum ViewportError {
    #[error("scale must be a positive finite number of pixels per second, got {0}")]
    InvalidScale(f64),
    #[error("start time must be finite, got {0}")]
    InvalidStartTime(f64),
}

/// The visible time window at one instant.
///
/// A snapshot taken from [`ViewportController::window`] for a single draw.
/// It is never stored across a zoom, pan, or resize.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeWindow {
    pub start: TimeValue,
    /// Pixels per second.
    pub scale: f64,
    pub width_px: f64,
}

impl TimeWindow {
    pub fn end(&self) -> TimeValue {
        self.start + self.width_px / self.scale
    }

    pub fn duration(&self) -> TimeValue {
        self.end() - self.start
    }

    pub fn time_to_x(&self, t: TimeValue) -> f64 {
        (t - self.start) * self.scale
    }

    pub fn x_to_time(&self, x: f64) -> TimeValue {
        self.start + x / self.scale
    }
}

/// Owns the zoom scale, the pan offset, and the measured surface width.
///
/// Zooming holds the start time fixed; the window grows or shrinks to the
/// right. The end time is derived on every call and never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportController {
    start_time: TimeValue,
    scale: f64,
    width_px: f64,
}

impl ViewportController {
    pub fn new(start_time: TimeValue, scale: f64) -> Result<Self, ViewportError> {
        let mut viewport = Self::default();
        viewport.set_scale(scale)?;
        viewport.set_start_time(start_time)?;
        Ok(viewport)
    }

    pub fn start_time(&self) -> TimeValue {
        self.start_time
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn width(&self) -> f64 {
        self.width_px
    }

    pub fn end_time(&self) -> TimeValue {
        self.window().end()
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time,
            scale: self.scale,
            width_px: self.width_px,
        }
    }

    pub fn set_scale(&mut self, scale: f64) -> Result<(), ViewportError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ViewportError::InvalidScale(scale));
        }
        self.scale = scale;
        Ok(())
    }

    /// Pan so the left edge shows `t`. Times before the epoch clamp to 0 and
    /// times past [`MAX_START_TIME`] clamp to it.
    pub fn set_start_time(&mut self, t: TimeValue) -> Result<(), ViewportError> {
        if !t.is_finite() {
            return Err(ViewportError::InvalidStartTime(t));
        }
        self.start_time = t.clamp(0.0, MAX_START_TIME);
        Ok(())
    }

    /// Record the measured surface width. Invalid measurements count as 0.
    pub fn on_resize(&mut self, width_px: f64) {
        self.width_px = if width_px.is_finite() {
            width_px.max(0.0)
        } else {
            0.0
        };
    }

    /// Multiply the scale by `factor`, keeping the start time in place.
    ///
    /// The result is held between [`MIN_SCALE`] and [`MAX_SCALE`], so repeated
    /// zooming stops at the limit instead of failing. Only a factor that is
    /// not positive and finite is an error.
    pub fn zoom_by(&mut self, factor: f64) -> Result<(), ViewportError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ViewportError::InvalidScale(self.scale * factor));
        }
        let lo = MIN_SCALE.min(self.scale);
        let hi = MAX_SCALE.max(self.scale);
        self.set_scale((self.scale * factor).clamp(lo, hi))
    }

    /// Pan by a pixel distance; positive moves later in time.
    pub fn pan_by_pixels(&mut self, dx: f64) -> Result<(), ViewportError> {
        self.set_start_time(self.start_time + dx / self.scale)
    }

    pub fn time_to_x(&self, t: TimeValue) -> f64 {
        self.window().time_to_x(t)
    }

    pub fn x_to_time(&self, x: f64) -> TimeValue {
        self.window().x_to_time(x)
    }
}

impl Default for ViewportController {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            scale: DEFAULT_SCALE,
            width_px: 0.0,
        }
    }
}
