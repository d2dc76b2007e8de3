//! Layout and interaction tuning for a timeline surface.
//!
//! Every field has a named default and may be overridden from the optional
//! `config` section of a project document.

use serde::{Deserialize, Serialize};

/// Height of one character lane in pixels.
pub const LANE_HEIGHT: f64 = 80.0;
/// Narrowest an event block is ever drawn, in pixels.
pub const MIN_EVENT_WIDTH: f64 = 20.0;
/// Width of the grab zone at each end of an event block, in pixels.
pub const RESIZE_HANDLE_PX: f64 = 6.0;
/// Shortest duration a resize can produce, in seconds.
pub const MIN_DURATION: f64 = 0.1;
/// Pointer travel beyond which a press becomes a drag instead of a click.
pub const DRAG_THRESHOLD_PX: f64 = 2.0;

/// Minimum on-screen spacing for each ruler granularity, in pixels.
pub const DAY_TICK_MIN_PX: f64 = 40.0;
pub const MONTH_TICK_MIN_PX: f64 = 50.0;
pub const YEAR_TICK_MIN_PX: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub lane_height: f64,
    pub min_event_width: f64,
    pub resize_handle_px: f64,
    pub min_duration: f64,
    pub drag_threshold_px: f64,
    pub tick_thresholds: TickThresholds,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            lane_height: LANE_HEIGHT,
            min_event_width: MIN_EVENT_WIDTH,
            resize_handle_px: RESIZE_HANDLE_PX,
            min_duration: MIN_DURATION,
            drag_threshold_px: DRAG_THRESHOLD_PX,
            tick_thresholds: TickThresholds::default(),
        }
    }
}

impl TimelineConfig {
    /// First field outside its valid range, with its value.
    ///
    /// Sizes, tick thresholds, and `min_duration` must be finite and
    /// positive. The drag threshold and resize handle width may be zero.
    pub fn invalid_field(&self) -> Option<(&'static str, f64)> {
        let thresholds = &self.tick_thresholds;
        let positive = [
            ("lane_height", self.lane_height),
            ("min_event_width", self.min_event_width),
            ("min_duration", self.min_duration),
            ("tick_thresholds.day_px", thresholds.day_px),
            ("tick_thresholds.month_px", thresholds.month_px),
            ("tick_thresholds.year_px", thresholds.year_px),
        ];
        let non_negative = [
            ("resize_handle_px", self.resize_handle_px),
            ("drag_threshold_px", self.drag_threshold_px),
        ];
        positive
            .into_iter()
            .find(|&(_, value)| !(value.is_finite() && value > 0.0))
            .or_else(|| {
                non_negative
                    .into_iter()
                    .find(|&(_, value)| !(value.is_finite() && value >= 0.0))
            })
    }
}

/// Legibility thresholds used to pick the ruler granularity.
///
/// A granularity is chosen when one of its units is wider on screen than
/// its threshold; the finest qualifying unit wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickThresholds {
    pub day_px: f64,
    pub month_px: f64,
    pub year_px: f64,
}

impl Default for TickThresholds {
    fn default() -> Self {
        Self {
            day_px: DAY_TICK_MIN_PX,
            month_px: MONTH_TICK_MIN_PX,
            year_px: YEAR_TICK_MIN_PX,
        }
    }
}
