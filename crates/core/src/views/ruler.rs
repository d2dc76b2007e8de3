use serde::Serialize;
use storyline_protocol::{
    Point, Rect, RenderCommand, SharedStr, TextAlign, ThemeToken, TimeValue, Viewport,
};

use crate::calendar::{self, CalendarDate, CalendarError, SECONDS_PER_DAY};
use crate::config::TickThresholds;

pub const RULER_HEIGHT: f64 = 32.0;
const TICK_HEIGHT: f64 = 8.0;
const FONT_SIZE: f64 = 11.0;
const LABEL_Y: f64 = 16.0;

/// Upper bound on ticks produced by one plan.
pub const MAX_TICKS: usize = 4096;

/// Month width used when comparing against the month threshold.
const APPROX_DAYS_PER_MONTH: f64 = 30.0;
const DAYS_PER_YEAR: f64 = 365.0;

/// Calendar unit the ruler is labelled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Month,
    Year,
    Decade,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub time: TimeValue,
    /// Pixel offset from the left edge of the window.
    pub x: f64,
    pub label: SharedStr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickPlan {
    pub granularity: Granularity,
    pub ticks: Vec<Tick>,
}

/// Pick the finest granularity whose unit is wide enough on screen.
pub fn choose_granularity(scale: f64, thresholds: &TickThresholds) -> Granularity {
    let pixels_per_day = scale * SECONDS_PER_DAY as f64;
    if pixels_per_day > thresholds.day_px {
        Granularity::Day
    } else if pixels_per_day * APPROX_DAYS_PER_MONTH > thresholds.month_px {
        Granularity::Month
    } else if pixels_per_day * DAYS_PER_YEAR > thresholds.year_px {
        Granularity::Year
    } else {
        Granularity::Decade
    }
}

/// Plan ruler ticks for `[start, end)` at `scale` pixels per second using the
/// default legibility thresholds.
pub fn plan_ticks(start: TimeValue, end: TimeValue, scale: f64) -> Result<TickPlan, CalendarError> {
    plan_ticks_with(start, end, scale, &TickThresholds::default())
}

/// Plan ruler ticks with explicit thresholds.
///
/// The first tick is the last calendar boundary at or before `start`, so it
/// may sit at a negative x. Every following tick is found by decoding the
/// previous one and stepping the calendar unit, which keeps ticks on real
/// month and year boundaries.
pub fn plan_ticks_with(
    start: TimeValue,
    end: TimeValue,
    scale: f64,
    thresholds: &TickThresholds,
) -> Result<TickPlan, CalendarError> {
    let granularity = choose_granularity(scale, thresholds);
    let mut ticks = Vec::new();
    let drawable = end > start && scale.is_finite() && scale > 0.0;
    if !drawable {
        return Ok(TickPlan { granularity, ticks });
    }

    let mut date = align(calendar::decode(start)?, granularity);
    let mut time = calendar::encode(date);
    while time < end {
        if ticks.len() == MAX_TICKS {
            tracing::warn!(
                ?granularity,
                start,
                end,
                "ruler tick limit reached; remaining ticks dropped"
            );
            break;
        }
        ticks.push(Tick {
            time,
            x: (time - start) * scale,
            label: format_label(&date, granularity).into(),
        });
        let Some(next) = advance(calendar::decode(time)?, granularity) else {
            break;
        };
        date = next;
        time = calendar::encode(date);
    }

    tracing::trace!(?granularity, count = ticks.len(), "planned ruler ticks");
    Ok(TickPlan { granularity, ticks })
}

/// Last boundary of `granularity` at or before `date`.
fn align(date: CalendarDate, granularity: Granularity) -> CalendarDate {
    match granularity {
        Granularity::Day => CalendarDate::ymd(date.year, date.month, date.day),
        Granularity::Month => CalendarDate::ymd(date.year, date.month, 1),
        Granularity::Year => CalendarDate::ymd(date.year, 1, 1),
        Granularity::Decade => CalendarDate::ymd(date.year - date.year % 10, 1, 1),
    }
}

/// Next boundary after an aligned `date`; `None` past the last representable year.
fn advance(date: CalendarDate, granularity: Granularity) -> Option<CalendarDate> {
    match granularity {
        Granularity::Day => {
            if date.day < calendar::days_in_month(date.year, date.month) {
                Some(CalendarDate::ymd(date.year, date.month, date.day + 1))
            } else {
                advance(date, Granularity::Month)
            }
        }
        Granularity::Month => {
            if date.month < 12 {
                Some(CalendarDate::ymd(date.year, date.month + 1, 1))
            } else {
                Some(CalendarDate::ymd(date.year.checked_add(1)?, 1, 1))
            }
        }
        Granularity::Year => Some(CalendarDate::ymd(date.year.checked_add(1)?, 1, 1)),
        Granularity::Decade => Some(CalendarDate::ymd(date.year.checked_add(10)?, 1, 1)),
    }
}

fn format_label(date: &CalendarDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Decade | Granularity::Year => format!("Year {}", date.year),
        Granularity::Month => format!("{} {}", date.month_name(), date.year),
        Granularity::Day => format!("{} {}", date.month_name(), date.day),
    }
}

/// Render the ruler bar with tick marks and labels, plus vertical gridlines
/// extending `grid_height` below it through the lanes.
pub fn render_ruler(plan: &TickPlan, viewport: &Viewport, grid_height: f64) -> Vec<RenderCommand> {
    let width = viewport.width;
    let mut commands = Vec::with_capacity(plan.ticks.len() * 3 + 4);

    commands.push(RenderCommand::BeginGroup {
        id: "ruler".into(),
        label: Some("Ruler".into()),
    });
    commands.push(RenderCommand::DrawRect {
        rect: Rect::new(0.0, 0.0, width, RULER_HEIGHT),
        color: ThemeToken::RulerBackground,
        border_color: Some(ThemeToken::Border),
        label: None,
        event_id: None,
    });

    for tick in &plan.ticks {
        let x = tick.x;
        if x < 0.0 || x > width {
            continue;
        }

        commands.push(RenderCommand::DrawLine {
            from: Point::new(x, RULER_HEIGHT - TICK_HEIGHT),
            to: Point::new(x, RULER_HEIGHT),
            color: ThemeToken::RulerTick,
            width: 1.0,
        });
        commands.push(RenderCommand::DrawText {
            position: Point::new(x, LABEL_Y),
            text: tick.label.clone(),
            color: ThemeToken::RulerText,
            font_size: FONT_SIZE,
            align: TextAlign::Center,
        });

        if grid_height > 0.0 {
            commands.push(RenderCommand::DrawLine {
                from: Point::new(x, RULER_HEIGHT),
                to: Point::new(x, RULER_HEIGHT + grid_height),
                color: ThemeToken::Gridline,
                width: 0.5,
            });
        }
    }

    commands.push(RenderCommand::EndGroup);
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{decode, encode};

    const DAY: f64 = SECONDS_PER_DAY as f64;

    fn plan(start: f64, end: f64, scale: f64) -> TickPlan {
        match plan_ticks(start, end, scale) {
            Ok(plan) => plan,
            Err(e) => panic!("plan_ticks failed: {e}"),
        }
    }

    fn date_of(time: f64) -> CalendarDate {
        decode(time).unwrap_or_else(|e| panic!("decode failed: {e}"))
    }

    #[test]
    fn granularity_thresholds() {
        let t = TickThresholds::default();
        assert_eq!(choose_granularity(50.0 / DAY, &t), Granularity::Day);
        assert_eq!(choose_granularity(5.0 / DAY, &t), Granularity::Month);
        assert_eq!(choose_granularity(2.0 / DAY, &t), Granularity::Month);
        assert_eq!(choose_granularity(0.2 / DAY, &t), Granularity::Year);
        assert_eq!(choose_granularity(0.01 / DAY, &t), Granularity::Decade);
        // Exactly on the threshold is not enough.
        assert_eq!(choose_granularity(40.0 / DAY, &t), Granularity::Month);
    }

    #[test]
    fn month_ticks_land_on_first_of_month() {
        let start = encode(CalendarDate::ymd(2023, 3, 15).with_time(6, 0, 0));
        let scale = 5.0 / DAY;
        let end = start + 1000.0 / scale;
        let plan = plan(start, end, scale);

        assert_eq!(plan.granularity, Granularity::Month);
        assert_eq!(plan.ticks[0].time, encode(CalendarDate::ymd(2023, 3, 1)));
        assert!(plan.ticks[0].time <= start);
        assert_eq!(plan.ticks[0].label, "Mar 2023");
        for tick in &plan.ticks {
            let date = date_of(tick.time);
            assert_eq!((date.day, date.hour, date.minute, date.second), (1, 0, 0, 0));
            assert!(tick.time < end);
            assert!((tick.x - (tick.time - start) * scale).abs() < 1e-9);
        }
        // Mar 2023 through Sep 2023, then Oct 1 is within 200 days of Mar 15.
        assert_eq!(plan.ticks.len(), 8);
        assert_eq!(plan.ticks[7].label, "Oct 2023");
    }

    #[test]
    fn month_ticks_follow_leap_february() {
        let start = encode(CalendarDate::ymd(2024, 1, 1));
        let plan = plan(start, start + 120.0 * DAY, 3.0 / DAY);
        let spacing: Vec<f64> = plan
            .ticks
            .windows(2)
            .map(|w| (w[1].time - w[0].time) / DAY)
            .collect();
        assert_eq!(spacing, vec![31.0, 29.0, 31.0]);
    }

    #[test]
    fn day_ticks_start_at_midnight() {
        let start = encode(CalendarDate::ymd(1999, 12, 30).with_time(18, 30, 0));
        let plan = plan(start, start + 4.0 * DAY, 60.0 / DAY);
        assert_eq!(plan.granularity, Granularity::Day);
        let labels: Vec<&str> = plan.ticks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["Dec 30", "Dec 31", "Jan 1", "Jan 2", "Jan 3"]);
        assert!(plan.ticks[0].x < 0.0);
    }

    #[test]
    fn year_and_decade_alignment() {
        let start = encode(CalendarDate::ymd(1987, 6, 1));

        let years = plan(start, start + 5.0 * 365.0 * DAY, 0.2 / DAY);
        assert_eq!(years.granularity, Granularity::Year);
        assert_eq!(years.ticks[0].label, "Year 1987");
        assert_eq!(years.ticks[1].time, encode(CalendarDate::ymd(1988, 1, 1)));

        let decades = plan(start, start + 50.0 * 365.0 * DAY, 0.01 / DAY);
        assert_eq!(decades.granularity, Granularity::Decade);
        let first = date_of(decades.ticks[0].time);
        assert_eq!(first, CalendarDate::ymd(1980, 1, 1));
        for tick in &decades.ticks {
            let date = date_of(tick.time);
            assert_eq!(date.year % 10, 0);
            assert_eq!((date.month, date.day), (1, 1));
        }
    }

    #[test]
    fn empty_or_invalid_windows() {
        assert!(plan(100.0, 100.0, 1.0).ticks.is_empty());
        assert!(plan(100.0, 50.0, 1.0).ticks.is_empty());
        assert!(plan(0.0, 100.0, 0.0).ticks.is_empty());
        assert!(matches!(
            plan_ticks(-1.0, 100.0, 1.0),
            Err(CalendarError::InvalidInput { .. })
        ));
    }

    #[test]
    fn walk_is_bounded() {
        let plan = plan(0.0, 1e15, 1e-12);
        assert_eq!(plan.granularity, Granularity::Decade);
        assert_eq!(plan.ticks.len(), MAX_TICKS);
        assert!(plan.ticks.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn renders_visible_ticks_with_gridlines() {
        let start = encode(CalendarDate::ymd(2023, 3, 15));
        let scale = 5.0 / DAY;
        let plan = plan(start, start + 800.0 / scale, scale);
        let cmds = render_ruler(&plan, &Viewport::new(800.0, 400.0), 320.0);

        let texts: Vec<&str> = cmds
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        // The Mar 1 tick sits left of the window and is not drawn.
        assert_eq!(texts.first().copied(), Some("Apr 2023"));

        let gridlines = cmds
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    RenderCommand::DrawLine {
                        color: ThemeToken::Gridline,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(gridlines, texts.len());
    }
}
