use storyline_protocol::{Point, Rect, RenderCommand, SharedStr, TimeRange, Viewport};

use crate::calendar::CalendarError;
use crate::drag::{DragController, DragControllers, GestureOutcome, GestureSink};
use crate::model::project::{Project, ProjectError};
use crate::viewport::{DEFAULT_SCALE, ViewportController, ViewportError};
use crate::views::hit_test::{Hit, hit_test};
use crate::views::lanes::{
    EventBlock, Highlight, LaneIndex, LaneMetrics, layout_events, render_lanes,
};
use crate::views::ruler::{RULER_HEIGHT, plan_ticks_with, render_ruler};

/// Fraction of the surface width the events occupy after `fit_to_events`.
const FIT_FILL: f64 = 0.9;

/// One timeline surface: a project plus the view and gesture state that
/// belong to whoever is displaying it.
///
/// Geometry is never stored. Lanes, blocks, and ticks are rebuilt from the
/// current project and viewport on every call that needs them.
#[derive(Debug, Clone)]
pub struct TimelineSession {
    project: Project,
    viewport: ViewportController,
    drags: DragControllers,
    selected: Option<SharedStr>,
    /// Pixels of lane area scrolled above the top of the lane viewport.
    lane_scroll: f64,
}

impl TimelineSession {
    pub fn new(project: Project) -> Self {
        let viewport =
            ViewportController::new(project.start_time(), DEFAULT_SCALE).unwrap_or_default();
        Self {
            drags: DragControllers::new(&project.config),
            project,
            viewport,
            selected: None,
            lane_scroll: 0.0,
        }
    }

    pub fn from_json(data: &[u8]) -> Result<Self, ProjectError> {
        Ok(Self::new(Project::from_json(data)?))
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut ViewportController {
        &mut self.viewport
    }

    pub fn selected(&self) -> Option<&SharedStr> {
        self.selected.as_ref()
    }

    pub fn set_selected(&mut self, event_id: Option<SharedStr>) {
        self.selected = event_id;
    }

    /// Id of the event being dragged, if a gesture is in progress.
    pub fn dragging(&self) -> Option<&SharedStr> {
        self.drags.active().map(DragController::event_id)
    }

    pub fn lanes(&self) -> LaneIndex {
        LaneIndex::from_characters(&self.project.characters)
    }

    pub fn metrics(&self) -> LaneMetrics {
        LaneMetrics::from(&self.project.config)
    }

    pub fn lane_scroll(&self) -> f64 {
        self.lane_scroll
    }

    /// Scroll the lanes vertically by `dy` pixels on a surface `height`
    /// pixels tall. The offset stays between 0 and the height of the lanes
    /// that do not fit below the ruler.
    pub fn scroll_lanes(&mut self, dy: f64, height: f64) -> f64 {
        let content = self.lanes().len() as f64 * self.metrics().lane_height;
        let max_scroll = (content - (height - RULER_HEIGHT)).max(0.0);
        let target = self.lane_scroll + if dy.is_finite() { dy } else { 0.0 };
        self.lane_scroll = target.clamp(0.0, max_scroll);
        self.lane_scroll
    }

    /// Event blocks for the current view, with any drag preview applied.
    pub fn layout(&self) -> Vec<EventBlock> {
        let events = self.drags.with_previews(&self.project.events);
        let window = self.viewport.window();
        layout_events(
            &self.lanes(),
            &events,
            window.scale,
            window.start,
            &self.metrics(),
        )
    }

    /// Zoom and pan so every event fits in the measured width.
    pub fn fit_to_events(&mut self) -> Result<(), ViewportError> {
        let start = self.project.start_time();
        let span = self.project.end_time() - start;
        let width = self.viewport.width();
        if span > 0.0 && width > 0.0 {
            self.viewport.set_scale(width * FIT_FILL / span)?;
        }
        self.viewport.set_start_time(start)
    }

    /// Render the ruler above the lanes for a surface `height` pixels tall.
    pub fn render(&self, height: f64) -> Result<Vec<RenderCommand>, CalendarError> {
        let window = self.viewport.window();
        let lanes = self.lanes();
        let metrics = self.metrics();
        let lanes_height = (lanes.len() as f64 * metrics.lane_height - self.lane_scroll)
            .min(height - RULER_HEIGHT)
            .max(0.0);

        let plan = plan_ticks_with(
            window.start,
            window.end(),
            window.scale,
            &self.project.config.tick_thresholds,
        )?;
        let surface = Viewport::new(window.width_px, height);
        let mut commands = render_ruler(&plan, &surface, lanes_height);

        let blocks = self.layout();
        commands.push(RenderCommand::SetClip {
            rect: Rect::new(0.0, RULER_HEIGHT, window.width_px, lanes_height),
        });
        commands.push(RenderCommand::PushTransform {
            translate: Point::new(0.0, RULER_HEIGHT - self.lane_scroll),
            scale: Point::new(1.0, 1.0),
        });
        commands.extend(render_lanes(
            &lanes,
            &blocks,
            &window,
            &metrics,
            Highlight {
                selected: self.selected.as_deref(),
                dragging: self.dragging().map(SharedStr::as_str),
            },
        ));
        commands.push(RenderCommand::PopTransform);
        commands.push(RenderCommand::ClearClip);
        Ok(commands)
    }

    /// Press at surface coordinates. Starts a gesture on the block under the
    /// pointer; a press on empty lane space clears the selection.
    pub fn pointer_down(&mut self, x: f64, y: f64) -> Option<Hit> {
        if let Some(active) = self.drags.active() {
            tracing::trace!(event_id = %active.event_id(), "press ignored during gesture");
            return None;
        }
        if y < RULER_HEIGHT {
            return None;
        }
        let lane_y = y - RULER_HEIGHT + self.lane_scroll;

        let blocks = self.layout();
        let Some(hit) = hit_test(&blocks, x, lane_y, self.project.config.resize_handle_px) else {
            self.selected = None;
            return None;
        };
        let range = self.project.event(&hit.event_id)?.range();
        self.drags
            .controller_mut(&hit.event_id)
            .on_pointer_down(hit.kind, x, range);
        Some(hit)
    }

    pub fn pointer_move(&mut self, x: f64) {
        let scale = self.viewport.scale();
        if let Some(controller) = self.drags.active_mut() {
            controller.on_pointer_move(x, scale);
        }
    }

    /// Release the pointer, committing or selecting the dragged event.
    ///
    /// Returns `Ok(None)` when no gesture was running, and the project's
    /// error when it refuses the committed range. A refused commit leaves
    /// the event where it was.
    pub fn pointer_up(&mut self) -> Result<Option<GestureOutcome>, ProjectError> {
        let Some(controller) = self.drags.active_mut() else {
            return Ok(None);
        };
        let mut sink = SessionSink {
            project: &mut self.project,
            selected: &mut self.selected,
            rejected: None,
        };
        let outcome = controller.on_pointer_up(&mut sink);
        match sink.rejected {
            Some(error) => Err(error),
            None => Ok(outcome),
        }
    }
}

/// Applies gesture outcomes to the session's own project and selection.
struct SessionSink<'a> {
    project: &'a mut Project,
    selected: &'a mut Option<SharedStr>,
    rejected: Option<ProjectError>,
}

impl GestureSink for SessionSink<'_> {
    fn commit(&mut self, event_id: &SharedStr, range: TimeRange) {
        match self.project.apply_commit(event_id, range) {
            Ok(()) => {
                tracing::info!(%event_id, start = range.start, end = range.end, "event updated");
            }
            Err(error) => {
                tracing::warn!(%event_id, %error, "commit rejected");
                self.rejected = Some(error);
            }
        }
    }

    fn select(&mut self, event_id: &SharedStr) {
        *self.selected = Some(event_id.clone());
    }
}
