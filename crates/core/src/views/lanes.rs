use std::collections::HashMap;
use std::ops::Range;

use serde::Serialize;
use storyline_protocol::{
    Character, Point, Rect, RenderCommand, SharedStr, TextAlign, ThemeToken, TimeRange,
    TimeValue, TimelineEvent,
};

use crate::config::TimelineConfig;
use crate::viewport::TimeWindow;

/// Vertical gap between an event block and its lane edges.
const EVENT_INSET: f64 = 4.0;
const FONT_SIZE: f64 = 12.0;
const LANE_LABEL_X: f64 = 6.0;
const MIN_LABEL_WIDTH: f64 = 30.0;
const HANDLE_WIDTH: f64 = 3.0;
/// Blocks taller than this also show the event description.
const DESCRIPTION_MIN_HEIGHT: f64 = 40.0;
const CAPTION_FONT_SIZE: f64 = 10.0;
const LINE_HEIGHT: f64 = 14.0;
const MULTI_CHARACTER_CAPTION: &str = "Multi-Character";

/// Lane assignment for one render: visible characters ordered by `order`.
///
/// Lane `i` belongs to `characters()[i]`. Built fresh for every draw from the
/// current character list.
#[derive(Debug, Clone, Default)]
pub struct LaneIndex {
    characters: Vec<Character>,
    by_id: HashMap<SharedStr, usize>,
}

impl LaneIndex {
    pub fn from_characters(characters: &[Character]) -> Self {
        let mut visible: Vec<Character> =
            characters.iter().filter(|c| c.visible).cloned().collect();
        visible.sort_by_key(|c| c.order);
        let by_id = visible
            .iter()
            .enumerate()
            .map(|(lane, c)| (c.id.clone(), lane))
            .collect();
        Self {
            characters: visible,
            by_id,
        }
    }

    pub fn lane_of(&self, character_id: &str) -> Option<usize> {
        self.by_id.get(character_id).copied()
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

/// Pixel sizes used by the lane layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneMetrics {
    pub lane_height: f64,
    pub min_event_width: f64,
}

impl From<&TimelineConfig> for LaneMetrics {
    fn from(config: &TimelineConfig) -> Self {
        Self {
            lane_height: config.lane_height,
            min_event_width: config.min_event_width,
        }
    }
}

impl Default for LaneMetrics {
    fn default() -> Self {
        Self::from(&TimelineConfig::default())
    }
}

/// One rectangle of an event: a maximal run of adjacent lanes.
///
/// An event whose participants sit on non-adjacent lanes produces several
/// blocks sharing the same `event_id`; `group_index` numbers them top to
/// bottom.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventBlock {
    pub event_id: SharedStr,
    pub title: SharedStr,
    pub description: Option<SharedStr>,
    pub rect: Rect,
    pub group_index: usize,
    pub lanes: Range<usize>,
    pub range: TimeRange,
    /// The event has more than one participant, visible or not.
    pub multi_character: bool,
}

/// Sort and dedupe lane indices, then split them into runs of consecutive
/// integers.
pub fn group_adjacent(indices: &[usize]) -> Vec<Range<usize>> {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut runs: Vec<Range<usize>> = Vec::new();
    for lane in sorted {
        match runs.last_mut() {
            Some(run) if run.end == lane => run.end += 1,
            _ => runs.push(lane..lane + 1),
        }
    }
    runs
}

/// Lay out a single event. Participants without a visible lane are skipped;
/// an event with none left produces no blocks.
pub fn layout_event(
    lanes: &LaneIndex,
    event: &TimelineEvent,
    scale: f64,
    view_start: TimeValue,
    metrics: &LaneMetrics,
) -> Vec<EventBlock> {
    let indices: Vec<usize> = event
        .participant_ids
        .iter()
        .filter_map(|id| lanes.lane_of(id))
        .collect();
    if indices.is_empty() {
        return Vec::new();
    }

    let left = ((event.start_time - view_start) * scale).max(0.0);
    let width = ((event.end_time - event.start_time) * scale).max(metrics.min_event_width);
    let multi_character = event.participant_ids.len() > 1;
    let description = event
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .map(SharedStr::from);

    group_adjacent(&indices)
        .into_iter()
        .enumerate()
        .map(|(group_index, run)| EventBlock {
            event_id: event.id.clone(),
            title: event.title.clone(),
            description: description.clone(),
            rect: Rect::new(
                left,
                run.start as f64 * metrics.lane_height,
                width,
                run.len() as f64 * metrics.lane_height,
            ),
            group_index,
            lanes: run,
            range: event.range(),
            multi_character,
        })
        .collect()
}

/// Lay out every event against the current lanes and view.
pub fn layout_events(
    lanes: &LaneIndex,
    events: &[TimelineEvent],
    scale: f64,
    view_start: TimeValue,
    metrics: &LaneMetrics,
) -> Vec<EventBlock> {
    events
        .iter()
        .flat_map(|event| layout_event(lanes, event, scale, view_start, metrics))
        .collect()
}

/// How a block should be emphasised when drawn.
#[derive(Debug, Clone, Copy, Default)]
pub struct Highlight<'a> {
    pub selected: Option<&'a str>,
    pub dragging: Option<&'a str>,
}

/// Render lane backgrounds with character names, then the event blocks.
///
/// Coordinates are relative to the top of the first lane; blocks lying
/// wholly outside the window are skipped.
pub fn render_lanes(
    lanes: &LaneIndex,
    blocks: &[EventBlock],
    window: &TimeWindow,
    metrics: &LaneMetrics,
    highlight: Highlight<'_>,
) -> Vec<RenderCommand> {
    let width = window.width_px;
    let mut commands = Vec::with_capacity(lanes.len() * 2 + blocks.len() * 3 + 4);

    commands.push(RenderCommand::BeginGroup {
        id: "lanes".into(),
        label: Some("Characters".into()),
    });
    for (lane, character) in lanes.characters().iter().enumerate() {
        let y = lane as f64 * metrics.lane_height;
        commands.push(RenderCommand::DrawRect {
            rect: Rect::new(0.0, y, width, metrics.lane_height),
            color: if lane % 2 == 0 {
                ThemeToken::LaneBackground
            } else {
                ThemeToken::LaneBackgroundAlt
            },
            border_color: Some(ThemeToken::LaneBorder),
            label: None,
            event_id: None,
        });
        commands.push(RenderCommand::DrawText {
            position: Point::new(LANE_LABEL_X, y + FONT_SIZE + 2.0),
            text: character.name.clone(),
            color: ThemeToken::LaneHeaderText,
            font_size: FONT_SIZE - 1.0,
            align: TextAlign::Left,
        });
    }
    commands.push(RenderCommand::EndGroup);

    commands.push(RenderCommand::BeginGroup {
        id: "events".into(),
        label: Some("Events".into()),
    });
    let view_end = window.end();
    for block in blocks {
        if block.range.end < window.start || block.range.start > view_end {
            continue;
        }

        let rect = Rect::new(
            block.rect.x,
            block.rect.y + EVENT_INSET,
            block.rect.w,
            (block.rect.h - 2.0 * EVENT_INSET).max(1.0),
        );
        let id = block.event_id.as_str();
        let selected = highlight.selected == Some(id);
        let color = if highlight.dragging == Some(id) {
            ThemeToken::DragPreview
        } else if block.multi_character {
            ThemeToken::EventMultiFill
        } else {
            ThemeToken::EventFill
        };

        commands.push(RenderCommand::DrawRect {
            rect,
            color,
            border_color: Some(if selected {
                ThemeToken::EventSelected
            } else {
                ThemeToken::EventBorder
            }),
            label: Some(block.title.clone()),
            event_id: Some(block.event_id.clone()),
        });

        if rect.w > MIN_LABEL_WIDTH {
            push_block_text(&mut commands, block, rect);
        }

        if selected {
            for x in [rect.x, rect.right() - HANDLE_WIDTH] {
                commands.push(RenderCommand::DrawRect {
                    rect: Rect::new(x, rect.y, HANDLE_WIDTH, rect.h),
                    color: ThemeToken::ResizeHandle,
                    border_color: None,
                    label: None,
                    event_id: Some(block.event_id.clone()),
                });
            }
        }
    }
    commands.push(RenderCommand::EndGroup);
    commands
}

/// Title, then the description when the block is tall enough, then the
/// multi-character caption, centred as a stack on the block's middle.
fn push_block_text(commands: &mut Vec<RenderCommand>, block: &EventBlock, rect: Rect) {
    let mut lines = vec![(block.title.clone(), ThemeToken::EventText, FONT_SIZE)];
    let tall = block.rect.h > DESCRIPTION_MIN_HEIGHT;
    if let Some(description) = block.description.as_ref().filter(|_| tall) {
        lines.push((description.clone(), ThemeToken::EventText, CAPTION_FONT_SIZE));
    }
    if block.multi_character {
        lines.push((
            MULTI_CHARACTER_CAPTION.into(),
            ThemeToken::TextMuted,
            CAPTION_FONT_SIZE,
        ));
    }

    let first = rect.y + rect.h / 2.0 + 4.0 - (lines.len() - 1) as f64 * LINE_HEIGHT / 2.0;
    for (i, (text, color, font_size)) in lines.into_iter().enumerate() {
        commands.push(RenderCommand::DrawText {
            position: Point::new(rect.x + 6.0, first + i as f64 * LINE_HEIGHT),
            text,
            color,
            font_size,
            align: TextAlign::Left,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANE: f64 = 80.0;

    fn cast() -> Vec<Character> {
        vec![
            Character::new("d", "Dara", 3),
            Character::new("a", "Ada", 0),
            Character::new("c", "Cy", 2),
            Character::new("b", "Bo", 1),
        ]
    }

    fn event(id: &str, start: f64, end: f64, participants: &[&str]) -> TimelineEvent {
        TimelineEvent::new(id, id.to_uppercase(), TimeRange::new(start, end), participants)
    }

    fn metrics() -> LaneMetrics {
        LaneMetrics {
            lane_height: LANE,
            min_event_width: 20.0,
        }
    }

    #[test]
    fn lanes_follow_order_and_visibility() {
        let mut characters = cast();
        characters[2] = characters[2].clone().hidden();
        let lanes = LaneIndex::from_characters(&characters);
        assert_eq!(lanes.len(), 3);
        assert_eq!(lanes.lane_of("a"), Some(0));
        assert_eq!(lanes.lane_of("b"), Some(1));
        assert_eq!(lanes.lane_of("c"), None);
        assert_eq!(lanes.lane_of("d"), Some(2));
        assert_eq!(lanes.characters()[2].name, "Dara");
    }

    #[test]
    fn groups_adjacent_runs() {
        assert_eq!(group_adjacent(&[3, 0, 1, 1]), vec![0..2, 3..4]);
        assert_eq!(group_adjacent(&[5]), vec![5..6]);
        assert_eq!(group_adjacent(&[0, 2, 4]), vec![0..1, 2..3, 4..5]);
        assert!(group_adjacent(&[]).is_empty());
    }

    #[test]
    fn split_event_yields_two_blocks() {
        let lanes = LaneIndex::from_characters(&cast());
        let ev = event("e1", 100.0, 200.0, &["a", "b", "d"]);
        let blocks = layout_event(&lanes, &ev, 1.0, 0.0, &metrics());

        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.event_id == "e1"));

        assert_eq!(blocks[0].lanes, 0..2);
        assert_eq!(blocks[0].group_index, 0);
        assert!((blocks[0].rect.y - 0.0).abs() < f64::EPSILON);
        assert!((blocks[0].rect.h - 2.0 * LANE).abs() < f64::EPSILON);

        assert_eq!(blocks[1].lanes, 3..4);
        assert_eq!(blocks[1].group_index, 1);
        assert!((blocks[1].rect.y - 3.0 * LANE).abs() < f64::EPSILON);
        assert!((blocks[1].rect.h - LANE).abs() < f64::EPSILON);
        assert!(blocks[1].multi_character);
    }

    #[test]
    fn hidden_and_unknown_participants_are_dropped() {
        let mut characters = cast();
        characters[1] = characters[1].clone().hidden();
        let lanes = LaneIndex::from_characters(&characters);

        let ghost = event("e2", 0.0, 10.0, &["a", "nobody"]);
        assert!(layout_event(&lanes, &ghost, 1.0, 0.0, &metrics()).is_empty());

        // Lanes are now b=0, c=1, d=2; "a" is hidden.
        let partial = event("e3", 0.0, 10.0, &["a", "c"]);
        let blocks = layout_event(&lanes, &partial, 1.0, 0.0, &metrics());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lanes, 1..2);
        assert_eq!(partial.participant_ids.len(), 2);
    }

    #[test]
    fn horizontal_geometry() {
        let lanes = LaneIndex::from_characters(&cast());
        let m = metrics();

        let ev = event("e4", 1_000.0, 1_500.0, &["a"]);
        let block = &layout_event(&lanes, &ev, 0.5, 800.0, &m)[0];
        assert!((block.rect.x - 100.0).abs() < f64::EPSILON);
        assert!((block.rect.w - 250.0).abs() < f64::EPSILON);

        // Starts before the view: left edge clamps to zero.
        let block = &layout_event(&lanes, &ev, 0.5, 1_200.0, &m)[0];
        assert!(block.rect.x.abs() < f64::EPSILON);

        // Too short to see: widened to the minimum.
        let short = event("e5", 1_000.0, 1_001.0, &["a"]);
        let block = &layout_event(&lanes, &short, 0.5, 0.0, &m)[0];
        assert!((block.rect.w - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn layout_events_flattens_all_blocks() {
        let lanes = LaneIndex::from_characters(&cast());
        let events = vec![
            event("e1", 0.0, 10.0, &["a", "c"]),
            event("e2", 5.0, 15.0, &["b"]),
            event("e3", 5.0, 15.0, &["zed"]),
        ];
        let blocks = layout_events(&lanes, &events, 1.0, 0.0, &metrics());
        let ids: Vec<&str> = blocks.iter().map(|b| b.event_id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e1", "e2"]);
    }

    #[test]
    fn renders_lanes_and_visible_blocks() {
        let lanes = LaneIndex::from_characters(&cast());
        let events = vec![
            event("e1", 100.0, 300.0, &["a", "b"]),
            event("late", 5_000.0, 6_000.0, &["c"]),
        ];
        let m = metrics();
        let window = TimeWindow {
            start: 0.0,
            scale: 1.0,
            width_px: 800.0,
        };
        let blocks = layout_events(&lanes, &events, window.scale, window.start, &m);
        let cmds = render_lanes(
            &lanes,
            &blocks,
            &window,
            &m,
            Highlight {
                selected: Some("e1"),
                dragging: None,
            },
        );

        let event_rects: Vec<&RenderCommand> =
            cmds.iter().filter(|c| c.event_id().is_some()).collect();
        // One block plus two resize handles for the selected event; "late"
        // is outside the window.
        assert_eq!(event_rects.len(), 3);
        assert!(event_rects.iter().all(|c| c.event_id().is_some_and(|id| *id == "e1")));

        let lane_rects = cmds
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    RenderCommand::DrawRect {
                        event_id: None,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(lane_rects, 4);
    }

    fn texts(cmds: &[RenderCommand]) -> Vec<&str> {
        cmds.iter()
            .filter_map(|c| match c {
                RenderCommand::DrawText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn tall_blocks_show_description_and_caption() {
        let lanes = LaneIndex::from_characters(&cast());
        let mut council = event("council", 0.0, 400.0, &["a", "b"]);
        council.description = Some("Terms are argued".into());
        let mut scout = event("scout", 0.0, 400.0, &["d"]);
        scout.description = Some("Rides north".into());
        let window = TimeWindow {
            start: 0.0,
            scale: 1.0,
            width_px: 800.0,
        };
        let highlight = Highlight {
            selected: None,
            dragging: None,
        };

        let m = metrics();
        let blocks = layout_events(&lanes, &[council.clone(), scout.clone()], 1.0, 0.0, &m);
        let cmds = render_lanes(&lanes, &blocks, &window, &m, highlight);
        let shown = texts(&cmds);
        assert!(shown.contains(&"Terms are argued"));
        assert!(shown.contains(&"Rides north"));
        assert_eq!(shown.iter().filter(|t| **t == "Multi-Character").count(), 1);

        // Lanes of 40px are too short for a description line.
        let short = LaneMetrics {
            lane_height: 40.0,
            min_event_width: 20.0,
        };
        let blocks = layout_events(&lanes, &[council, scout], 1.0, 0.0, &short);
        let cmds = render_lanes(&lanes, &blocks, &window, &short, highlight);
        let shown = texts(&cmds);
        assert!(!shown.contains(&"Rides north"));
        // The two-lane council block is 80px tall and keeps its description.
        assert!(shown.contains(&"Terms are argued"));
        assert!(shown.contains(&"Multi-Character"));
    }
}
